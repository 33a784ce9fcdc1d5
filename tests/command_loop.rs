mod common;

use amisbbs::terminal::DisplayMode;
use common::{dial, login_script, test_context, write_assets};

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[tokio::test]
async fn missing_base_keeps_the_loop_running() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, storage) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let script = login_script("Alice", "p4ss", "Rome, NY", &["A", "General", "B", "General", "Q", "N"]);
    let out = dial(&ctx, &script).await;
    assert!(out.result.is_ok(), "{:?}", out.result);
    assert_eq!(count(&out.output, "Message base not found.\r\n"), 2);
    assert_eq!(count(&out.output, "Command?> "), 3);
    assert!(!out.output.contains("Enter your message: "));
    assert!(out.output.ends_with("Thanks for calling, please call again...\r\n"));
    assert_eq!(storage.statistics().unwrap().total_messages, 0);
}

#[tokio::test]
async fn post_then_view_newest_first() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();
    ctx.directory.create("General", 0, 0).unwrap();

    let script = login_script(
        "Alice",
        "p4ss",
        "Rome, NY",
        &["A", "General", "Hello world", "A", "General", "Second post", "B", "General", "Q", "N"],
    );
    let out = dial(&ctx, &script).await;
    assert!(out.result.is_ok(), "{:?}", out.result);
    assert_eq!(count(&out.output, "Message posted.\r\n"), 2);

    let second = out.output.find("): Second post\r\n").unwrap();
    let first = out.output.find("): Hello world\r\n").unwrap();
    assert!(second < first);
    assert!(out.output.contains("Alice ("));
}

#[tokio::test]
async fn empty_base_says_so() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();
    ctx.directory.create("General", 0, 0).unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["B", "General", "Q", "N"])).await;
    assert!(out.output.contains("No messages.\r\n"));
}

#[tokio::test]
async fn empty_and_oversized_messages_are_refused() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, storage) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();
    ctx.directory.create("General", 0, 0).unwrap();

    let long = "x".repeat(65);
    let script = login_script("Alice", "p4ss", "Rome, NY", &["A", "General", "", "A", "General", &long, "Q", "N"]);
    let out = dial(&ctx, &script).await;
    assert!(out.output.contains("Message not posted.\r\n"));
    assert!(out.output.contains("Message too long (max 64 bytes).\r\n"));
    assert_eq!(storage.statistics().unwrap().total_messages, 0);
}

#[tokio::test]
async fn restricted_base_denies_regular_callers() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, storage) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();
    ctx.directory.create("Sysop", 10, 10).unwrap();

    let script = login_script("Alice", "p4ss", "Rome, NY", &["A", "Sysop", "B", "Sysop", "Q", "N"]);
    let out = dial(&ctx, &script).await;
    assert_eq!(count(&out.output, "Access denied.\r\n"), 2);
    assert!(!out.output.contains("Enter your message: "));
    assert_eq!(storage.statistics().unwrap().total_messages, 0);
}

#[tokio::test]
async fn sysop_may_use_restricted_base() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("sysop", "root", "Home, NY").unwrap();
    ctx.directory.create("Sysop", 10, 10).unwrap();

    let script = login_script("sysop", "root", "Home, NY", &["A", "Sysop", "notes", "B", "Sysop", "Q", "N"]);
    let out = dial(&ctx, &script).await;
    assert!(out.output.contains("Message posted."));
    assert!(out.output.contains("): notes\r\n"));
    assert!(!out.output.contains("Access denied."));
}

#[tokio::test]
async fn toggle_cycles_display_modes() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let script = login_script("Alice", "p4ss", "Rome, NY", &["T", "T", "T", "T", "Q", "N"]);
    let out = dial(&ctx, &script).await;
    let atascii = out.output.find("Switched to ATASCII mode").unwrap();
    let ansi = out.output.find("Switched to ANSI mode").unwrap();
    let ascii = out.output.find("Switched to ASCII mode").unwrap();
    assert!(atascii < ansi && ansi < ascii);
    assert_eq!(count(&out.output, "Switched to ATASCII mode"), 2);
    assert_eq!(out.session.mode, DisplayMode::Atascii);
}

#[tokio::test]
async fn atascii_mode_renders_message_text() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();
    ctx.directory.create("General", 0, 0).unwrap();

    let script = login_script("Alice", "p4ss", "Rome, NY", &["A", "General", "{hi}", "T", "B", "General", "Q", "N"]);
    let out = dial(&ctx, &script).await;
    assert!(out.output.contains("): \u{2660}hi\u{21B0}\r\n"));
}

#[tokio::test]
async fn welcome_screen_is_atascii() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["W", "Q", "N"])).await;
    assert!(out.output.contains("\u{2665}HI\n\r\n"));
    assert!(!out.output.contains("File not available."));
}

#[tokio::test]
async fn missing_welcome_screen_is_reported() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["W", "Q", "N"])).await;
    assert!(out.result.is_ok());
    assert!(out.output.contains("File not available.\r\n"));
    assert!(out.output.ends_with("Thanks for calling, please call again...\r\n"));
}

#[tokio::test]
async fn unknown_and_lowercase_commands() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["q", "Z", "", "Q", "N"])).await;
    assert_eq!(count(&out.output, "Unknown command\r\n"), 2);
    assert_eq!(count(&out.output, "Command?> "), 4);
}

#[tokio::test]
async fn only_first_character_is_dispatched() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["Quit now", "N"])).await;
    assert!(out.result.is_ok());
    assert!(out.output.contains("Any Comments? (Y/N) "));
    assert!(out.output.ends_with("Thanks for calling, please call again...\r\n"));
}

#[tokio::test]
async fn logoff_comment_is_acknowledged() {
    let assets = tempfile::tempdir().unwrap();
    let (ctx, _) = test_context(assets.path());
    ctx.credentials.register("Alice", "p4ss", "Rome, NY").unwrap();

    let out = dial(&ctx, &login_script("Alice", "p4ss", "Rome, NY", &["Q", "y", "great board"])).await;
    assert!(out.output.contains("Enter comments: "));
    assert!(out.output.contains("Comment noted.\r\n"));
    assert!(out.output.ends_with("Thanks for calling, please call again...\r\n"));
}
