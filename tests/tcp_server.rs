mod common;

use std::sync::Arc;
use std::time::Duration;

use amisbbs::bbs::BbsServer;
use amisbbs::storage::Storage;
use amisbbs::bbs::session::SYSTEM_ERROR;
use amisbbs::storage::CredentialHasher;
use common::{fast_hasher, test_config, BrokenHasher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

async fn start(config: amisbbs::config::Config) -> (Arc<BbsServer>, std::net::SocketAddr) {
    start_with(config, fast_hasher()).await
}

async fn start_with(config: amisbbs::config::Config, hasher: Arc<dyn CredentialHasher>) -> (Arc<BbsServer>, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(BbsServer::with_storage(config, Storage::open_in_memory().unwrap(), hasher));
    let srv = server.clone();
    tokio::spawn(async move {
        let _ = srv.serve(listener).await;
    });
    (server, addr)
}

async fn session_over_tcp(addr: std::net::SocketAddr, script: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(script.as_bytes()).await.unwrap();
    let mut out = String::new();
    timeout(Duration::from_secs(10), stream.read_to_string(&mut out)).await.unwrap().unwrap();
    out
}

#[tokio::test]
async fn full_call_over_tcp() {
    let assets = tempfile::tempdir().unwrap();
    let (server, addr) = start(test_config(assets.path())).await;

    let out = session_over_tcp(addr, "Alice\r\np4ss\r\nRome, NY\r\nY\r\nQ\r\nN\r\n").await;
    assert!(out.contains("Registration successful."));
    assert!(out.contains("Welcome to Test BBS!"));
    assert!(out.ends_with("Thanks for calling, please call again...\r\n"));
    assert!(server.context().credentials.lookup("Alice").is_ok());
}

#[tokio::test]
async fn hang_up_does_not_stop_the_listener() {
    let assets = tempfile::tempdir().unwrap();
    let (server, addr) = start(test_config(assets.path())).await;

    {
        let mut quitter = TcpStream::connect(addr).await.unwrap();
        quitter.write_all(b"Bo").await.unwrap();
    }

    let out = session_over_tcp(addr, "Al\r\n").await;
    assert!(out.contains("Name too short. Disconnecting..."));

    let out = session_over_tcp(addr, "Carol\r\npw\r\nAlbany, NY\r\nY\r\nQ\r\nN\r\n").await;
    assert!(out.contains("Welcome to Test BBS!"));

    for _ in 0..50 {
        if server.active_sessions() == 0 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.active_sessions(), 0);
}

#[tokio::test]
async fn concurrent_callers_are_independent() {
    let assets = tempfile::tempdir().unwrap();
    let (server, addr) = start(test_config(assets.path())).await;
    server.context().directory.create("General", 0, 0).unwrap();

    let mut idle = TcpStream::connect(addr).await.unwrap();
    idle.write_all(b"Dave\r\n").await.unwrap();

    let a = tokio::spawn(session_over_tcp(addr, "Alice\r\np4ss\r\nRome, NY\r\nY\r\nT\r\nQ\r\nN\r\n"));
    let b = tokio::spawn(session_over_tcp(addr, "Bob\r\nsecret\r\nUtica, NY\r\nY\r\nA\r\nGeneral\r\nhi\r\nQ\r\nN\r\n"));
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.contains("Switched to ATASCII mode"));
    assert!(!b.contains("Switched to"));
    assert!(b.contains("Message posted."));

    drop(idle);
}

#[tokio::test]
async fn internal_failure_only_ends_that_call() {
    let assets = tempfile::tempdir().unwrap();
    let (server, addr) = start_with(test_config(assets.path()), Arc::new(BrokenHasher)).await;

    let out = session_over_tcp(addr, "Alice\r\np4ss\r\nRome, NY\r\n").await;
    assert!(out.ends_with(&format!("{}\r\n", SYSTEM_ERROR)));

    let out = session_over_tcp(addr, "Al\r\n").await;
    assert!(out.contains("Name too short. Disconnecting..."));
    assert!(server.context().credentials.lookup("Alice").unwrap_err().is_not_found());
}
