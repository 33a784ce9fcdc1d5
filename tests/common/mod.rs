#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use amisbbs::bbs::{BbsContext, Connection, Session, SessionError};
use amisbbs::config::{Argon2Config, Config};
use amisbbs::storage::{Argon2Hasher, CredentialHasher, Storage, StorageError};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

/// Argon2 cheap enough for tests
pub fn fast_hasher() -> Arc<Argon2Hasher> {
    let cfg = Argon2Config { memory_kib: Some(1024), time_cost: Some(1), parallelism: Some(1) };
    Arc::new(Argon2Hasher::from_config(Some(&cfg)).unwrap())
}

/// Hasher whose backend is gone: every hash attempt fails
pub struct BrokenHasher;

impl CredentialHasher for BrokenHasher {
    fn hash(&self, _plaintext: &str) -> Result<String, StorageError> {
        Err(StorageError::Hash("hashing backend unavailable".to_string()))
    }

    fn matches(&self, _stored: &str, _plaintext: &str) -> bool {
        false
    }
}

pub fn test_config(assets: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.bbs.name = "Test BBS".into();
    cfg.assets.ascii_folder = assets.join("ascii").to_string_lossy().into();
    cfg.assets.atascii_folder = assets.join("atascii").to_string_lossy().into();
    cfg.assets.ansi_folder = assets.join("ansi").to_string_lossy().into();
    cfg.storage.max_message_size = 64;
    cfg
}

pub fn context_with(config: Config) -> (BbsContext, Arc<Storage>) {
    let storage = Arc::new(Storage::open_in_memory().unwrap());
    let ctx = BbsContext::new(config, storage.clone(), fast_hasher());
    (ctx, storage)
}

pub fn test_context(assets: &Path) -> (BbsContext, Arc<Storage>) {
    context_with(test_config(assets))
}

/// Drop welcome screens for every mode into `root`
pub fn write_assets(root: &Path) {
    for dir in ["ascii", "atascii", "ansi"] {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }
    std::fs::write(root.join("ascii/welcome.txt"), "PLAIN BANNER").unwrap();
    std::fs::write(root.join("atascii/welcome.ata"), [0x00, b'H', b'I', 0x9B]).unwrap();
    std::fs::write(root.join("ansi/welcome.ans"), "\x1b[1mANSI BANNER\x1b[0m").unwrap();
}

pub struct Call {
    pub output: String,
    pub session: Session,
    pub result: Result<(), SessionError>,
}

/// Feed `input` to a fresh session and collect everything it sent back.
/// With `hang_up` the caller side closes after the input, otherwise it stays
/// silent until the read deadline.
pub async fn call(ctx: &BbsContext, input: &str, hang_up: bool, deadline: Duration) -> Call {
    let (client, server) = tokio::io::duplex(256 * 1024);
    let (sr, sw) = tokio::io::split(server);
    let mut conn = Connection::new(BufReader::new(sr), sw, Some(deadline));
    let (mut cr, mut cw) = tokio::io::split(client);
    cw.write_all(input.as_bytes()).await.unwrap();
    if hang_up {
        cw.shutdown().await.unwrap();
    }

    let mut session = Session::new("test-peer");
    let result = session.run(ctx, &mut conn).await;
    conn.shutdown().await.unwrap();

    let mut output = String::new();
    cr.read_to_string(&mut output).await.unwrap();
    Call { output, session, result }
}

/// Session script that should run to completion
pub async fn dial(ctx: &BbsContext, input: &str) -> Call {
    call(ctx, input, false, Duration::from_secs(5)).await
}

/// Login script for a registered caller followed by `commands`
pub fn login_script(name: &str, password: &str, address: &str, commands: &[&str]) -> String {
    let mut script = format!("{}\n{}\n{}\nY\n", name, password, address);
    for c in commands {
        script.push_str(c);
        script.push('\n');
    }
    script
}
