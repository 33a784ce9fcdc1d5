use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::storage::{Argon2Hasher, CredentialHasher, Storage};
use super::connection::Connection;
use super::context::BbsContext;
use super::session::Session;
use super::SessionError;

/// Main BBS server: accepts callers and runs one task per connection
pub struct BbsServer {
    ctx: BbsContext,
    storage: Arc<Storage>,
    active: Arc<AtomicUsize>,
}

impl BbsServer {
    /// Create a new BBS server instance, opening the configured database
    pub async fn new(config: Config) -> Result<Self> {
        let storage = Storage::open(Path::new(&config.storage.database))
            .map_err(|e| anyhow!("Failed to open database {}: {}", config.storage.database, e))?;
        let hasher = Argon2Hasher::from_config(config.argon2())?;
        Ok(Self::with_storage(config, storage, Arc::new(hasher)))
    }

    /// Build around an already opened storage and hasher
    pub fn with_storage(config: Config, storage: Storage, hasher: Arc<dyn CredentialHasher>) -> Self {
        let storage = Arc::new(storage);
        BbsServer {
            ctx: BbsContext::new(config, storage.clone(), hasher),
            storage,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn context(&self) -> &BbsContext {
        &self.ctx
    }

    /// Number of caller sessions currently running
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Bind the configured address and serve until Ctrl-C, or until the local
    /// console session ends when `console` is set.
    pub async fn run(&self, console: bool) -> Result<()> {
        let addr = self.ctx.config.server.listen_addr();
        let listener = TcpListener::bind(&addr).await
            .map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
        info!("BBS '{}' (sysop {}) listening on {}", self.ctx.config.bbs.name, self.ctx.config.bbs.sysop, listener.local_addr()?);

        tokio::select! {
            res = self.serve(listener) => res?,
            res = self.run_console(), if console => {
                res?;
                info!("Local console session ended");
            }
            _ = tokio::signal::ctrl_c() => { info!("Received shutdown signal"); }
        }

        self.shutdown();
        Ok(())
    }

    /// Accept loop. A failed accept is logged and retried; it never stops the server.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    self.spawn_session(stream, peer.to_string());
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: String) {
        let ctx = self.ctx.clone();
        let active = self.active.clone();
        tokio::spawn(async move {
            let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
            info!("New connection established from {} ({} active)", peer, now_active);

            let (reader, writer) = stream.into_split();
            let mut conn = Connection::new(BufReader::new(reader), writer, ctx.config.server.read_timeout());
            let mut session = Session::new(peer.clone());
            match session.run(&ctx, &mut conn).await {
                Ok(()) => {}
                Err(SessionError::Disconnected) => debug!("Session {}: {} hung up", session.id, peer),
                Err(e) => warn!("Session {} from {} ended: {}", session.id, peer, e),
            }
            let _ = conn.shutdown().await;

            active.fetch_sub(1, Ordering::SeqCst);
            info!("Connection from {} closed", peer);
        });
    }

    /// Run one full session on stdin/stdout
    pub async fn run_console(&self) -> Result<()> {
        let mut conn = Connection::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), None);
        let mut session = Session::new("console");
        match session.run(&self.ctx, &mut conn).await {
            Ok(()) | Err(SessionError::Disconnected) => Ok(()),
            Err(e) => Err(anyhow!("Console session failed: {}", e)),
        }
    }

    /// Show BBS status and statistics
    pub async fn show_status(&self) -> Result<()> {
        let config = &self.ctx.config;
        println!("=== {} Status ===", config.bbs.name);
        println!("Sysop: {}", config.bbs.sysop);
        println!("Listening on: {}", config.server.listen_addr());
        println!("New users: {}", if config.bbs.allow_new_users { "allowed" } else { "closed" });

        let stats = self.storage.statistics()?;
        println!("Total Users: {}", stats.total_users);
        println!("Total Messages: {}", stats.total_messages);
        println!("Total Logins: {}", stats.total_logins);
        println!("Message Bases: {}", stats.total_message_bases);
        for base in self.ctx.directory.list()? {
            println!("  #{} {} (read {}, post {})", base.id, base.name, base.access_read, base.access_post);
        }

        Ok(())
    }

    fn shutdown(&self) {
        info!("Shutting down BBS server ({} sessions still active)", self.active_sessions());
    }
}
