//! BBS (Bulletin Board System) module
//!
//! This module contains the caller-facing side of the board:
//! - TCP listener and local console ([`server`])
//! - Line-oriented caller connections ([`connection`])
//! - Per-connection session state ([`session`])
//! - Login / registration handshake ([`handshake`])
//! - Single-character command loop ([`commands`])

pub mod commands;
pub mod connection;
pub mod context;
pub mod handshake;
pub mod roles;
pub mod server;
pub mod session;

pub use commands::CommandProcessor;
pub use connection::Connection;
pub use context::BbsContext;
pub use server::BbsServer;
pub use session::{Session, SessionState};

use crate::storage::StorageError;

/// Why a session ended abnormally. None of these outlive the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("caller disconnected")]
    Disconnected,

    #[error("read deadline expired")]
    Timeout,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("session is not established")]
    NotEstablished,
}

impl SessionError {
    /// Failures on our side rather than the caller's transport
    pub fn is_internal(&self) -> bool {
        matches!(self, SessionError::Storage(_) | SessionError::Task(_) | SessionError::NotEstablished)
    }
}
