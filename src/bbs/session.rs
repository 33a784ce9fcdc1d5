use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncWrite};
use uuid::Uuid;

use crate::logutil::escape_log;
use crate::storage::UserId;
use crate::terminal::DisplayMode;
use super::commands::CommandProcessor;
use super::connection::Connection;
use super::context::BbsContext;
use super::handshake::{self, HandshakeOutcome};
use super::roles;
use super::SessionError;

/// Shown to the caller when the session ends on an internal failure
pub const SYSTEM_ERROR: &str = "System error. Please call again later.";
pub const IDLE_TIMEOUT: &str = "Idle too long. Disconnecting...";

/// Represents one caller connection on the BBS
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub peer: String,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub address: Option<String>,
    pub user_level: u8,
    pub mode: DisplayMode,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub state: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingName,
    AwaitingPassword,
    AwaitingRegistration,
    AwaitingAddress,
    AwaitingConfirmation,
    Established,
    Closed,
}

impl Session {
    /// Create a new session
    pub fn new(peer: impl Into<String>) -> Self {
        let now = Utc::now();

        Session {
            id: Uuid::new_v4().to_string(),
            peer: peer.into(),
            user_id: None,
            username: None,
            address: None,
            user_level: 0,
            mode: DisplayMode::default(),
            login_time: now,
            last_activity: now,
            state: SessionState::AwaitingName,
        }
    }

    /// Run the handshake and, once established, the command loop.
    ///
    /// Internal failures are reported to the caller with a generic line before the
    /// error is handed back; they never reach beyond this session.
    pub async fn run<R, W>(&mut self, ctx: &BbsContext, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.drive(ctx, conn).await;
        match &result {
            Err(SessionError::Timeout) => {
                let _ = conn.send_line(self.mode, IDLE_TIMEOUT).await;
            }
            Err(e) if e.is_internal() => {
                let _ = conn.send_line(self.mode, SYSTEM_ERROR).await;
            }
            _ => {}
        }
        self.close();
        result
    }

    async fn drive<R, W>(&mut self, ctx: &BbsContext, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match handshake::run(ctx, conn, self).await? {
            HandshakeOutcome::Established => {
                handshake::welcome(ctx, conn, self).await?;
                CommandProcessor::new(ctx).run(self, conn).await
            }
            HandshakeOutcome::Rejected(reason) => {
                warn!("Session {} from {} rejected: {:?}", self.id, self.peer, reason);
                Ok(())
            }
        }
    }

    /// Update the last activity timestamp
    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    /// Record the confirmed identity of the caller
    pub fn establish(&mut self, user_id: UserId, username: String, address: String, user_level: u8) {
        info!("User {} logged in from {} ({})", escape_log(&username), escape_log(&address), self.peer);

        self.user_id = Some(user_id);
        self.username = Some(username);
        self.address = Some(address);
        self.user_level = user_level;
        self.login_time = Utc::now();
        self.state = SessionState::Established;
    }

    pub fn close(&mut self) {
        if let Some(ref username) = self.username {
            info!(
                "{} {} logged out after {}s ({})",
                roles::role_name(self.user_level),
                escape_log(username),
                self.session_duration().num_seconds(),
                self.peer
            );
        }
        self.state = SessionState::Closed;
    }

    pub fn is_established(&self) -> bool {
        self.state == SessionState::Established && self.user_id.is_some()
    }

    /// The caller's user id, available once established
    pub fn require_user(&self) -> Result<UserId, SessionError> {
        self.user_id.ok_or(SessionError::NotEstablished)
    }

    /// Get the username, or "Guest" if not logged in
    pub fn display_name(&self) -> String {
        self.username.clone().unwrap_or_else(|| "Guest".to_string())
    }

    /// Advance this session's display mode and return the new one
    pub fn cycle_mode(&mut self) -> DisplayMode {
        self.mode = self.mode.cycle();
        self.mode
    }

    /// Get session duration
    pub fn session_duration(&self) -> chrono::Duration {
        self.last_activity - self.login_time
    }
}
