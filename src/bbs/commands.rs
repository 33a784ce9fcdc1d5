use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::logutil::escape_log;
use crate::storage::{BaseId, MessageBase};
use crate::terminal::assets::WELCOME;
use crate::terminal::DisplayMode;
use super::connection::Connection;
use super::context::BbsContext;
use super::roles;
use super::session::Session;
use super::SessionError;

pub const COMMAND_PROMPT: &str = "Command?> ";
pub const BASE_PROMPT: &str = "Enter the message base name: ";
pub const MESSAGE_PROMPT: &str = "Enter your message: ";
pub const BASE_NOT_FOUND: &str = "Message base not found.";
pub const ACCESS_DENIED: &str = "Access denied.";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const FAREWELL: &str = "Thanks for calling, please call again...";

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Logoff,
}

/// Processes single-character commands from established callers
pub struct CommandProcessor<'a> {
    ctx: &'a BbsContext,
}

impl<'a> CommandProcessor<'a> {
    pub fn new(ctx: &'a BbsContext) -> Self {
        CommandProcessor { ctx }
    }

    /// Read and dispatch commands until the caller logs off or the connection fails
    pub async fn run<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let line = conn.prompt(session.mode, COMMAND_PROMPT).await?;
            session.update_activity();
            let Some(command) = line.chars().next() else { continue };
            debug!("Session {}: command {:?}", session.id, command);
            if self.process(session, conn, command).await? == Flow::Logoff {
                return Ok(());
            }
        }
    }

    /// Dispatch one command character (case-sensitive)
    pub async fn process<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>, command: char) -> Result<Flow, SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match command {
            'A' => self.post_message(session, conn).await?,
            'B' => self.view_messages(session, conn).await?,
            'W' => self.show_welcome(session, conn).await?,
            'T' => {
                let mode = session.cycle_mode();
                conn.send_line(mode, &format!("Switched to {} mode", mode.label())).await?;
            }
            'Q' => {
                self.log_off(session, conn).await?;
                return Ok(Flow::Logoff);
            }
            _ => conn.send_line(session.mode, UNKNOWN_COMMAND).await?,
        }
        Ok(Flow::Continue)
    }

    /// Ask for a base name; `None` once the caller has been told it does not exist
    async fn select_base<R, W>(&self, session: &Session, conn: &mut Connection<R, W>) -> Result<Option<MessageBase>, SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let name = conn.prompt(session.mode, BASE_PROMPT).await?;
        let base_id: BaseId = match self.ctx.directory.resolve_name(&name) {
            Ok(id) => id,
            Err(e) if e.is_not_found() => {
                conn.send_line(session.mode, BASE_NOT_FOUND).await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(self.ctx.directory.get(base_id)?))
    }

    async fn post_message<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let user_id = session.require_user()?;
        let Some(base) = self.select_base(session, conn).await? else { return Ok(()) };
        if !roles::can_post(session.user_level, &base) {
            warn!("{} denied posting to {} (level {} < {})", session.display_name(), base.name, session.user_level, base.access_post);
            conn.send_line(session.mode, ACCESS_DENIED).await?;
            return Ok(());
        }

        let body = conn.prompt(session.mode, MESSAGE_PROMPT).await?;
        let max = self.ctx.config.storage.max_message_size;
        if body.is_empty() {
            conn.send_line(session.mode, "Message not posted.").await?;
            return Ok(());
        }
        if body.len() > max {
            conn.send_line(session.mode, &format!("Message too long (max {} bytes).", max)).await?;
            return Ok(());
        }

        let id = self.ctx.directory.post_message(user_id, base.id, &body)?;
        info!("{} posted message {} to {}: {}", session.display_name(), id, base.name, escape_log(&body));
        conn.send_line(session.mode, "Message posted.").await?;
        Ok(())
    }

    async fn view_messages<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(base) = self.select_base(session, conn).await? else { return Ok(()) };
        if !roles::can_read(session.user_level, &base) {
            conn.send_line(session.mode, ACCESS_DENIED).await?;
            return Ok(());
        }

        let messages = self.ctx.directory.list_messages(base.id)?;
        if messages.is_empty() {
            conn.send_line(session.mode, "No messages.").await?;
        }
        for line in &messages {
            conn.send_line(session.mode, line).await?;
        }
        Ok(())
    }

    /// The ATASCII welcome screen, whatever the session's mode
    async fn show_welcome<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match self.ctx.assets.load(DisplayMode::Atascii, WELCOME).await {
            Ok(screen) => {
                conn.send_raw(DisplayMode::Atascii, &screen).await?;
                conn.newline().await?;
            }
            Err(e) => {
                warn!("Session {}: welcome screen unavailable: {}", session.id, e);
                conn.send_line(session.mode, "File not available.").await?;
            }
        }
        Ok(())
    }

    async fn log_off<R, W>(&self, session: &mut Session, conn: &mut Connection<R, W>) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let answer = conn.prompt(session.mode, "Any Comments? (Y/N) ").await?;
        if answer.starts_with(['Y', 'y']) {
            let comment = conn.prompt(session.mode, "Enter comments: ").await?;
            debug!("Session {}: logoff comment: {}", session.id, escape_log(&comment));
            conn.send_line(session.mode, "Comment noted.").await?;
        }
        conn.send_line(session.mode, FAREWELL).await?;
        Ok(())
    }
}
