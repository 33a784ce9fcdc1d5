//! Login / registration handshake.
//!
//! One attempt per connection: every validation or authentication failure tells
//! the caller why and ends the session. Nothing typed during the handshake is
//! kept once the connection closes.

use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::logutil::escape_log;
use crate::storage::credentials::MIN_NAME_LEN;
use crate::storage::{StorageError, UserId};
use crate::terminal::assets::WELCOME;
use super::connection::Connection;
use super::context::BbsContext;
use super::roles;
use super::session::{Session, SessionState};
use super::SessionError;

pub const NAME_PROMPT: &str = "Enter your Name > ";
pub const PASSWORD_PROMPT: &str = "Enter your password > ";
pub const NEW_PASSWORD_PROMPT: &str = "Enter a password > ";
pub const ADDRESS_PROMPT: &str = "From City, State > ";

/// Shortest accepted "City, State", in characters
pub const MIN_ADDRESS_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NameTooShort,
    RegistrationClosed,
    RegistrationFailed(String),
    InvalidPassword,
    AddressTooShort,
    NotConfirmed,
}

impl Rejection {
    pub fn message(&self) -> String {
        match self {
            Rejection::NameTooShort => "Name too short. Disconnecting...".to_string(),
            Rejection::RegistrationClosed => "New user registration is closed. Disconnecting...".to_string(),
            Rejection::RegistrationFailed(reason) => format!("Registration failed: {}. Disconnecting...", reason),
            Rejection::InvalidPassword => "Invalid password. Disconnecting...".to_string(),
            Rejection::AddressTooShort => "Address too short. Disconnecting...".to_string(),
            Rejection::NotConfirmed => "Details not confirmed. Disconnecting...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Established,
    Rejected(Rejection),
}

/// Identify the caller: log in or register, then confirm name and location.
pub async fn run<R, W>(ctx: &BbsContext, conn: &mut Connection<R, W>, session: &mut Session) -> Result<HandshakeOutcome, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.transition(SessionState::AwaitingName);
    let name = conn.prompt(session.mode, NAME_PROMPT).await?;
    if name.chars().count() < MIN_NAME_LEN {
        return reject(conn, session, Rejection::NameTooShort).await;
    }

    let (user_id, address) = match ctx.credentials.lookup(&name) {
        Ok(user_id) => match login(ctx, conn, session, user_id).await? {
            Ok(address) => (user_id, address),
            Err(rejection) => return reject(conn, session, rejection).await,
        },
        Err(e) if e.is_not_found() => match register(ctx, conn, session, &name).await? {
            Ok(registered) => registered,
            Err(rejection) => return reject(conn, session, rejection).await,
        },
        Err(e) => return Err(e.into()),
    };

    session.transition(SessionState::AwaitingConfirmation);
    let summary = format!("You are {}, calling from {}. CORRECT (Y/N)? ", name, address);
    let answer = conn.prompt(session.mode, &summary).await?;
    if !answer.eq_ignore_ascii_case("Y") {
        return reject(conn, session, Rejection::NotConfirmed).await;
    }

    let level = roles::level_for(&name, &ctx.config.bbs.sysop);
    session.establish(user_id, name, address, level);
    Ok(HandshakeOutcome::Established)
}

/// Existing caller: single password attempt, then the location prompt
async fn login<R, W>(ctx: &BbsContext, conn: &mut Connection<R, W>, session: &mut Session, user_id: UserId) -> Result<Result<String, Rejection>, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    session.transition(SessionState::AwaitingPassword);
    let password = conn.prompt(session.mode, PASSWORD_PROMPT).await?;
    let credentials = ctx.credentials.clone();
    let verified = tokio::task::spawn_blocking(move || credentials.verify(user_id, &password)).await?;
    if !verified {
        return Ok(Err(Rejection::InvalidPassword));
    }

    session.transition(SessionState::AwaitingAddress);
    let address = conn.prompt(session.mode, ADDRESS_PROMPT).await?;
    if address.chars().count() < MIN_ADDRESS_LEN {
        return Ok(Err(Rejection::AddressTooShort));
    }
    Ok(Ok(address))
}

/// Unknown caller: collect password and location and create the account. The
/// location given here is carried into the confirmation step rather than asked
/// for a second time.
async fn register<R, W>(ctx: &BbsContext, conn: &mut Connection<R, W>, session: &mut Session, name: &str) -> Result<Result<(UserId, String), Rejection>, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !ctx.config.bbs.allow_new_users {
        return Ok(Err(Rejection::RegistrationClosed));
    }
    session.transition(SessionState::AwaitingRegistration);
    conn.send_line(session.mode, "User not found, please register.").await?;
    let password = conn.prompt(session.mode, NEW_PASSWORD_PROMPT).await?;
    let address = conn.prompt(session.mode, ADDRESS_PROMPT).await?;
    if address.chars().count() < MIN_ADDRESS_LEN {
        return Ok(Err(Rejection::AddressTooShort));
    }

    let credentials = ctx.credentials.clone();
    let (owned_name, owned_address) = (name.to_string(), address.clone());
    let registered = tokio::task::spawn_blocking(move || credentials.register(&owned_name, &password, &owned_address)).await?;
    match registered {
        Ok(user_id) => {
            debug!("Session {}: registered {} as user {}", session.id, escape_log(name), user_id);
            conn.send_line(session.mode, "Registration successful.").await?;
            Ok(Ok((user_id, address)))
        }
        Err(e @ (StorageError::Duplicate(_) | StorageError::Invalid(_))) => Ok(Err(Rejection::RegistrationFailed(e.to_string()))),
        Err(e) => Err(e.into()),
    }
}

async fn reject<R, W>(conn: &mut Connection<R, W>, session: &mut Session, rejection: Rejection) -> Result<HandshakeOutcome, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    conn.send_line(session.mode, &rejection.message()).await?;
    session.transition(SessionState::Closed);
    Ok(HandshakeOutcome::Rejected(rejection))
}

/// Post-login greeting: audit row, then the welcome banner in the caller's mode.
pub async fn welcome<R, W>(ctx: &BbsContext, conn: &mut Connection<R, W>, session: &mut Session) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let user_id = session.require_user()?;
    if let Err(e) = ctx.directory.record_login(user_id) {
        warn!("Failed to save call details for user {}: {}", user_id, e);
    }

    let mode = session.mode;
    conn.send_line(mode, &format!("Welcome to {}!", ctx.config.bbs.name)).await?;
    match ctx.assets.load(mode, WELCOME).await {
        Ok(banner) => {
            conn.send_raw(mode, &banner).await?;
            conn.newline().await?;
        }
        Err(e) => warn!("Welcome asset unavailable for {} mode: {}", mode, e),
    }
    conn.send_line(mode, "Enjoy your stay.").await?;
    Ok(())
}
