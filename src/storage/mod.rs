//! Storage module for persisting BBS data
//!
//! Users, message bases and messages live in a single SQLite database. One
//! connection is shared by every session behind a mutex, so each storage call is
//! an independent atomic unit; nothing here composes calls into larger
//! transactions.

pub mod bases;
pub mod credentials;
pub mod hashing;

use chrono::Utc;
use log::info;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

pub use bases::MessageBaseDirectory;
pub use credentials::CredentialStore;
pub use hashing::{Argon2Hasher, CredentialHasher};

pub type UserId = i64;
pub type BaseId = i64;
pub type MessageId = i64;

/// Storage failures, kept distinct so the session layer can tell a missing row
/// from a broken database.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("password hash failure: {0}")]
    Hash(String),

    #[error("database lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Map a UNIQUE constraint violation to `Duplicate`, anything else to `Sqlite`
    fn from_insert(err: rusqlite::Error, what: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StorageError::Duplicate(what.to_string())
            }
            other => StorageError::Sqlite(other),
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub address: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBase {
    pub id: BaseId,
    pub name: String,
    pub access_read: i64,
    pub access_post: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsStatistics {
    pub total_users: u64,
    pub total_message_bases: u64,
    pub total_messages: u64,
    pub total_logins: u64,
}

/// Main storage interface
pub struct Storage {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        password    TEXT NOT NULL,
        address     TEXT,
        created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS message_bases (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        access_read INTEGER,
        access_post INTEGER
    );

    CREATE TABLE IF NOT EXISTS messages (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id         INTEGER,
        message_base_id INTEGER,
        content         TEXT,
        created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(message_base_id) REFERENCES message_bases(id)
    );

    CREATE INDEX IF NOT EXISTS idx_messages_base
        ON messages(message_base_id, created_at);
";

impl Storage {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let storage = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(storage)
    }

    /// Private database that disappears with the handle
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Storage { conn: Mutex::new(conn) })
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        f(&conn)
    }

    /// Row counts for the status screen
    pub fn statistics(&self) -> StorageResult<BbsStatistics> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> StorageResult<u64> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n as u64)
            };
            Ok(BbsStatistics {
                total_users: count("SELECT COUNT(*) FROM users")?,
                total_message_bases: count("SELECT COUNT(*) FROM message_bases")?,
                total_messages: count("SELECT COUNT(*) FROM messages WHERE message_base_id IS NOT NULL")?,
                total_logins: count("SELECT COUNT(*) FROM messages WHERE message_base_id IS NULL")?,
            })
        })
    }
}

/// Timestamp format stored in `created_at`, matching SQLite's CURRENT_TIMESTAMP
pub(crate) fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
