//! Caller accounts: lookup by name, registration and password verification.

use log::{debug, warn};
use rusqlite::OptionalExtension;
use std::sync::Arc;

use crate::logutil::escape_log;
use super::{now_timestamp, CredentialHasher, Storage, StorageError, StorageResult, User, UserId};

/// Shortest accepted caller name, in characters
pub const MIN_NAME_LEN: usize = 3;

#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<Storage>,
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialStore {
    pub fn new(storage: Arc<Storage>, hasher: Arc<dyn CredentialHasher>) -> Self {
        CredentialStore { storage, hasher }
    }

    /// Resolve an exact (case-sensitive) caller name to its id
    pub fn lookup(&self, name: &str) -> StorageResult<UserId> {
        self.storage.with_conn(|conn| {
            conn.query_row("SELECT id FROM users WHERE name = ?1", [name], |row| row.get(0))
                .optional()?
                .ok_or_else(|| StorageError::NotFound(format!("user {}", name)))
        })
    }

    /// Create an account. Only the hash of `password` is stored.
    pub fn register(&self, name: &str, password: &str, address: &str) -> StorageResult<UserId> {
        if name.chars().count() < MIN_NAME_LEN {
            return Err(StorageError::Invalid("Name too short".to_string()));
        }
        if password.is_empty() {
            return Err(StorageError::Invalid("Password cannot be empty".to_string()));
        }
        let hash = self.hasher.hash(password)?;
        let id = self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, password, address, created_at) VALUES (?1, ?2, ?3, ?4)",
                (name, &hash, address, now_timestamp()),
            )
            .map_err(|e| StorageError::from_insert(e, "user"))?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!("Registered user {} as id {}", escape_log(name), id);
        Ok(id)
    }

    /// Check `password` against the stored hash for `user_id`.
    ///
    /// Returns false for a wrong password and for any storage failure alike; the
    /// failure is logged here so it is not lost.
    pub fn verify(&self, user_id: UserId, password: &str) -> bool {
        let stored: StorageResult<Option<String>> = self.storage.with_conn(|conn| {
            Ok(conn.query_row("SELECT password FROM users WHERE id = ?1", [user_id], |row| row.get(0))
                .optional()?)
        });
        match stored {
            Ok(Some(hash)) => self.hasher.matches(&hash, password),
            Ok(None) => {
                debug!("verify: no user with id {}", user_id);
                false
            }
            Err(e) => {
                warn!("Failed to retrieve password for user {}: {}", user_id, e);
                false
            }
        }
    }

    /// Full account record
    pub fn user(&self, user_id: UserId) -> StorageResult<User> {
        self.storage.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, COALESCE(address, ''), COALESCE(created_at, '') FROM users WHERE id = ?1",
                [user_id],
                |row| Ok(User { id: row.get(0)?, name: row.get(1)?, address: row.get(2)?, created_at: row.get(3)? }),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("user #{}", user_id)))
        })
    }
}
