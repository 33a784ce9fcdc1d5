//! Message bases and the messages posted to them.

use rusqlite::{OptionalExtension, Row};
use std::sync::Arc;

use super::{now_timestamp, BaseId, MessageBase, MessageId, Storage, StorageError, StorageResult, UserId};

/// Content of the audit row written at every successful login
pub const LOGIN_EVENT: &str = "User logged in";

#[derive(Clone)]
pub struct MessageBaseDirectory {
    storage: Arc<Storage>,
}

fn base_from_row(row: &Row<'_>) -> rusqlite::Result<MessageBase> {
    Ok(MessageBase {
        id: row.get(0)?,
        name: row.get(1)?,
        access_read: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        access_post: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
    })
}

/// Trimmed base name; blank names are rejected
fn checked_name(name: &str) -> StorageResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::Invalid("Message base name cannot be empty".to_string()));
    }
    Ok(name)
}

impl MessageBaseDirectory {
    pub fn new(storage: Arc<Storage>) -> Self {
        MessageBaseDirectory { storage }
    }

    pub fn create(&self, name: &str, access_read: i64, access_post: i64) -> StorageResult<BaseId> {
        let name = checked_name(name)?;
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_bases (name, access_read, access_post) VALUES (?1, ?2, ?3)",
                (name, access_read, access_post),
            )
            .map_err(|e| StorageError::from_insert(e, "message base"))?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update(&self, id: BaseId, name: &str, access_read: i64, access_post: i64) -> StorageResult<()> {
        let name = checked_name(name)?;
        self.storage.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE message_bases SET name = ?1, access_read = ?2, access_post = ?3 WHERE id = ?4",
                (name, access_read, access_post, id),
            )
            .map_err(|e| StorageError::from_insert(e, "message base"))?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!("message base #{}", id)));
            }
            Ok(())
        })
    }

    /// Remove a base. Fails while messages still reference it.
    pub fn delete(&self, id: BaseId) -> StorageResult<()> {
        self.storage.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM message_bases WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!("message base #{}", id)));
            }
            Ok(())
        })
    }

    /// All bases in creation order
    pub fn list(&self) -> StorageResult<Vec<MessageBase>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, access_read, access_post FROM message_bases ORDER BY id")?;
            let bases = stmt.query_map([], base_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bases)
        })
    }

    pub fn resolve_name(&self, name: &str) -> StorageResult<BaseId> {
        self.storage.with_conn(|conn| {
            conn.query_row("SELECT id FROM message_bases WHERE name = ?1", [name], |row| row.get(0))
                .optional()?
                .ok_or_else(|| StorageError::NotFound(format!("message base {}", name)))
        })
    }

    pub fn get(&self, id: BaseId) -> StorageResult<MessageBase> {
        self.storage.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, access_read, access_post FROM message_bases WHERE id = ?1",
                [id],
                base_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("message base #{}", id)))
        })
    }

    /// Messages of a base as `author (timestamp): content`, newest first
    pub fn list_messages(&self, base_id: BaseId) -> StorageResult<Vec<String>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT users.name, messages.content, messages.created_at
                 FROM messages
                 JOIN users ON messages.user_id = users.id
                 WHERE messages.message_base_id = ?1
                 ORDER BY messages.created_at DESC, messages.id DESC",
            )?;
            let lines = stmt
                .query_map([base_id], |row| {
                    let name: String = row.get(0)?;
                    let content: Option<String> = row.get(1)?;
                    let created_at: String = row.get(2)?;
                    Ok(format!("{} ({}): {}", name, created_at, content.unwrap_or_default()))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(lines)
        })
    }

    pub fn post_message(&self, user_id: UserId, base_id: BaseId, content: &str) -> StorageResult<MessageId> {
        self.insert_message(user_id, Some(base_id), content)
    }

    /// Audit row for a successful login; it belongs to no base
    pub fn record_login(&self, user_id: UserId) -> StorageResult<MessageId> {
        self.insert_message(user_id, None, LOGIN_EVENT)
    }

    fn insert_message(&self, user_id: UserId, base_id: Option<BaseId>, content: &str) -> StorageResult<MessageId> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, message_base_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                (user_id, base_id, content, now_timestamp()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}
