//! Persisted configuration keys.
//!
//! # Responsibility
//! - Persist the active device-log file name across restarts.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Keys are single-valued; a write replaces the previous value.

use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

const LOG_FILE_NAME_KEY: &str = "log_file_name";

/// Repository interface for persisted configuration.
pub trait SettingsRepository {
    fn log_file_name(&self) -> RepoResult<Option<String>>;
    fn set_log_file_name(&self, name: &str) -> RepoResult<()>;
}

/// SQLite-backed settings over the `kv_slots` table.
pub struct SqliteSettings<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettings<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_slots WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SettingsRepository for SqliteSettings<'_> {
    fn log_file_name(&self) -> RepoResult<Option<String>> {
        self.get(LOG_FILE_NAME_KEY)
    }

    fn set_log_file_name(&self, name: &str) -> RepoResult<()> {
        self.put(LOG_FILE_NAME_KEY, name)
    }
}
