//! Single-slot crash record persistence.
//!
//! # Responsibility
//! - Persist at most one pending [`CrashRecord`] across process restarts.
//! - Keep SQL and serialization details inside the persistence boundary.
//!
//! # Invariants
//! - `persist` overwrites any existing slot (last crash wins).
//! - `consume` deletes the slot before returning it; repeat calls without
//!   an intervening crash return `None`.

use crate::model::crash::CrashRecord;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

const CRASH_SLOT_KEY: &str = "pending_crash";

/// Repository interface for the pending-crash slot.
pub trait CrashSlotRepository {
    fn persist(&self, record: &CrashRecord) -> RepoResult<()>;
    fn consume(&self) -> RepoResult<Option<CrashRecord>>;
}

/// SQLite-backed crash slot over the `kv_slots` table.
pub struct SqliteCrashSlot<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCrashSlot<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CrashSlotRepository for SqliteCrashSlot<'_> {
    fn persist(&self, record: &CrashRecord) -> RepoResult<()> {
        let value = serde_json::to_string(record)
            .map_err(|err| RepoError::InvalidData(format!("crash record encode failed: {err}")))?;

        self.conn.execute(
            "INSERT INTO kv_slots (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![CRASH_SLOT_KEY, value],
        )?;

        Ok(())
    }

    fn consume(&self) -> RepoResult<Option<CrashRecord>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [CRASH_SLOT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(value) = value else {
            return Ok(None);
        };

        // Delete first so a decode failure cannot leave a poison slot that
        // resurfaces on every launch.
        self.conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", [CRASH_SLOT_KEY])?;

        let record = serde_json::from_str(&value)
            .map_err(|err| RepoError::InvalidData(format!("crash record decode failed: {err}")))?;

        Ok(Some(record))
    }
}
