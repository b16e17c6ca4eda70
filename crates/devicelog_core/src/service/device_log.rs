//! Device-log use-case service.
//!
//! # Responsibility
//! - Provide the public operations surface: emit, configure, inspect.
//! - Order the emission path: severity filter, file append plus size
//!   check, listener forward.
//! - Provide the crash write/persist path used by the fault interceptors.
//!
//! # Invariants
//! - No operation returns a propagating error; I/O failures degrade to a
//!   side-channel diagnostic and a dropped event.
//! - A file-name change is persisted and swapped before any subsequent
//!   write is accepted.
//! - Crash lines bypass the severity filter.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, warn};
use rusqlite::Connection;

use crate::listener::{ListenerSlot, LogListener};
use crate::model::crash::CrashRecord;
use crate::model::event::{should_admit, LogDomain, LogEvent, LogLevel, CRASH_MARKER};
use crate::repo::crash_slot::{CrashSlotRepository, SqliteCrashSlot};
use crate::repo::settings::{SettingsRepository, SqliteSettings};
use crate::sink::{Clock, LogWriter, SystemClock};

/// File name used until a caller persists a different one.
pub const DEFAULT_LOG_FILE_NAME: &str = "DeviceLogs";

/// Default size bound in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Source tag stamped on crash lines.
const CRASH_SOURCE: &str = "CrashReporter";

/// Queue tag stamped on crash lines; fault handlers run outside any
/// caller-named queue.
const CRASH_QUEUE: &str = "crash";

/// Process-wide logging facility.
///
/// Explicitly constructed and injected; tests build independent instances
/// on isolated storage roots.
pub struct DeviceLogService {
    writer: LogWriter,
    store: Mutex<Connection>,
    listener: ListenerSlot,
    minimum_level: AtomicU8,
    max_file_size_mb: AtomicU64,
}

impl DeviceLogService {
    /// Creates the service on `storage_dir` with the given key-value store
    /// connection, reopening the persisted file name when present.
    pub fn new(storage_dir: impl Into<PathBuf>, store: Connection) -> Self {
        Self::with_clock(storage_dir, store, Arc::new(SystemClock))
    }

    /// Same as [`DeviceLogService::new`] with an injected clock.
    pub fn with_clock(
        storage_dir: impl Into<PathBuf>,
        store: Connection,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let file_name = match SqliteSettings::new(&store).log_file_name() {
            Ok(Some(name)) => name,
            Ok(None) => DEFAULT_LOG_FILE_NAME.to_string(),
            Err(err) => {
                warn!(
                    "event=settings_read module=service status=error key=log_file_name error={}",
                    err
                );
                DEFAULT_LOG_FILE_NAME.to_string()
            }
        };

        let service = Self {
            writer: LogWriter::new(storage_dir, &file_name, clock),
            store: Mutex::new(store),
            listener: ListenerSlot::new(),
            minimum_level: AtomicU8::new(level_to_index(LogLevel::Verbose)),
            max_file_size_mb: AtomicU64::new(DEFAULT_MAX_FILE_SIZE_MB),
        };
        // Startup size check against the bound carried over from the
        // previous run.
        service.writer.enforce_size_limit(service.max_file_size_mb());
        service
    }

    fn lock_store(&self) -> MutexGuard<'_, Connection> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Emits one event: filter, append (with size check), forward.
    pub fn log(
        &self,
        source: &str,
        level: LogLevel,
        domain: LogDomain,
        queue: &str,
        message: &str,
    ) {
        if !should_admit(level, self.minimum_level()) {
            return;
        }

        self.writer.write(source, level.marker(), queue, message);
        self.writer.enforce_size_limit(self.max_file_size_mb());

        let event = LogEvent::new(source, level, domain, message);
        self.listener.forward(&event);
    }

    /// Crash path used by the fault interceptors: CRASH line, synthesized
    /// error-level forward, slot persist. Best-effort end to end and
    /// bypasses the severity filter.
    pub fn capture_crash(&self, record: &CrashRecord) {
        self.writer
            .write(CRASH_SOURCE, CRASH_MARKER, CRASH_QUEUE, &record.summary());

        let event = LogEvent::new(
            CRASH_SOURCE,
            LogLevel::Error,
            LogDomain::App,
            record.summary(),
        );
        self.listener.forward(&event);

        let store = self.lock_store();
        if let Err(err) = SqliteCrashSlot::new(&store).persist(record) {
            error!(
                "event=crash_persist module=service status=error error={}",
                err
            );
        }
    }

    /// Reads and clears the pending crash slot. Store failure reads as
    /// "no pending crash".
    pub fn consume_pending_crash(&self) -> Option<CrashRecord> {
        let store = self.lock_store();
        match SqliteCrashSlot::new(&store).consume() {
            Ok(pending) => pending,
            Err(err) => {
                warn!(
                    "event=crash_consume module=service status=error error={}",
                    err
                );
                None
            }
        }
    }

    pub fn minimum_level(&self) -> LogLevel {
        level_from_index(self.minimum_level.load(Ordering::Acquire))
    }

    /// Takes effect on the next write.
    pub fn set_minimum_level(&self, level: LogLevel) {
        self.minimum_level
            .store(level_to_index(level), Ordering::Release);
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_mb.load(Ordering::Acquire)
    }

    /// Stores the new bound and runs the size check immediately.
    pub fn set_max_file_size_mb(&self, max_mb: u64) {
        self.max_file_size_mb.store(max_mb, Ordering::Release);
        self.writer.enforce_size_limit(max_mb);
    }

    /// Registers or replaces the external listener; `None` unregisters.
    pub fn set_listener(&self, listener: Option<Arc<dyn LogListener>>) {
        self.listener.set(listener);
    }

    pub fn log_file_name(&self) -> String {
        self.writer.file_name()
    }

    /// Rotates to a new file name and persists it. No-op on equal name;
    /// rotation is destructive for the old file.
    pub fn set_log_file_name(&self, name: &str) {
        if self.writer.file_name() == name {
            return;
        }

        self.writer.rename(name);

        let store = self.lock_store();
        if let Err(err) = SqliteSettings::new(&store).set_log_file_name(name) {
            warn!(
                "event=settings_write module=service status=error key=log_file_name error={}",
                err
            );
        }
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.writer.file_size_bytes()
    }

    /// Full device-log contents, or `None` when the file is missing.
    pub fn read_all(&self) -> Option<Vec<u8>> {
        self.writer.read_all()
    }

    /// Truncates the device log to empty.
    pub fn clear(&self) {
        self.writer.clear();
    }
}

fn level_to_index(level: LogLevel) -> u8 {
    match level {
        LogLevel::Verbose => 0,
        LogLevel::Info => 1,
        LogLevel::Warning => 2,
        LogLevel::Error => 3,
    }
}

fn level_from_index(value: u8) -> LogLevel {
    match value {
        0 => LogLevel::Verbose,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        _ => LogLevel::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::{level_from_index, level_to_index};
    use crate::model::event::LogLevel;

    #[test]
    fn level_index_roundtrip() {
        for level in [
            LogLevel::Verbose,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ] {
            assert_eq!(level_from_index(level_to_index(level)), level);
        }
    }
}
