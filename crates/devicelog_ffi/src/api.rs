//! FFI use-case API for host-app-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Keep error semantics simple: emission is fire-and-forget, setup
//!   returns an error string only when misused.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - One process-wide service instance; `init_device_log` decides its
//!   storage root once.

use devicelog_core::{
    core_version as core_version_inner, crash, default_log_level,
    init_logging as init_logging_inner, open_store, ping as ping_inner, CrashRecord,
    DeviceLogService, LogDomain, LogLevel,
};
use log::debug;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

const STORE_FILE_NAME: &str = "devicelog_store.sqlite3";

struct FfiState {
    storage_dir: PathBuf,
    service: Arc<DeviceLogService>,
}

static STATE: OnceLock<FfiState> = OnceLock::new();

fn service() -> Option<Arc<DeviceLogService>> {
    STATE.get().map(|state| Arc::clone(&state.service))
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core diagnostic logging once per process.
///
/// Input semantics:
/// - `level`: `trace|debug|info|warn|error` (case-insensitive); empty
///   string selects the build-mode default.
/// - `log_dir`: absolute directory for the rolling diagnostic logs.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = if level.trim().is_empty() {
        default_log_level()
    } else {
        level.as_str()
    };
    match init_logging_inner(level, log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes the device-log service on `storage_dir`.
///
/// Input semantics:
/// - `storage_dir`: absolute directory for the log file and the crash
///   store; created when absent.
///
/// # FFI contract
/// - Sync call; opens the store and the active log file.
/// - Idempotent for the same directory; a different directory after
///   initialization returns an error message.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn init_device_log(storage_dir: String) -> String {
    let dir = PathBuf::from(storage_dir.trim());
    if !dir.is_absolute() {
        return format!("storage_dir must be an absolute path, got `{storage_dir}`");
    }

    if let Some(state) = STATE.get() {
        if state.storage_dir == dir {
            return String::new();
        }
        return format!(
            "device log already initialized at `{}`; refusing to switch to `{}`",
            state.storage_dir.display(),
            dir.display()
        );
    }

    if let Err(err) = std::fs::create_dir_all(&dir) {
        return format!("failed to create storage dir `{}`: {err}", dir.display());
    }

    let store = match open_store(dir.join(STORE_FILE_NAME)) {
        Ok(store) => store,
        Err(err) => return format!("failed to open crash store: {err}"),
    };

    let state = FfiState {
        storage_dir: dir.clone(),
        service: Arc::new(DeviceLogService::new(dir.clone(), store)),
    };
    match STATE.set(state) {
        Ok(()) => String::new(),
        // Lost a benign init race; report conflict only for a different dir.
        Err(_) => {
            let existing = STATE.get().map(|state| state.storage_dir.clone());
            if existing.as_deref() == Some(dir.as_path()) {
                String::new()
            } else {
                "device log already initialized with a different storage dir".to_string()
            }
        }
    }
}

/// Emits one log event.
///
/// Input semantics:
/// - `level`: `verbose|info|warning|error` (case-insensitive).
/// - `domain`: closed subsystem tag, e.g. `network`, `cache`, `view`.
/// - `queue`: name of the emitting queue/thread for the line suffix.
///
/// # FFI contract
/// - Sync, fire-and-forget; returns `false` only when the call could not
///   be interpreted (unknown level/domain) or the service is not
///   initialized. I/O problems never surface here.
#[flutter_rust_bridge::frb(sync)]
pub fn device_log(
    source: String,
    level: String,
    domain: String,
    queue: String,
    message: String,
) -> bool {
    let Some(service) = service() else {
        debug!("event=ffi_log module=ffi status=dropped reason=uninitialized");
        return false;
    };
    let (Some(level), Some(domain)) = (LogLevel::parse(&level), LogDomain::parse(&domain)) else {
        return false;
    };
    service.log(&source, level, domain, &queue, &message);
    true
}

/// Sets the minimum admitted severity. Returns `false` on an unknown
/// level name or when uninitialized.
#[flutter_rust_bridge::frb(sync)]
pub fn set_minimum_level(level: String) -> bool {
    let (Some(service), Some(level)) = (service(), LogLevel::parse(&level)) else {
        return false;
    };
    service.set_minimum_level(level);
    true
}

/// Sets the size bound in megabytes; the check runs immediately.
#[flutter_rust_bridge::frb(sync)]
pub fn set_max_file_size_mb(max_mb: u64) -> bool {
    let Some(service) = service() else {
        return false;
    };
    service.set_max_file_size_mb(max_mb);
    true
}

/// Current device-log size in bytes; `0` when uninitialized.
#[flutter_rust_bridge::frb(sync)]
pub fn log_file_size_bytes() -> u64 {
    service().map_or(0, |service| service.file_size_bytes())
}

/// Full device-log contents, or `None` when missing/uninitialized.
///
/// The attachment-composition UI on the host side is a pure consumer of
/// this call.
#[flutter_rust_bridge::frb(sync)]
pub fn read_device_log() -> Option<String> {
    let service = service()?;
    let bytes = service.read_all()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Truncates the device log to empty.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_device_log() -> bool {
    let Some(service) = service() else {
        return false;
    };
    service.clear();
    true
}

/// Rotates the active log file (destructive) and persists the new name.
#[flutter_rust_bridge::frb(sync)]
pub fn set_log_file_name(name: String) -> bool {
    let Some(service) = service() else {
        return false;
    };
    service.set_log_file_name(name.trim());
    true
}

/// Name (without extension) of the active log file; empty when
/// uninitialized.
#[flutter_rust_bridge::frb(sync)]
pub fn log_file_name() -> String {
    service().map_or_else(String::new, |service| service.log_file_name())
}

/// Crash report handed back to the host after arming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReportDto {
    /// Fault class (`panic` or `signal`).
    pub name: String,
    /// Human-readable cause.
    pub reason: String,
    /// Captured call stack, one frame per entry.
    pub call_stack: Vec<String>,
}

impl From<CrashRecord> for CrashReportDto {
    fn from(record: CrashRecord) -> Self {
        Self {
            name: record.name,
            reason: record.reason,
            call_stack: record.call_stack,
        }
    }
}

/// Arms crash capture and returns the crash left behind by the previous
/// run, if any.
///
/// # FFI contract
/// - First call after `init_device_log` installs the handlers and drains
///   the pending slot; later calls return `None`.
/// - Returns `None` (without arming) when uninitialized.
#[flutter_rust_bridge::frb(sync)]
pub fn arm_crash_capture() -> Option<CrashReportDto> {
    let service = service()?;
    crash::arm(service).map(CrashReportDto::from)
}

#[cfg(test)]
mod tests {
    use super::{device_log, init_device_log, log_file_name, ping};

    #[test]
    fn ping_is_stable() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn calls_before_init_degrade_gracefully() {
        // The process-wide state is untouched in this test binary.
        assert!(!device_log(
            "Test".into(),
            "info".into(),
            "app".into(),
            "main".into(),
            "dropped".into()
        ));
        assert_eq!(log_file_name(), "");
    }

    #[test]
    fn init_rejects_relative_dir() {
        let error = init_device_log("relative/dir".into());
        assert!(error.contains("absolute"));
    }
}
