//! Process-local log sink and crash capture for mobile hosts.
//! This crate is the single source of truth for admission, file-growth
//! and crash-persistence invariants.

pub mod crash;
pub mod listener;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sink;
pub mod store;

pub use crash::{arm as arm_crash_capture, is_armed, record_fatal_signal};
pub use listener::{ListenerSlot, LogListener};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::crash::CrashRecord;
pub use model::event::{should_admit, LogDomain, LogEvent, LogLevel, CRASH_MARKER};
pub use service::device_log::{
    DeviceLogService, DEFAULT_LOG_FILE_NAME, DEFAULT_MAX_FILE_SIZE_MB,
};
pub use sink::{Clock, SystemClock};
pub use store::{open_store, open_store_in_memory, StoreError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
