//! Crash record domain model.
//!
//! # Responsibility
//! - Define the minimal structured capture of one fault.
//! - Provide the flat serialized shape stored in the crash slot.
//!
//! # Invariants
//! - `call_stack` preserves capture order (outermost last).
//! - The persisted shape is a flat field map; no schema versioning.

use serde::{Deserialize, Serialize};

/// One captured fault, built inside a fault interceptor and persisted for
/// next-launch retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// Fault class, e.g. `panic` or `signal`.
    pub name: String,
    /// Human-readable cause (panic payload or signal description).
    pub reason: String,
    /// Captured call stack, one frame per entry.
    pub call_stack: Vec<String>,
}

impl CrashRecord {
    pub fn new(
        name: impl Into<String>,
        reason: impl Into<String>,
        call_stack: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
            call_stack,
        }
    }

    /// One-line summary used for the CRASH line in the device log.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.name, self.reason)
    }
}
