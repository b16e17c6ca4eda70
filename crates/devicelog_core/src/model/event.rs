//! Log event domain model and severity admission rules.
//!
//! # Responsibility
//! - Define the canonical event record handed to the sink and the listener.
//! - Define the severity order used for admission decisions.
//!
//! # Invariants
//! - Severity order is `Verbose < Info < Warning < Error`.
//! - An event exactly at the configured minimum is admitted.
//! - Events are immutable; only their rendered line is ever persisted.

use serde::{Deserialize, Serialize};

/// Ordered log severity.
///
/// The derived `Ord` follows declaration order, which is the admission
/// order used by [`should_admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Single-letter marker rendered into the persisted line.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Verbose => "V",
            Self::Info => "I",
            Self::Warning => "W",
            Self::Error => "E",
        }
    }

    /// Stable lowercase name, used by settings and FFI parsing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Parses the stable name produced by [`LogLevel::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "verbose" => Some(Self::Verbose),
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Marker rendered for fault records. Deliberately not a [`LogLevel`]
/// variant: crash lines bypass severity filtering entirely.
pub const CRASH_MARKER: &str = "CRASH";

/// Returns whether an event at `level` passes a configured `minimum`.
///
/// # Contract
/// - Inclusive at the boundary: `should_admit(m, m)` is `true`.
pub fn should_admit(level: LogLevel, minimum: LogLevel) -> bool {
    level >= minimum
}

/// Closed set of subsystem tags classifying the emitting code.
///
/// Carried on the event and forwarded to the listener; not rendered into
/// the persisted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDomain {
    App,
    View,
    Layout,
    Controller,
    Routing,
    Service,
    Model,
    Network,
    Cache,
    Db,
}

impl LogDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::View => "view",
            Self::Layout => "layout",
            Self::Controller => "controller",
            Self::Routing => "routing",
            Self::Service => "service",
            Self::Model => "model",
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Db => "db",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "app" => Some(Self::App),
            "view" => Some(Self::View),
            "layout" => Some(Self::Layout),
            "controller" => Some(Self::Controller),
            "routing" => Some(Self::Routing),
            "service" => Some(Self::Service),
            "model" => Some(Self::Model),
            "network" => Some(Self::Network),
            "cache" => Some(Self::Cache),
            "db" => Some(Self::Db),
            _ => None,
        }
    }
}

/// One structured log call, constructed per emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Free-form message body.
    pub message: String,
    /// Severity used for admission and the line marker.
    pub level: LogLevel,
    /// Subsystem tag for the listener.
    pub domain: LogDomain,
    /// Identifies the calling site (type/function name).
    pub source: String,
}

impl LogEvent {
    pub fn new(
        source: impl Into<String>,
        level: LogLevel,
        domain: LogDomain,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            level,
            domain,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{should_admit, LogDomain, LogLevel};

    #[test]
    fn severity_order_matches_contract() {
        assert!(LogLevel::Verbose < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn admission_is_inclusive_at_minimum() {
        assert!(should_admit(LogLevel::Info, LogLevel::Info));
        assert!(should_admit(LogLevel::Error, LogLevel::Info));
        assert!(!should_admit(LogLevel::Verbose, LogLevel::Info));
    }

    #[test]
    fn level_name_roundtrip() {
        for level in [
            LogLevel::Verbose,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ] {
            assert_eq!(LogLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(LogLevel::parse(" WARN "), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("fatal"), None);
    }

    #[test]
    fn domain_name_roundtrip() {
        assert_eq!(LogDomain::parse("network"), Some(LogDomain::Network));
        assert_eq!(LogDomain::parse("unknown"), None);
    }
}
