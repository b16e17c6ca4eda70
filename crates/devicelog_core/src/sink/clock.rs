//! Timestamp source for rendered log lines.
//!
//! # Responsibility
//! - Supply the localized short-date/medium-time prefix of each line.
//! - Keep wall-clock access behind a trait so tests stay deterministic.

use chrono::Local;

/// Source of the timestamp rendered into each line.
pub trait Clock: Send + Sync {
    fn timestamp(&self) -> String;
}

/// Wall-clock implementation using the device-local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        // %x/%X render the locale short date and medium time, matching the
        // line shape consumers of the log file expect.
        Local::now().format("%x %X").to_string()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub &'static str);

#[cfg(test)]
impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        self.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, SystemClock};

    #[test]
    fn system_clock_produces_date_and_time_fields() {
        let stamp = SystemClock.timestamp();
        assert!(stamp.contains(' '));
        assert!(!stamp.contains('\n'));
    }
}
