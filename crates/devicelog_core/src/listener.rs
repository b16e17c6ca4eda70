//! External listener slot and forwarding.
//!
//! # Responsibility
//! - Hold at most one registered external listener.
//! - Forward admitted events after successful local persistence.
//!
//! # Invariants
//! - Registering a listener replaces the previous one.
//! - Forwarding with no listener registered is a no-op, never an error.

use crate::model::event::LogEvent;
use std::sync::{Arc, RwLock};

/// External consumer of admitted log events.
///
/// Invoked synchronously on the emitting thread; implementations are
/// expected to be cheap or to hand off internally.
pub trait LogListener: Send + Sync {
    fn on_event(&self, event: &LogEvent);
}

/// At-most-one listener slot.
#[derive(Default)]
pub struct ListenerSlot {
    slot: RwLock<Option<Arc<dyn LogListener>>>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the listener; `None` unregisters.
    pub fn set(&self, listener: Option<Arc<dyn LogListener>>) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = listener;
        }
    }

    /// Pure pass-through to the registered listener, if any.
    pub fn forward(&self, event: &LogEvent) {
        let listener = match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(_) => return,
        };
        if let Some(listener) = listener {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ListenerSlot, LogListener};
    use crate::model::event::{LogDomain, LogEvent, LogLevel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingListener(AtomicUsize);

    impl LogListener for CountingListener {
        fn on_event(&self, _event: &LogEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_event() -> LogEvent {
        LogEvent::new("Test", LogLevel::Info, LogDomain::App, "hello")
    }

    #[test]
    fn forward_without_listener_is_noop() {
        let slot = ListenerSlot::new();
        slot.forward(&sample_event());
    }

    #[test]
    fn forward_reaches_registered_listener() {
        let slot = ListenerSlot::new();
        let listener = Arc::new(CountingListener(AtomicUsize::new(0)));
        slot.set(Some(listener.clone()));

        slot.forward(&sample_event());
        slot.forward(&sample_event());
        assert_eq!(listener.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_replaces_and_unregisters() {
        let slot = ListenerSlot::new();
        let first = Arc::new(CountingListener(AtomicUsize::new(0)));
        let second = Arc::new(CountingListener(AtomicUsize::new(0)));

        slot.set(Some(first.clone()));
        slot.set(Some(second.clone()));
        slot.forward(&sample_event());
        assert_eq!(first.0.load(Ordering::SeqCst), 0);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);

        slot.set(None);
        slot.forward(&sample_event());
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
    }
}
