use std::sync::{Arc, Mutex};

use devicelog_core::repo::crash_slot::{CrashSlotRepository, SqliteCrashSlot};
#[cfg(unix)]
use devicelog_core::record_fatal_signal;
use devicelog_core::{
    arm_crash_capture, is_armed, open_store, Clock, CrashRecord, DeviceLogService, LogEvent,
    LogLevel, LogListener,
};
use tempfile::TempDir;

struct FixedClock;

impl Clock for FixedClock {
    fn timestamp(&self) -> String {
        "01/02/26 10:20:30".to_string()
    }
}

struct RecordingListener {
    events: Mutex<Vec<LogEvent>>,
}

impl LogListener for RecordingListener {
    fn on_event(&self, event: &LogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// Arming installs process-global handlers, so the whole lifecycle runs in
// one test: prior-record retrieval, idempotent re-arm, synthetic signal
// fault, relaunch consumption, panic-hook fault.
#[test]
fn crash_capture_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("store.sqlite3");

    // A previous run left a crash behind.
    {
        let conn = open_store(&store_path).unwrap();
        SqliteCrashSlot::new(&conn)
            .persist(&CrashRecord::new(
                "signal",
                "SIGABRT (6)",
                vec!["0: older_frame".to_string()],
            ))
            .unwrap();
    }

    let service = Arc::new(DeviceLogService::with_clock(
        dir.path(),
        open_store(&store_path).unwrap(),
        Arc::new(FixedClock),
    ));
    let listener = Arc::new(RecordingListener {
        events: Mutex::new(Vec::new()),
    });
    service.set_listener(Some(listener.clone()));

    // First arming returns the prior record exactly once.
    let prior = arm_crash_capture(Arc::clone(&service)).expect("prior crash should surface");
    assert_eq!(prior.name, "signal");
    assert_eq!(prior.reason, "SIGABRT (6)");
    assert!(is_armed());

    // Re-arming is a no-op and must not surface anything.
    assert!(arm_crash_capture(Arc::clone(&service)).is_none());
    assert!(service.consume_pending_crash().is_none());

    // Synthetic fatal signal exercises the handler body without
    // terminating the test process.
    #[cfg(unix)]
    {
        record_fatal_signal(libc::SIGSEGV);

        let content = String::from_utf8(service.read_all().unwrap()).unwrap();
        assert!(content.contains("CRASH >> CrashReporter:"));
        assert!(content.contains("SIGSEGV (11)"));
        assert!(content.ends_with("[QUEUE: crash]\n"));

        let events = listener.events.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, LogLevel::Error);
        assert_eq!(events[0].source, "CrashReporter");
        assert!(events[0].message.contains("SIGSEGV"));

        // Relaunch: a fresh store connection sees the record once.
        let conn = open_store(&store_path).unwrap();
        let slot = SqliteCrashSlot::new(&conn);
        let persisted = slot.consume().unwrap().expect("signal crash persisted");
        assert_eq!(persisted.name, "signal");
        assert!(persisted.reason.contains("SIGSEGV (11)"));
        assert!(slot.consume().unwrap().is_none());
    }

    // Panic path: the hook fires for any panic, so a caught one drives
    // the same capture sequence.
    let _ = std::panic::catch_unwind(|| panic!("synthetic panic for capture"));

    let pending = service
        .consume_pending_crash()
        .expect("panic crash persisted");
    assert_eq!(pending.name, "panic");
    assert!(pending.reason.contains("synthetic panic for capture"));
    assert!(service.consume_pending_crash().is_none());

    let content = String::from_utf8(service.read_all().unwrap()).unwrap();
    assert!(content.contains("panic: synthetic panic for capture"));
}
