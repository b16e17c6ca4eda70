//! Fault interceptors: panic hook and fatal-signal handlers.
//!
//! # Responsibility
//! - Arm crash capture once per process and hand back any crash record
//!   persisted by a previous run.
//! - On an uncaught panic or fatal signal, capture a [`CrashRecord`],
//!   append a CRASH line to the device log, forward a synthesized error
//!   event, and persist the record for next-launch retrieval.
//!
//! # Invariants
//! - Arming is idempotent; only the first call consumes the pending slot.
//! - The panic hook chains to the previously installed hook.
//! - The signal handler restores default dispositions only at the very
//!   end, immediately before re-raising; a crash inside a handler is not
//!   re-intercepted.
//! - Handler state is statically reachable; the `extern "C"` trampoline
//!   captures nothing.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::model::crash::CrashRecord;
use crate::service::DeviceLogService;

/// Frames contributed by the signal trampoline and the capture helper,
/// dropped from signal-crash stacks.
const SIGNAL_HANDLER_FRAMES: usize = 2;

const MAX_REASON_CHARS: usize = 160;

static RUNTIME: OnceCell<CrashRuntime> = OnceCell::new();

struct CrashRuntime {
    service: Arc<DeviceLogService>,
}

#[cfg(unix)]
const FATAL_SIGNALS: &[(libc::c_int, &str)] = &[
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGBUS, "SIGBUS"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGTRAP, "SIGTRAP"),
];

/// Arms crash capture for the process and returns the crash record left
/// behind by a previous run, if any.
///
/// # Contract
/// - First call installs the panic hook and the fatal-signal handlers,
///   then consumes the pending slot exactly once.
/// - Re-arming while armed is a no-op returning `None`.
pub fn arm(service: Arc<DeviceLogService>) -> Option<CrashRecord> {
    let mut first_arming = false;
    let runtime = RUNTIME.get_or_init(|| {
        first_arming = true;
        CrashRuntime { service }
    });
    if !first_arming {
        return None;
    }

    install_panic_hook();
    #[cfg(unix)]
    install_signal_handlers();

    runtime.service.consume_pending_crash()
}

/// Whether crash capture has been armed in this process.
pub fn is_armed() -> bool {
    RUNTIME.get().is_some()
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        previous_hook(panic_info);
        if let Some(runtime) = RUNTIME.get() {
            let record = CrashRecord::new(
                "panic",
                panic_reason(panic_info),
                capture_call_stack(0),
            );
            runtime.service.capture_crash(&record);
        }
        // The runtime terminates the process after an uncaught panic; the
        // hook itself returns normally.
    }));
}

#[cfg(unix)]
fn install_signal_handlers() {
    for &(signum, _) in FATAL_SIGNALS {
        // SAFETY: installing a handler for a signal number from the fixed
        // fatal set; the handler is an extern "C" fn capturing nothing and
        // the action struct is fully initialized before the call.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_fatal_signal as usize;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(signum, &action, std::ptr::null_mut());
        }
    }
}

#[cfg(unix)]
extern "C" fn on_fatal_signal(signum: libc::c_int) {
    record_fatal_signal(signum);

    // Restore default dispositions last so a crash inside the capture
    // path above is not re-intercepted, then reproduce the original
    // fatal outcome.
    restore_default_handlers();
    // SAFETY: re-raising the signal that invoked this handler, now with
    // its default disposition, terminates the process.
    unsafe {
        libc::raise(signum);
    }
}

/// Handler body for a fatal signal, separated from the trampoline so a
/// synthetic signal number can exercise the capture path without
/// terminating the process.
pub fn record_fatal_signal(signum: i32) {
    let Some(runtime) = RUNTIME.get() else {
        return;
    };

    let record = CrashRecord::new(
        "signal",
        format!("{} ({signum})", signal_name(signum)),
        capture_call_stack(SIGNAL_HANDLER_FRAMES),
    );
    runtime.service.capture_crash(&record);
}

#[cfg(unix)]
fn restore_default_handlers() {
    for &(signum, _) in FATAL_SIGNALS {
        // SAFETY: resetting a fixed fatal signal to its default
        // disposition.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = libc::SIG_DFL;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(signum, &action, std::ptr::null_mut());
        }
    }
    // Restore the default panic hook as well; from here on faults take
    // the platform's original path.
    let _ = std::panic::take_hook();
}

fn signal_name(signum: i32) -> &'static str {
    #[cfg(unix)]
    {
        for &(known, name) in FATAL_SIGNALS {
            if known == signum {
                return name;
            }
        }
    }
    "UNKNOWN"
}

fn panic_reason(info: &PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());

    format!("{} at {location}", sanitize_reason(&payload, MAX_REASON_CHARS))
}

/// Panic payloads can include user-controlled text; strip newlines and
/// cap the length before the reason reaches the log line and the slot.
fn sanitize_reason(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

/// Captures the current call stack as one entry per frame, dropping the
/// `skip_frames` most recent ones.
fn capture_call_stack(skip_frames: usize) -> Vec<String> {
    let raw = Backtrace::force_capture().to_string();
    let mut frames: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Frame starts render as "N: symbol"; "at file:line" continuation
        // lines are folded into the preceding frame.
        let is_frame_start = trimmed
            .split_once(':')
            .map_or(false, |(head, _)| {
                !head.is_empty() && head.chars().all(|c| c.is_ascii_digit())
            });
        if is_frame_start {
            frames.push(trimmed.to_string());
        } else if let Some(last) = frames.last_mut() {
            last.push(' ');
            last.push_str(trimmed);
        }
    }

    frames.into_iter().skip(skip_frames).collect()
}

#[cfg(test)]
mod tests {
    use super::{capture_call_stack, sanitize_reason, signal_name};

    #[test]
    fn sanitize_reason_removes_newlines_and_truncates() {
        let sanitized = sanitize_reason("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn capture_call_stack_skips_recent_frames() {
        let full = capture_call_stack(0);
        let skipped = capture_call_stack(2);
        assert!(full.len() >= skipped.len());
        if full.len() >= 2 {
            assert_eq!(full.len() - skipped.len(), 2);
        }
    }

    #[cfg(unix)]
    #[test]
    fn signal_names_cover_fatal_set() {
        assert_eq!(signal_name(libc::SIGSEGV), "SIGSEGV");
        assert_eq!(signal_name(libc::SIGABRT), "SIGABRT");
        assert_eq!(signal_name(-1), "UNKNOWN");
    }
}
