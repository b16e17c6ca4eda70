//! Append-only device-log file writer.
//!
//! # Responsibility
//! - Own the active log file handle across initialize/rename/clear.
//! - Serialize all file access so concurrent writes never interleave.
//! - Enforce the size bound by truncating after the fact.
//!
//! # Invariants
//! - Exactly one active file; name, handle and cached size change together
//!   under one lock.
//! - A rename is destructive: the old file is deleted, nothing is carried
//!   over, and no write can land between the delete and the re-open.
//! - I/O failures degrade to an absent handle plus a side-channel log
//!   entry; they are never surfaced to callers.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, error, info};

use crate::sink::clock::Clock;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Renders one device-log line.
///
/// Shape: `[timestamp] L >> source: message [QUEUE: queue-name]\n`.
pub fn render_line(
    timestamp: &str,
    marker: &str,
    source: &str,
    queue: &str,
    message: &str,
) -> String {
    format!("[{timestamp}] {marker} >> {source}: {message} [QUEUE: {queue}]\n")
}

struct WriterState {
    file_name: String,
    file: Option<File>,
    size_bytes: u64,
}

/// Serialized writer over the single active `<dir>/<name>.log` file.
pub struct LogWriter {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<WriterState>,
}

impl LogWriter {
    /// Creates a writer rooted at `dir` and opens `<file_name>.log`.
    ///
    /// Open failure is recoverable: the writer is still returned with an
    /// absent handle and subsequent writes are dropped until the next
    /// successful `rename`.
    pub fn new(dir: impl Into<PathBuf>, file_name: &str, clock: Arc<dyn Clock>) -> Self {
        let writer = Self {
            dir: dir.into(),
            clock,
            state: Mutex::new(WriterState {
                file_name: file_name.to_string(),
                file: None,
                size_bytes: 0,
            }),
        };
        {
            let mut state = writer.lock_state();
            writer.initialize_locked(&mut state);
        }
        writer
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WriterState> {
        // A poisoned lock means a writer panicked mid-append; the state it
        // protects is still structurally sound, so keep logging.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!("{file_name}.log"))
    }

    /// Opens (creating if absent) the file named by the current state and
    /// records the handle and on-disk size. Must be called with the state
    /// lock held.
    fn initialize_locked(&self, state: &mut WriterState) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            error!(
                "event=log_init module=sink status=error error_code=dir_create_failed dir={} error={}",
                self.dir.display(),
                err
            );
            state.file = None;
            state.size_bytes = 0;
            return;
        }

        let path = self.path_for(&state.file_name);
        match OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
        {
            Ok(file) => {
                state.size_bytes = file.metadata().map(|meta| meta.len()).unwrap_or(0);
                state.file = Some(file);
                info!(
                    "event=log_init module=sink status=ok file={} size_bytes={}",
                    path.display(),
                    state.size_bytes
                );
            }
            Err(err) => {
                error!(
                    "event=log_init module=sink status=error error_code=file_open_failed file={} error={}",
                    path.display(),
                    err
                );
                state.file = None;
                state.size_bytes = 0;
            }
        }
    }

    /// Appends one rendered line. Best-effort: with no open handle the
    /// event is dropped after a side-channel diagnostic.
    pub fn write(&self, source: &str, marker: &str, queue: &str, message: &str) {
        let line = render_line(&self.clock.timestamp(), marker, source, queue, message);

        let mut state = self.lock_state();
        let Some(file) = state.file.as_mut() else {
            debug!("event=log_write module=sink status=dropped reason=no_handle");
            return;
        };

        // The handle is opened in append mode, so the kernel positions
        // every write at end-of-file atomically.
        match file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
            Ok(()) => state.size_bytes += line.len() as u64,
            Err(err) => {
                error!(
                    "event=log_write module=sink status=error error_code=append_failed error={}",
                    err
                );
            }
        }
    }

    /// Switches the active file. No-op when the name is unchanged;
    /// otherwise the old file is deleted and the new one starts empty.
    pub fn rename(&self, new_file_name: &str) {
        let mut state = self.lock_state();
        if state.file_name == new_file_name {
            return;
        }

        let old_path = self.path_for(&state.file_name);
        state.file = None;
        if let Err(err) = fs::remove_file(&old_path) {
            // Absence of the old file is fine; anything else is diagnostic.
            debug!(
                "event=log_rename module=sink status=partial error_code=old_delete_failed file={} error={}",
                old_path.display(),
                err
            );
        }

        state.file_name = new_file_name.to_string();
        self.initialize_locked(&mut state);
        info!(
            "event=log_rename module=sink status=ok file={}",
            new_file_name
        );
    }

    /// Truncates the active file to empty in place.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        self.clear_locked(&mut state);
    }

    fn clear_locked(&self, state: &mut WriterState) {
        let Some(file) = state.file.as_mut() else {
            return;
        };
        match file.set_len(0) {
            Ok(()) => {
                state.size_bytes = 0;
                info!("event=log_clear module=sink status=ok");
            }
            Err(err) => {
                error!(
                    "event=log_clear module=sink status=error error_code=truncate_failed error={}",
                    err
                );
            }
        }
    }

    /// Truncates the file when its size in MB strictly exceeds `max_mb`.
    ///
    /// Correction is after-the-fact: a single write may transiently push
    /// the file above the bound, the next check brings it back to zero.
    pub fn enforce_size_limit(&self, max_mb: u64) {
        let mut state = self.lock_state();
        // Saturate so an oversized bound reads as "unbounded" instead of
        // wrapping below the current size.
        if state.size_bytes > max_mb.saturating_mul(BYTES_PER_MB) {
            info!(
                "event=log_size_guard module=sink status=truncating size_bytes={} max_mb={}",
                state.size_bytes, max_mb
            );
            self.clear_locked(&mut state);
        }
    }

    /// Full current file contents, or `None` when the file is missing.
    pub fn read_all(&self) -> Option<Vec<u8>> {
        let state = self.lock_state();
        fs::read(self.path_for(&state.file_name)).ok()
    }

    /// Cached size of the active file in bytes.
    pub fn file_size_bytes(&self) -> u64 {
        self.lock_state().size_bytes
    }

    /// Name (without extension) of the active file.
    pub fn file_name(&self) -> String {
        self.lock_state().file_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{render_line, LogWriter};
    use crate::sink::clock::FixedClock;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_writer(dir: &TempDir, name: &str) -> LogWriter {
        LogWriter::new(dir.path(), name, Arc::new(FixedClock("01/02/26 10:20:30")))
    }

    #[test]
    fn render_line_matches_contract_shape() {
        let line = render_line("01/02/26 10:20:30", "E", "Login", "main", "auth failed");
        assert_eq!(
            line,
            "[01/02/26 10:20:30] E >> Login: auth failed [QUEUE: main]\n"
        );
    }

    #[test]
    fn initialize_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");

        assert!(dir.path().join("DeviceLogs.log").exists());
        assert_eq!(writer.file_size_bytes(), 0);
        assert_eq!(writer.read_all().unwrap(), b"");
    }

    #[test]
    fn writes_append_in_call_order() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");

        writer.write("A", "I", "main", "first");
        writer.write("B", "W", "worker", "second");

        let content = String::from_utf8(writer.read_all().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("I >> A: first [QUEUE: main]"));
        assert!(lines[1].contains("W >> B: second [QUEUE: worker]"));
    }

    #[test]
    fn cached_size_tracks_appended_bytes() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");

        writer.write("A", "I", "main", "hello");
        let on_disk = std::fs::metadata(dir.path().join("DeviceLogs.log"))
            .unwrap()
            .len();
        assert_eq!(writer.file_size_bytes(), on_disk);
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");
        writer.write("A", "I", "main", "keep me");

        writer.rename("DeviceLogs");
        let content = String::from_utf8(writer.read_all().unwrap()).unwrap();
        assert!(content.contains("keep me"));
    }

    #[test]
    fn rename_deletes_old_file_and_starts_empty() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");
        writer.write("A", "I", "main", "old data");

        writer.rename("Test");

        assert!(!dir.path().join("DeviceLogs.log").exists());
        assert!(dir.path().join("Test.log").exists());
        assert_eq!(writer.read_all().unwrap(), b"");

        writer.write("B", "I", "main", "new data");
        let content = String::from_utf8(writer.read_all().unwrap()).unwrap();
        assert!(content.contains("new data"));
        assert!(!content.contains("old data"));
    }

    #[test]
    fn clear_truncates_to_zero() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");
        writer.write("A", "I", "main", "something");
        assert!(writer.file_size_bytes() > 0);

        writer.clear();
        assert_eq!(writer.file_size_bytes(), 0);
        assert_eq!(writer.read_all().unwrap(), b"");
    }

    #[test]
    fn size_guard_truncates_only_above_bound() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");
        writer.write("A", "I", "main", "small");

        // Under the bound: untouched.
        writer.enforce_size_limit(1);
        assert!(writer.file_size_bytes() > 0);

        // Above the bound (0 MB): truncated to empty, not trimmed.
        writer.enforce_size_limit(0);
        assert_eq!(writer.file_size_bytes(), 0);
        assert_eq!(writer.read_all().unwrap(), b"");
    }

    #[test]
    fn size_guard_treats_huge_bound_as_unbounded() {
        let dir = TempDir::new().unwrap();
        let writer = test_writer(&dir, "DeviceLogs");
        writer.write("A", "I", "main", "keep me");
        let written = writer.file_size_bytes();
        assert!(written > 0);

        // A bound whose byte product would overflow must never truncate.
        writer.enforce_size_limit(u64::MAX);
        writer.enforce_size_limit(u64::MAX / 2);
        assert_eq!(writer.file_size_bytes(), written);
    }

    #[test]
    fn open_failure_drops_writes_until_rename_recovers() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the log path forces the open to fail.
        std::fs::create_dir(dir.path().join("DeviceLogs.log")).unwrap();

        let writer = test_writer(&dir, "DeviceLogs");
        assert_eq!(writer.file_size_bytes(), 0);

        // Writes are silently dropped while the handle is absent.
        writer.write("A", "I", "main", "lost");
        assert_eq!(writer.file_size_bytes(), 0);

        // Rotating to a usable name re-initializes and writes land again.
        writer.rename("Recovered");
        writer.write("A", "I", "main", "landed");
        let content = String::from_utf8(writer.read_all().unwrap()).unwrap();
        assert!(content.contains("landed"));
        assert!(!content.contains("lost"));
    }

    #[test]
    fn concurrent_writes_never_interleave_lines() {
        let dir = TempDir::new().unwrap();
        let writer = Arc::new(test_writer(&dir, "DeviceLogs"));

        let mut handles = Vec::new();
        for worker in 0..4 {
            let writer = Arc::clone(&writer);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    writer.write(
                        &format!("Worker{worker}"),
                        "I",
                        "bg",
                        &format!("message {i}"),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let content = String::from_utf8(writer.read_all().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with("[01/02/26 10:20:30] I >> Worker"));
            assert!(line.ends_with("[QUEUE: bg]"));
        }
    }
}
