//! Activity log.
//!
//! Every operator-facing event is emitted through `tracing` and also
//! recorded here: appended to a bounded in-memory history (served by the
//! dashboard) and to a plain-text file, one `[RFC3339 timestamp] message`
//! line per entry. File errors are reported via `tracing` and never abort
//! the caller.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Default activity file path.
pub const DEFAULT_ACTIVITY_FILE: &str = "swap_logs.txt";

/// Maximum number of entries kept in memory.
pub const MAX_IN_MEMORY_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct LogBuffer {
    entries: VecDeque<String>,
    total: usize,
}

/// Append-only file target. The handle is opened on first write and kept;
/// a failed write drops it so the next entry reopens the file.
#[derive(Debug)]
struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    fn append(&mut self, line: &str) {
        if let Err(e) = self.try_append(line) {
            self.file = None;
            warn!(path = %self.path.display(), error = %e, "Failed to write activity log");
        }
    }

    fn try_append(&mut self, line: &str) -> std::io::Result<()> {
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new().create(true).append(true).open(&self.path)?,
        };
        writeln!(self.file.insert(file), "{line}")
    }
}

/// Shared, append-only activity log. Cheap to clone.
///
/// The history and the file have separate locks, so readers of the
/// history never wait on disk I/O.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    history: Arc<Mutex<LogBuffer>>,
    sink: Option<Arc<Mutex<FileSink>>>,
}

impl ActivityLog {
    /// Create a log that also appends to `sink` when given.
    pub fn new(sink: Option<PathBuf>) -> Self {
        Self {
            history: Arc::new(Mutex::new(LogBuffer::default())),
            sink: sink.map(|path| Arc::new(Mutex::new(FileSink { path, file: None }))),
        }
    }

    /// In-memory only, no file sink.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Record an informational event.
    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "autoswap::activity", "{message}");
        self.record(message);
    }

    /// Record a failure or anomaly.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "autoswap::activity", "{message}");
        self.record(message);
    }

    /// Total number of entries recorded since creation.
    pub fn len(&self) -> usize {
        self.history.lock().total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `limit` most recent lines, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<String> {
        let buf = self.history.lock();
        let skip = buf.entries.len().saturating_sub(limit);
        buf.entries.iter().skip(skip).cloned().collect()
    }

    fn record(&self, message: String) {
        let line = format!("[{}] {}", Utc::now().to_rfc3339(), message);

        if let Some(sink) = &self.sink {
            sink.lock().append(&line);
        }

        let mut buf = self.history.lock();
        buf.entries.push_back(line);
        if buf.entries.len() > MAX_IN_MEMORY_ENTRIES {
            buf.entries.pop_front();
        }
        buf.total += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("autoswap_test_log_{}.txt", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn test_records_in_order() {
        let log = ActivityLog::in_memory();
        log.info("first");
        log.warn("second");
        log.info("third");

        assert_eq!(log.len(), 3);
        let lines = log.recent(10);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
        assert!(lines[2].ends_with("] third"));
    }

    #[test]
    fn test_line_format_has_rfc3339_prefix() {
        let log = ActivityLog::in_memory();
        log.info("Current token price: $0.0042");

        let line = &log.recent(1)[0];
        assert!(line.starts_with('['));
        let close = line.find(']').unwrap();
        let stamp = &line[1..close];
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert_eq!(&line[close + 2..], "Current token price: $0.0042");
    }

    #[test]
    fn test_recent_returns_tail() {
        let log = ActivityLog::in_memory();
        for i in 0..5 {
            log.info(format!("entry {i}"));
        }
        let tail = log.recent(2);
        assert_eq!(tail.len(), 2);
        assert!(tail[0].ends_with("entry 3"));
        assert!(tail[1].ends_with("entry 4"));
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_history_is_bounded_but_count_is_not() {
        let log = ActivityLog::in_memory();
        for i in 0..MAX_IN_MEMORY_ENTRIES + 5 {
            log.info(format!("entry {i}"));
        }
        assert_eq!(log.len(), MAX_IN_MEMORY_ENTRIES + 5);
        let all = log.recent(usize::MAX);
        assert_eq!(all.len(), MAX_IN_MEMORY_ENTRIES);
        assert!(all[0].ends_with("entry 5"));
    }

    #[test]
    fn test_appends_to_file() {
        let path = temp_path();
        let log = ActivityLog::new(Some(path.clone()));
        log.info("Bot started");
        log.warn("Swap failed: no route");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] Bot started"));
        assert!(lines[1].ends_with("] Swap failed: no route"));

        // A second log on the same file appends rather than truncates.
        let again = ActivityLog::new(Some(path.clone()));
        again.info("Bot restarted");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unwritable_file_does_not_abort() {
        let mut path = temp_path();
        path.push("missing_dir");
        path.push("log.txt");
        let log = ActivityLog::new(Some(path));
        log.info("still recorded");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_file_handle_is_reused() {
        let path = temp_path();
        let log = ActivityLog::new(Some(path.clone()));
        log.info("one");
        assert!(log.sink.as_ref().unwrap().lock().file.is_some());
        log.info("two");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_history_readable_while_file_busy() {
        let path = temp_path();
        let log = ActivityLog::new(Some(path.clone()));
        log.info("written");

        let busy = log.sink.as_ref().unwrap().lock();
        assert_eq!(log.len(), 1);
        assert!(log.recent(1)[0].ends_with("] written"));

        drop(busy);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_write_drops_handle() {
        let mut path = temp_path();
        path.push("missing_dir");
        path.push("log.txt");
        let log = ActivityLog::new(Some(path));
        log.info("still recorded");
        assert!(log.sink.as_ref().unwrap().lock().file.is_none());
    }

    #[test]
    fn test_clones_share_history() {
        let log = ActivityLog::in_memory();
        let other = log.clone();
        other.info("from clone");
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }
}
