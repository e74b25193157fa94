//! Shared daily LOG file.
//!
//! All ports and the system itself report operational events here, one line per
//! event, in `<YYYYMMDD>.LOG` under the data directory. Appends are serialized
//! through a mutex so concurrent writers never interleave partial lines. Each event
//! is mirrored to `tracing` as well.

use super::rotation::log_file_name;
use super::writer::append_line;
use crate::clock::Clock;
use crate::record::format_timestamp;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Source name for events not tied to a port.
pub const SYSTEM_SOURCE: &str = "system";

/// How an event is mirrored to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal operation.
    Info,
    /// Degraded but continuing.
    Warn,
    /// A fault was caught.
    Error,
}

/// One operational event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Port prefix, or [`SYSTEM_SOURCE`].
    pub source: String,
    /// Free text.
    pub message: String,
}

impl LogEvent {
    /// `<timestamp> <source>: <message>` with a trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{} {}: {}\n",
            format_timestamp(&self.timestamp),
            self.source,
            self.message
        )
    }
}

/// Append-only, process-wide event log.
pub struct EventLog {
    data_dir: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    events: AtomicUsize,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("data_dir", &self.data_dir)
            .field("events", &self.events.load(Ordering::Relaxed))
            .finish()
    }
}

impl EventLog {
    /// Log into `data_dir`, stamping events with `clock`.
    pub fn new(data_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            data_dir: data_dir.into(),
            clock,
            write_lock: Mutex::new(()),
            events: AtomicUsize::new(0),
        }
    }

    /// LOG file for the UTC date of `timestamp`.
    pub fn path_for(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.data_dir.join(log_file_name(timestamp))
    }

    /// Directory the LOG files live in.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Events recorded since creation.
    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::Relaxed)
    }

    /// System-level informational event.
    pub fn system(&self, message: impl Into<String>) {
        self.log(SYSTEM_SOURCE, Severity::Info, message);
    }

    /// Port-level informational event.
    pub fn port_info(&self, prefix: &str, message: impl Into<String>) {
        self.log(prefix, Severity::Info, message);
    }

    /// Port-level fault.
    pub fn port_error(&self, prefix: &str, message: impl Into<String>) {
        self.log(prefix, Severity::Error, message);
    }

    /// Stamp and record an event.
    pub fn log(&self, source: &str, severity: Severity, message: impl Into<String>) {
        let event = LogEvent {
            timestamp: self.clock.now(),
            source: source.to_string(),
            message: message.into(),
        };
        self.record(&event, severity);
    }

    /// Record an already-stamped event. Failure to write the LOG is reported to
    /// diagnostics only.
    pub fn record(&self, event: &LogEvent, severity: Severity) {
        match severity {
            Severity::Info => info!(source = %event.source, "{}", event.message),
            Severity::Warn => warn!(source = %event.source, "{}", event.message),
            Severity::Error => error!(source = %event.source, "{}", event.message),
        }

        let path = self.path_for(&event.timestamp);
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.events.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = append_line(&path, &event.to_line()) {
            error!(error = %e, "failed to append to daily LOG");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()
    }

    #[test]
    fn writes_timestamped_lines_to_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(start());
        let log = EventLog::new(dir.path(), Arc::new(clock.clone()));

        log.system("Logging starts");
        log.port_error("tempA", "Unexpected error with port /dev/ttyUSB0: timed out");

        let text = std::fs::read_to_string(dir.path().join("20240105.LOG")).unwrap();
        assert_eq!(
            text,
            "2024/01/05 10:00:00 GMT system: Logging starts\n\
             2024/01/05 10:00:00 GMT tempA: Unexpected error with port /dev/ttyUSB0: timed out\n"
        );
        assert_eq!(log.event_count(), 2);
    }

    #[test]
    fn follows_the_clock_into_the_next_day() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(start());
        let log = EventLog::new(dir.path(), Arc::new(clock.clone()));

        log.system("before");
        clock.set(Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 5).unwrap());
        log.system("after");

        assert!(dir.path().join("20240105.LOG").exists());
        assert!(dir.path().join("20240106.LOG").exists());
    }

    #[test]
    fn concurrent_writers_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(EventLog::new(
            dir.path(),
            Arc::new(ManualClock::new(start())),
        ));

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.port_info(&format!("port{}", n), format!("event {}", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = std::fs::read_to_string(dir.path().join("20240105.LOG")).unwrap();
        assert_eq!(text.lines().count(), 200);
        assert!(text
            .lines()
            .all(|line| line.starts_with("2024/01/05 10:00:00 GMT port")));
    }

    #[test]
    fn unwritable_directory_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(
            dir.path().join("missing"),
            Arc::new(ManualClock::new(start())),
        );
        log.system("nowhere to go");
        assert_eq!(log.event_count(), 1);
    }
}
