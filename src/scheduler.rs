//! Round-robin acquisition loop.
//!
//! One pass visits every session in configuration order. For each enabled session
//! the scheduler polls for at most one completed record inside the
//! [`FailureIsolator`], appends it to the day's data file, and then asks the
//! [`RotationPolicy`] whether that prefix has crossed its day boundary, firing the
//! [`UploadTrigger`] with the completed file if so. A pass that produced nothing is
//! followed by a short idle sleep.
//!
//! The stop signal is checked before every port, so shutdown waits for at most
//! one port's read.

use crate::acquisition::PortSession;
use crate::clock::Clock;
use crate::error::LoggerError;
use crate::isolation::FailureIsolator;
use crate::storage::{append_record, EventLog, RotationPolicy};
use crate::upload::UploadTrigger;
use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cooperative stop flag shared with the signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scheduler to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened during one or more passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Enabled sessions polled.
    pub polled: usize,
    /// Records appended to data files.
    pub records: usize,
    /// Port cycles that failed.
    pub failures: usize,
    /// Completed daily files handed to the upload trigger.
    pub rollovers: usize,
}

impl AddAssign for PassReport {
    fn add_assign(&mut self, rhs: Self) {
        self.polled += rhs.polled;
        self.records += rhs.records;
        self.failures += rhs.failures;
        self.rollovers += rhs.rollovers;
    }
}

/// Drives every port session in a single cooperative loop.
pub struct Scheduler {
    sessions: Vec<PortSession>,
    rotation: RotationPolicy,
    isolator: FailureIsolator,
    uploads: UploadTrigger,
    log: Arc<EventLog>,
    clock: Arc<dyn Clock>,
    idle_sleep: Duration,
    totals: PassReport,
}

impl Scheduler {
    /// Build a scheduler over already-open sessions writing into `data_dir`.
    ///
    /// Day boundaries start from the current day of `clock`.
    pub fn new(
        sessions: Vec<PortSession>,
        data_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        log: Arc<EventLog>,
        uploads: UploadTrigger,
        idle_sleep: Duration,
    ) -> Self {
        let rotation = RotationPolicy::new(
            data_dir,
            sessions.iter().map(PortSession::prefix),
            clock.now(),
        );
        Self {
            sessions,
            rotation,
            isolator: FailureIsolator::new(Arc::clone(&log)),
            uploads,
            log,
            clock,
            idle_sleep,
            totals: PassReport::default(),
        }
    }

    /// Sessions in service order.
    pub fn sessions(&self) -> &[PortSession] {
        &self.sessions
    }

    /// Rotation bookkeeping.
    pub fn rotation(&self) -> &RotationPolicy {
        &self.rotation
    }

    /// Totals across all passes so far.
    pub fn totals(&self) -> PassReport {
        self.totals
    }

    /// Run one pass over all sessions.
    pub fn run_pass(&mut self, stop: &StopSignal) -> PassReport {
        let mut report = PassReport::default();

        for session in self.sessions.iter_mut() {
            if stop.is_stopped() {
                break;
            }

            if session.is_enabled() {
                report.polled += 1;
                let rotation = &self.rotation;
                let clock = self.clock.as_ref();
                let outcome = self.isolator.run(session, |session| {
                    let record = match session.poll_once(clock) {
                        Ok(Some(record)) => record,
                        Ok(None) => return Ok(false),
                        Err(source) => {
                            return Err(LoggerError::Port {
                                prefix: session.prefix().to_string(),
                                source,
                            })
                        }
                    };
                    let path = rotation.path_for(record.prefix(), &record.timestamp());
                    append_record(&path, &record)?;
                    debug!(prefix = %record.prefix(), payload = %record.payload(), "record written");
                    Ok(true)
                });
                match outcome {
                    Some(true) => report.records += 1,
                    Some(false) => {}
                    None => report.failures += 1,
                }
            }

            let now = self.clock.now();
            if let Some(completed) = self.rotation.roll_over(session.prefix(), &now) {
                report.rollovers += 1;
                self.uploads.on_rollover(session.prefix(), &completed);
            }
        }

        self.totals += report;
        report
    }

    /// Run passes until `stop` fires.
    pub fn run(&mut self, stop: &StopSignal) -> PassReport {
        info!(
            ports = self.sessions.len(),
            idle_sleep_ms = self.idle_sleep.as_millis() as u64,
            "acquisition loop started"
        );
        while !stop.is_stopped() {
            let pass = self.run_pass(stop);
            if pass.records == 0 && !stop.is_stopped() {
                std::thread::sleep(self.idle_sleep);
            }
        }
        self.totals
    }

    /// Close every port and report totals.
    pub fn shutdown(self) -> PassReport {
        self.log.system("Stopping logger");
        let disabled = self.sessions.iter().filter(|s| !s.is_enabled()).count();
        for session in self.sessions {
            self.log
                .port_info(session.prefix(), format!("Closing port {}", session.config().address));
            drop(session);
        }
        self.log.system(format!(
            "Logger stopped: {} records, {} failures, {} rollovers, {} ports disabled",
            self.totals.records, self.totals.failures, self.totals.rollovers, disabled
        ));
        self.totals
    }
}
