//! Per-port fault boundary.
//!
//! [`FailureIsolator::run`] executes one port's work for one cycle. Whatever goes
//! wrong inside (a read error, a full disk, a panic) is turned into exactly one
//! event in the daily LOG and the scheduler moves on to the next port. A device that
//! is permanently gone gets its session disabled. Nothing is retried here; the next
//! pass is the retry.

use crate::acquisition::PortSession;
use crate::error::{AppResult, LoggerError, PortError};
use crate::storage::EventLog;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Catches and logs one port's failures.
#[derive(Debug)]
pub struct FailureIsolator {
    log: Arc<EventLog>,
    failures: usize,
}

impl FailureIsolator {
    /// Report caught faults to `log`.
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log, failures: 0 }
    }

    /// Faults caught so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Run `work` against `session`. Returns `None` if it failed or panicked.
    pub fn run<T, F>(&mut self, session: &mut PortSession, work: F) -> Option<T>
    where
        F: FnOnce(&mut PortSession) -> AppResult<T>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(session)))
            .unwrap_or_else(|payload| {
                Err(LoggerError::Port {
                    prefix: session.prefix().to_string(),
                    source: PortError::Panicked(panic_message(payload.as_ref())),
                })
            });

        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                self.report(session, &err);
                None
            }
        }
    }

    fn report(&mut self, session: &mut PortSession, err: &LoggerError) {
        self.failures += 1;
        let permanent = matches!(err, LoggerError::Port { source, .. } if source.is_permanent());
        let consequence = if permanent {
            session.disable();
            "port disabled"
        } else {
            "no data recorded"
        };
        let address = session.config().address.clone();
        self.log.port_error(
            session.prefix(),
            format!(
                "Unexpected error with port {}: {}; {}",
                address, err, consequence
            ),
        );
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
