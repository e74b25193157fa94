//! Process startup and the blocking run.
//!
//! [`start`] performs every fatal step up front: it creates the data directory,
//! writes the startup summary to the daily LOG and opens every configured port.
//! Any failure there aborts the whole start. No partial service. Once it returns,
//! [`run_until_stopped`] drives the scheduler and closes all ports on the way out.

use crate::acquisition::{DynLink, PortSession};
use crate::clock::Clock;
use crate::config::{LoggerConfig, PortConfig};
use crate::error::AppResult;
use crate::scheduler::{PassReport, Scheduler, StopSignal};
use crate::storage::{ensure_dir, EventLog};
use crate::upload::{UploadTrigger, Uploader};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Open all ports and build a scheduler ready to run.
///
/// `opener` connects one port; production passes
/// [`open_port`](crate::acquisition::open_port).
pub fn start<F>(
    config: &LoggerConfig,
    clock: Arc<dyn Clock>,
    uploader: Box<dyn Uploader>,
    opener: F,
) -> AppResult<Scheduler>
where
    F: FnMut(&PortConfig, Duration) -> AppResult<DynLink>,
{
    ensure_dir(&config.data_dir)?;

    let log = Arc::new(EventLog::new(&config.data_dir, Arc::clone(&clock)));
    log.system("Logging starts");
    for line in config.summary_lines() {
        log.system(line);
    }

    let sessions = open_sessions(config, &log, opener)?;

    if !uploader.is_enabled() {
        log.system("No upload command configured, completed files stay local");
    }
    let uploads = UploadTrigger::new(uploader, Arc::clone(&log));

    info!(
        ports = sessions.len(),
        data_dir = %config.data_dir.display(),
        "all ports open"
    );

    Ok(Scheduler::new(
        sessions,
        &config.data_dir,
        clock,
        log,
        uploads,
        Duration::from_millis(config.idle_sleep_ms),
    ))
}

/// Open every configured port in order. The first failure is returned and any
/// ports already opened are closed again.
pub fn open_sessions<F>(
    config: &LoggerConfig,
    log: &EventLog,
    mut opener: F,
) -> AppResult<Vec<PortSession>>
where
    F: FnMut(&PortConfig, Duration) -> AppResult<DynLink>,
{
    let read_timeout = Duration::from_millis(config.read_timeout_ms);
    let mut sessions = Vec::with_capacity(config.ports.len());

    for port in &config.ports {
        log.port_info(&port.prefix, format!("Opening port {}", port.address));
        match opener(port, read_timeout) {
            Ok(link) => {
                log.port_info(&port.prefix, format!("Port {} flushed", port.address));
                sessions.push(PortSession::new(port.clone(), link));
            }
            Err(e) => {
                log.port_error(
                    &port.prefix,
                    format!("Error opening port {}: {}", port.address, e),
                );
                return Err(e);
            }
        }
    }

    Ok(sessions)
}

/// Run until `stop` fires, then close every port.
pub fn run_until_stopped(mut scheduler: Scheduler, stop: &StopSignal) -> PassReport {
    scheduler.run(stop);
    scheduler.shutdown()
}
