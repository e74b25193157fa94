//! Custom error types for the logger.
//!
//! This module defines the primary error type, `LoggerError`, and the per-port
//! `PortError`. Using the `thiserror` crate, it provides a centralized and consistent
//! way to handle everything from configuration problems to a serial device vanishing
//! mid-acquisition.
//!
//! ## Error Hierarchy
//!
//! Errors fall into two broad categories:
//!
//! 1. **Fatal, pre-loop** - `Config`, `Figment`, `PortOpen`
//!    - Occur before the scheduler starts
//!    - The process exits nonzero without touching (further) ports
//!
//! 2. **Recoverable, isolated** - `Port`, `FileWrite`, `Upload`
//!    - Occur inside the acquisition loop
//!    - Caught at the per-port isolation boundary and written to the daily LOG
//!    - Never terminate the scheduler
//!
//! `PortError::is_permanent` separates a transient read failure (the port is retried
//! on the next pass) from a device that is gone for good (the port is disabled).

use crate::acquisition::FrameOverflow;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the logger error type.
pub type AppResult<T> = std::result::Result<T, LoggerError>;

/// Primary error type for the logger.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Malformed or semantically invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be extracted from its sources.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A configured port could not be opened.
    #[error("Failed to open port '{address}' for '{prefix}': {source}")]
    PortOpen {
        /// Instrument prefix.
        prefix: String,
        /// Device address (e.g. `/dev/ttyUSB0`).
        address: String,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// A read on an open port failed.
    #[error("Port '{prefix}': {source}")]
    Port {
        /// Instrument prefix.
        prefix: String,
        /// Underlying port failure.
        #[source]
        source: PortError,
    },

    /// Appending to a data or log file failed.
    #[error("Failed to write '{}': {source}", path.display())]
    FileWrite {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The uploader collaborator reported a fault.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Serial support was not compiled in.
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<figment::Error> for LoggerError {
    fn from(value: figment::Error) -> Self {
        LoggerError::Figment(Box::new(value))
    }
}

impl LoggerError {
    /// Whether the scheduler may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LoggerError::Port { .. } | LoggerError::FileWrite { .. } | LoggerError::Upload(_)
        )
    }
}

/// Failure of a single port during one scheduler cycle.
#[derive(Error, Debug)]
pub enum PortError {
    /// Transient read failure; the port is retried next pass.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// No terminator arrived within the frame limit; the partial frame was dropped.
    #[error("{0}")]
    FrameTooLong(#[from] FrameOverflow),

    /// Data was reported available but the channel returned end-of-stream.
    #[error("channel signalled disconnection")]
    Disconnected,

    /// The device is permanently gone; the port is disabled.
    #[error("device gone: {0}")]
    Gone(#[source] io::Error),

    /// The per-port work panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl PortError {
    /// Classify an I/O failure from the serial link.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => PortError::Gone(err),
            _ => PortError::Read(err),
        }
    }

    /// Whether the port should be disabled for the rest of the run.
    pub fn is_permanent(&self) -> bool {
        matches!(self, PortError::Gone(_))
    }
}
