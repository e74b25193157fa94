//! One open instrument connection.

use super::frame::FrameReader;
use super::link::DynLink;
use crate::clock::Clock;
use crate::config::PortConfig;
use crate::error::PortError;
use crate::record::Record;
use std::fmt;
use tracing::{trace, warn};

/// Whether the scheduler still services a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// Polled every pass.
    Enabled,
    /// Device gone; skipped for the rest of the run.
    Disabled,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Enabled => write!(f, "enabled"),
            PortStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// Owns one open link, its frame reader and its configuration.
pub struct PortSession {
    config: PortConfig,
    link: DynLink,
    reader: FrameReader,
    status: PortStatus,
}

impl fmt::Debug for PortSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSession")
            .field("prefix", &self.config.prefix)
            .field("address", &self.config.address)
            .field("status", &self.status)
            .field("pending", &self.reader.pending())
            .finish()
    }
}

impl PortSession {
    /// Bind an already-open link to its configuration.
    pub fn new(config: PortConfig, link: DynLink) -> Self {
        let reader = FrameReader::new(config.terminator);
        Self {
            config,
            link,
            reader,
            status: PortStatus::Enabled,
        }
    }

    /// Instrument prefix.
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Configuration this session was opened with.
    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Current status.
    pub fn status(&self) -> PortStatus {
        self.status
    }

    /// Whether the scheduler should poll this session.
    pub fn is_enabled(&self) -> bool {
        self.status == PortStatus::Enabled
    }

    /// Exclude this session from future passes.
    pub fn disable(&mut self) {
        if self.status == PortStatus::Enabled {
            warn!(prefix = %self.config.prefix, address = %self.config.address, "disabling port");
        }
        self.status = PortStatus::Disabled;
        self.reader.reset();
    }

    /// Read at most one completed record without waiting for data.
    ///
    /// Only the bytes reported available on entry are read, so one call is bounded
    /// even on a port that never stops sending. Returns `Ok(None)` when nothing is
    /// waiting, or when those bytes run out before the terminator; the partial frame
    /// is kept for the next call.
    pub fn poll_once(&mut self, clock: &dyn Clock) -> Result<Option<Record>, PortError> {
        let available = self.available()?;
        for _ in 0..available {
            let byte = match self.link.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return Err(self.fault(PortError::Disconnected)),
                Err(e) => return Err(self.fault(PortError::from_io(e))),
            };
            match self.reader.feed(byte) {
                Ok(Some(line)) => {
                    trace!(prefix = %self.config.prefix, bytes = line.len(), "frame complete");
                    return Ok(Some(Record::new(clock.now(), &self.config.prefix, line)));
                }
                Ok(None) => {}
                Err(overflow) => return Err(PortError::FrameTooLong(overflow)),
            }
        }
        Ok(None)
    }

    fn available(&mut self) -> Result<usize, PortError> {
        self.link
            .bytes_available()
            .map_err(|e| self.fault(PortError::from_io(e)))
    }

    fn fault(&mut self, err: PortError) -> PortError {
        self.reader.reset();
        err
    }
}
