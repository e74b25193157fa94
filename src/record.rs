//! Completed records and their on-disk line format.

use chrono::{DateTime, Utc};

/// Timestamp layout used in data files and the daily LOG.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S GMT";

/// Render `instant` as `YYYY/MM/DD HH:MM:SS GMT`.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// One terminated line read from an instrument, stamped on completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    timestamp: DateTime<Utc>,
    prefix: String,
    payload: String,
}

impl Record {
    /// Build a record. `payload` must already have its terminator stripped.
    pub fn new(timestamp: DateTime<Utc>, prefix: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            timestamp,
            prefix: prefix.into(),
            payload: payload.into(),
        }
    }

    /// Completion instant.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Instrument prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Decoded line without terminator.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// `timestamp<TAB>payload<NEWLINE>` as appended to the data file.
    pub fn to_data_line(&self) -> String {
        format!("{}\t{}\n", format_timestamp(&self.timestamp), self.payload)
    }
}
