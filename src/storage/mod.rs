//! File-side of the logger: daily rotation, scoped appends and the shared LOG.

pub mod event_log;
pub mod rotation;
pub mod writer;

pub use event_log::{EventLog, LogEvent, Severity, SYSTEM_SOURCE};
pub use rotation::{data_file_name, end_of_day, log_file_name, RotationPolicy, RotationState};
pub use writer::{append_line, append_record, ensure_dir};
