//! # Multi-serial line logger
//!
//! Reads newline-delimited text from several serial instruments at once, stamps
//! each completed line with a UTC time, and appends it to a per-instrument daily
//! file named `<prefix>_<YYYYMMDD>.txt`. When an instrument's UTC day ends, the
//! finished file is handed to an external uploader.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: The serial side. [`acquisition::FrameReader`] splits a byte
//!   stream into records, [`acquisition::PortSession`] owns one open port, and
//!   [`acquisition::SerialLink`] is the seam to real or mock hardware.
//! - **`storage`**: Daily rotation ([`storage::RotationPolicy`]), scoped appends and
//!   the shared daily event LOG ([`storage::EventLog`]).
//! - **`scheduler`**: The single cooperative loop servicing every port in order.
//! - **`isolation`**: Per-port fault boundary that keeps one bad instrument from
//!   stopping the others.
//! - **`upload`**: The [`upload::Uploader`] seam and the rollover trigger.
//! - **`app`**: Startup (data directory, LOG summary, port opening) and the blocking run.
//! - **`config`**: TOML/environment configuration via Figment, plus the legacy
//!   `settings.txt` format.
//! - **`clock`**, **`record`**, **`error`**, **`tracing_setup`**: Supporting types.

pub mod acquisition;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod isolation;
pub mod record;
pub mod scheduler;
pub mod storage;
pub mod tracing_setup;
pub mod upload;
