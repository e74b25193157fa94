//! Diagnostic tracing for the logger process.
//!
//! This is operator-facing output on stderr, separate from the daily LOG file that
//! [`EventLog`](crate::storage::EventLog) keeps next to the data. `RUST_LOG`
//! overrides the configured level when set.
//!
//! # Example
//! ```no_run
//! use multiserial_logger::{config::LoggerConfig, tracing_setup};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoggerConfig::load("config/logger.toml")?;
//! tracing_setup::init_from_config(&config)?;
//! tracing::info!("logger starting");
//! # Ok(())
//! # }
//! ```

use crate::config::LoggerConfig;
use crate::error::{AppResult, LoggerError};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line with colors, for a terminal
    Pretty,
    /// One line per event without colors, for journald and friends
    Compact,
    /// JSON lines for log shippers
    Json,
}

impl FromStr for OutputFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            other => Err(LoggerError::Config(format!(
                "Invalid log format '{}'. Must be one of: pretty, compact, json",
                other
            ))),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Minimum level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to include thread names
    pub with_thread_names: bool,
    /// Whether to enable ANSI colors (Pretty only)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            with_file_and_line: false,
            with_thread_names: true,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Level and format taken from the logger configuration.
    pub fn from_logger_config(config: &LoggerConfig) -> AppResult<Self> {
        Ok(Self {
            level: parse_log_level(&config.log_level)?,
            format: config.log_format.parse()?,
            ..Default::default()
        })
    }

    /// Defaults at `level`.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the logger configuration.
pub fn init_from_config(config: &LoggerConfig) -> AppResult<()> {
    init(TracingConfig::from_logger_config(config)?)
}

/// Install the global subscriber.
///
/// Idempotent: a second call, or one after a test harness installed its own
/// subscriber, returns `Ok(())`.
pub fn init(config: TracingConfig) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let layer = match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(config.with_ansi)
            .with_writer(std::io::stderr)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .try_init()
        .or_else(|e| {
            if e.to_string().contains("a global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(LoggerError::Config(format!("Failed to initialize tracing: {}", e)))
            }
        })
}

/// Parse a level name, case-insensitively.
pub fn parse_log_level(level: &str) -> AppResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LoggerError::Config(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}
