//! Logger configuration using Figment
//!
//! Configuration is loaded from either:
//! 1. A TOML file merged with environment variables prefixed `MULTISERIAL_`
//! 2. A plain `settings.txt` in the legacy line format (see [`legacy`])
//!
//! The format is selected by file extension. Whatever the source, the result is a
//! validated [`LoggerConfig`] holding one ordered [`PortConfig`] per instrument.
//!
//! # Example
//! ```no_run
//! use multiserial_logger::config::LoggerConfig;
//!
//! let config = LoggerConfig::load("config/logger.toml")?;
//! println!("Logging {} ports into {}", config.ports.len(), config.data_dir.display());
//! # Ok::<(), multiserial_logger::error::LoggerError>(())
//! ```

pub mod legacy;

use crate::error::{AppResult, LoggerError};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level logger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Directory receiving data files and the daily LOG
    pub data_dir: PathBuf,
    /// Diagnostic log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Diagnostic output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Sleep between passes in which no port had data, in milliseconds
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,
    /// Per-byte read timeout once data is known to be present, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Offsite copy settings
    #[serde(default)]
    pub upload: UploadConfig,
    /// Instruments, serviced in this order every pass
    pub ports: Vec<PortConfig>,
}

/// One serial instrument
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortConfig {
    /// Unique instrument id, used in data file names
    pub prefix: String,
    /// Device address (e.g. `/dev/ttyUSB0`, `COM3`)
    pub address: String,
    /// Line speed
    pub baud_rate: u32,
    /// Parity bit
    #[serde(default)]
    pub parity: Parity,
    /// Data bits per character (5-8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// End-of-record marker
    #[serde(default)]
    pub terminator: Terminator,
}

/// Offsite copy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadConfig {
    /// External command and arguments. `{path}` and `{object}` are substituted.
    /// Empty disables uploads.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Serial parity setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Parity {
    /// No parity bit
    #[default]
    #[serde(rename = "N")]
    None,
    /// Even parity
    #[serde(rename = "E")]
    Even,
    /// Odd parity
    #[serde(rename = "O")]
    Odd,
}

impl FromStr for Parity {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N" | "NONE" => Ok(Parity::None),
            "E" | "EVEN" => Ok(Parity::Even),
            "O" | "ODD" => Ok(Parity::Odd),
            other => Err(LoggerError::Config(format!(
                "Unsupported parity '{}'. Must be one of: N, E, O",
                other
            ))),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Parity::None => "N",
            Parity::Even => "E",
            Parity::Odd => "O",
        };
        write!(f, "{}", code)
    }
}

/// End-of-record marker for one port.
///
/// Configured by short code: `r` is `\r`, `nr` is `\n\r`, anything else is `\n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Terminator {
    /// `\r`
    Cr,
    /// `\n\r`
    LfCr,
    /// `\n`
    #[default]
    Lf,
}

impl Terminator {
    /// Parse a configuration code. Unknown codes fall back to `\n`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "r" => Terminator::Cr,
            "nr" => Terminator::LfCr,
            _ => Terminator::Lf,
        }
    }

    /// Configuration code for this terminator.
    pub fn code(&self) -> &'static str {
        match self {
            Terminator::Cr => "r",
            Terminator::LfCr => "nr",
            Terminator::Lf => "n",
        }
    }

    /// Byte sequence that ends a record.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Terminator::Cr => b"\r",
            Terminator::LfCr => b"\n\r",
            Terminator::Lf => b"\n",
        }
    }
}

impl From<String> for Terminator {
    fn from(code: String) -> Self {
        Terminator::from_code(&code)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_idle_sleep_ms() -> u64 {
    10
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl LoggerConfig {
    /// Load and validate configuration, choosing the format by extension.
    ///
    /// `.toml` files go through Figment (with `MULTISERIAL_` environment overrides);
    /// anything else is read as a legacy `settings.txt`.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::load_toml(path)?
        } else {
            legacy::load(path)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and environment variables
    ///
    /// Environment variables override the file with prefix MULTISERIAL_ and `__`
    /// as the nesting separator.
    /// Example: MULTISERIAL_LOG_LEVEL=debug
    pub fn load_toml<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoggerError::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("MULTISERIAL_").split("__"))
            .extract()
            .map_err(LoggerError::from)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(LoggerError::Config(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(LoggerError::Config(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.log_format,
                valid_formats.join(", ")
            )));
        }

        if !(1..=1000).contains(&self.idle_sleep_ms) {
            return Err(LoggerError::Config(format!(
                "Invalid idle_sleep_ms {}. Must be 1-1000",
                self.idle_sleep_ms
            )));
        }

        if self.read_timeout_ms == 0 {
            return Err(LoggerError::Config(
                "read_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.ports.is_empty() {
            return Err(LoggerError::Config("No ports configured".to_string()));
        }

        let mut prefixes = HashSet::new();
        for port in &self.ports {
            port.validate()?;
            if !prefixes.insert(port.prefix.as_str()) {
                return Err(LoggerError::Config(format!(
                    "Duplicate port prefix: {}",
                    port.prefix
                )));
            }
        }

        Ok(())
    }

    /// Human-readable configuration summary, one line per field, written to the
    /// daily LOG when logging starts.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("prefixes: {}", self.joined(|p| p.prefix.clone())),
            format!("ports: {}", self.joined(|p| p.address.clone())),
            format!("bauds: {}", self.joined(|p| p.baud_rate.to_string())),
            format!("parities: {}", self.joined(|p| p.parity.to_string())),
            format!("data bits: {}", self.joined(|p| p.data_bits.to_string())),
            format!("terminators: {}", self.joined(|p| p.terminator.code().to_string())),
            format!("data dir: {}", self.data_dir.display()),
        ]
    }

    fn joined<F: Fn(&PortConfig) -> String>(&self, field: F) -> String {
        self.ports.iter().map(field).collect::<Vec<_>>().join(",")
    }
}

impl PortConfig {
    fn validate(&self) -> AppResult<()> {
        if self.prefix.trim().is_empty() {
            return Err(LoggerError::Config("Port prefix must not be empty".to_string()));
        }
        // The prefix becomes part of a file name inside data_dir.
        if self.prefix.contains(['/', '\\', '\0']) || self.prefix.contains("..") {
            return Err(LoggerError::Config(format!(
                "Port prefix '{}' must not contain path separators or '..'",
                self.prefix
            )));
        }
        if self.address.trim().is_empty() {
            return Err(LoggerError::Config(format!(
                "Port '{}' has an empty address",
                self.prefix
            )));
        }
        if self.baud_rate == 0 {
            return Err(LoggerError::Config(format!(
                "Port '{}' has baud rate 0",
                self.prefix
            )));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(LoggerError::Config(format!(
                "Port '{}' has invalid data_bits {}. Must be 5-8",
                self.prefix, self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(LoggerError::Config(format!(
                "Port '{}' has invalid stop_bits {}. Must be 1 or 2",
                self.prefix, self.stop_bits
            )));
        }
        Ok(())
    }
}
