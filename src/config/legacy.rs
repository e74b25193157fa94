//! Reader for the plain `settings.txt` format.
//!
//! ```text
//! 2
//! tempA,/dev/ttyUSB0,9600,N,8,n
//! windB,/dev/ttyUSB1,4800,E,7,r
//! /home/logger/data/
//! ```
//!
//! Line 1 is the port count, followed by exactly that many
//! `prefix,address,baud,parity,databits,eol` lines and then the data directory.

use super::{LoggerConfig, Parity, PortConfig, Terminator, UploadConfig};
use crate::error::{AppResult, LoggerError};
use std::path::{Path, PathBuf};

/// Read and parse a legacy settings file.
pub fn load(path: &Path) -> AppResult<LoggerConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        LoggerError::Config(format!(
            "Configuration file '{}' could not be read: {}",
            path.display(),
            e
        ))
    })?;
    parse(&text)
}

/// Parse legacy settings text.
pub fn parse(text: &str) -> AppResult<LoggerConfig> {
    let mut lines = text.lines();

    let count_line = lines.next().unwrap_or_default();
    let nports: usize = count_line.trim().parse().map_err(|_| {
        LoggerError::Config(format!("Invalid number of ports '{}'", count_line.trim()))
    })?;

    // The data directory line follows the port lines.
    let port_lines = lines.clone().count().saturating_sub(1);
    if nports > port_lines {
        return Err(LoggerError::Config(format!(
            "Expected {} port lines followed by the data directory, found {} lines",
            nports,
            port_lines + 1
        )));
    }

    let mut ports = Vec::with_capacity(nports);
    for (index, line) in lines.by_ref().take(nports).enumerate() {
        ports.push(parse_port_line(line).map_err(|reason| {
            LoggerError::Config(format!("Error parsing settings line {}: {}", index + 1, reason))
        })?);
    }

    let data_dir = lines
        .next()
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .ok_or_else(|| LoggerError::Config("Missing data directory line".to_string()))?;

    Ok(LoggerConfig {
        data_dir: PathBuf::from(data_dir),
        log_level: super::default_log_level(),
        log_format: super::default_log_format(),
        idle_sleep_ms: super::default_idle_sleep_ms(),
        read_timeout_ms: super::default_read_timeout_ms(),
        upload: UploadConfig::default(),
        ports,
    })
}

fn parse_port_line(line: &str) -> Result<PortConfig, String> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
    if fields.len() < 6 {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    }

    let baud_rate = fields[2]
        .trim()
        .parse()
        .map_err(|_| format!("invalid baud rate '{}'", fields[2]))?;
    let parity: Parity = fields[3].parse().map_err(|e: LoggerError| e.to_string())?;
    let data_bits = fields[4]
        .trim()
        .parse()
        .map_err(|_| format!("invalid data bits '{}'", fields[4]))?;

    Ok(PortConfig {
        prefix: fields[0].trim().to_string(),
        address: fields[1].trim().to_string(),
        baud_rate,
        parity,
        data_bits,
        stop_bits: super::default_stop_bits(),
        terminator: Terminator::from_code(fields[5]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_ports() {
        let cfg = parse(
            "2\ntempA,/dev/ttyUSB0,9600,N,8,n\nwindB,/dev/ttyUSB1,4800,E,7,r\n/home/logger/data/\n",
        )
        .unwrap();
        assert_eq!(cfg.ports.len(), 2);
        assert_eq!(cfg.ports[0].prefix, "tempA");
        assert_eq!(cfg.ports[0].terminator, Terminator::Lf);
        assert_eq!(cfg.ports[1].baud_rate, 4800);
        assert_eq!(cfg.ports[1].parity, Parity::Even);
        assert_eq!(cfg.ports[1].data_bits, 7);
        assert_eq!(cfg.ports[1].terminator, Terminator::Cr);
        assert_eq!(cfg.data_dir, PathBuf::from("/home/logger/data/"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_port_count() {
        let err = parse("two\n").unwrap_err();
        assert!(err.to_string().contains("Invalid number of ports"));
    }

    #[test]
    fn rejects_short_line() {
        let err = parse("1\ntempA,/dev/ttyUSB0,9600\n/data\n").unwrap_err();
        assert!(err.to_string().contains("settings line 1"));
    }

    #[test]
    fn rejects_non_numeric_baud() {
        let err = parse("1\ntempA,/dev/ttyUSB0,fast,N,8,n\n/data\n").unwrap_err();
        assert!(err.to_string().contains("invalid baud rate"));
    }

    #[test]
    fn rejects_absurd_port_count() {
        let err = parse("18446744073709551615\na,/dev/a,9600,N,8,n\n/data\n").unwrap_err();
        assert!(err.to_string().contains("Expected 18446744073709551615 port lines"));

        let err = parse("1000000000000\na,/dev/a,9600,N,8,n\n/data\n").unwrap_err();
        assert!(matches!(err, LoggerError::Config(_)));
    }

    #[test]
    fn rejects_missing_port_lines() {
        let err = parse("3\ntempA,/dev/ttyUSB0,9600,N,8,n\n").unwrap_err();
        assert!(err.to_string().contains("Expected 3 port lines"));
    }

    #[test]
    fn rejects_missing_data_dir() {
        assert!(parse("1\ntempA,/dev/ttyUSB0,9600,N,8,nr\n").is_err());
    }
}
