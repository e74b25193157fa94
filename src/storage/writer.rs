//! Scoped appends.
//!
//! Every write opens the file for append, writes once, and closes it again. No
//! handle outlives the call, so completed lines survive an abrupt exit and the
//! files can be moved or deleted underneath a running logger.

use crate::error::{AppResult, LoggerError};
use crate::record::Record;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Append `line` to `path`, creating the file if needed.
pub fn append_line(path: &Path, line: &str) -> AppResult<()> {
    let write_error = |source| LoggerError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_error)?;
    file.write_all(line.as_bytes()).map_err(write_error)?;
    Ok(())
}

/// Append `record` as one data line to `path`.
pub fn append_record(path: &Path, record: &Record) -> AppResult<()> {
    append_line(path, &record.to_data_line())
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| LoggerError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn appends_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tempA_20240105.txt");
        let ts = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();

        append_record(&path, &Record::new(ts, "tempA", "1")).unwrap();
        append_record(&path, &Record::new(ts, "tempA", "2")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "2024/01/05 10:00:00 GMT\t1\n2024/01/05 10:00:00 GMT\t2\n"
        );
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.txt");
        let err = append_line(&path, "x\n").unwrap_err();
        assert!(matches!(err, LoggerError::FileWrite { .. }));
        assert!(err.is_recoverable());
    }
}
