//! Daily file rotation.
//!
//! Data files are named `<prefix>_<YYYYMMDD>.txt` after the UTC date of the record,
//! so the path for any record is a pure function of its timestamp. Separately,
//! each prefix carries a [`RotationState`] whose `day_boundary` marks the last
//! instant of the UTC day currently being written; once the clock passes it the
//! day's file is complete and handed back for upload.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Data file name for `prefix` on the UTC date of `timestamp`.
pub fn data_file_name(prefix: &str, timestamp: &DateTime<Utc>) -> String {
    format!("{}_{}.txt", prefix, timestamp.format("%Y%m%d"))
}

/// Daily LOG file name for the UTC date of `timestamp`.
pub fn log_file_name(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d.LOG").to_string()
}

/// Last representable instant of the UTC day containing `timestamp`.
pub fn end_of_day(timestamp: &DateTime<Utc>) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&timestamp.date_naive().and_time(NaiveTime::MIN));
    midnight + Duration::days(1) - Duration::nanoseconds(1)
}

/// Rotation bookkeeping for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationState {
    /// File receiving the current day's records.
    pub current_file: PathBuf,
    /// End of the current UTC day, inclusive.
    pub day_boundary: DateTime<Utc>,
}

/// Computes data file paths and tracks per-prefix day boundaries.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    data_dir: PathBuf,
    states: HashMap<String, RotationState>,
}

impl RotationPolicy {
    /// Start tracking `prefixes`, with boundaries taken from the day containing `now`.
    pub fn new<'a>(
        data_dir: impl Into<PathBuf>,
        prefixes: impl IntoIterator<Item = &'a str>,
        now: DateTime<Utc>,
    ) -> Self {
        let data_dir = data_dir.into();
        let states = prefixes
            .into_iter()
            .map(|prefix| {
                let state = RotationState {
                    current_file: data_dir.join(data_file_name(prefix, &now)),
                    day_boundary: end_of_day(&now),
                };
                (prefix.to_string(), state)
            })
            .collect();
        Self { data_dir, states }
    }

    /// Directory holding data and LOG files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Target file for a record from `prefix` stamped `timestamp`.
    pub fn path_for(&self, prefix: &str, timestamp: &DateTime<Utc>) -> PathBuf {
        self.data_dir.join(data_file_name(prefix, timestamp))
    }

    /// Daily LOG file for `timestamp`.
    pub fn log_path_for(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.data_dir.join(log_file_name(timestamp))
    }

    /// Bookkeeping for `prefix`, if tracked.
    pub fn state(&self, prefix: &str) -> Option<&RotationState> {
        self.states.get(prefix)
    }

    /// Whether `now` is past the stored boundary for `prefix`.
    pub fn is_rollover_due(&self, prefix: &str, now: &DateTime<Utc>) -> bool {
        self.states
            .get(prefix)
            .is_some_and(|state| *now > state.day_boundary)
    }

    /// If due, advance `prefix` to the day containing `now` and return the
    /// file that was just completed.
    pub fn roll_over(&mut self, prefix: &str, now: &DateTime<Utc>) -> Option<PathBuf> {
        if !self.is_rollover_due(prefix, now) {
            return None;
        }
        let next_file = self.path_for(prefix, now);
        let state = self.states.get_mut(prefix)?;
        let completed = std::mem::replace(&mut state.current_file, next_file);
        state.day_boundary = end_of_day(now);
        debug!(
            prefix,
            completed = %completed.display(),
            next_boundary = %state.day_boundary,
            "rolled over"
        );
        Some(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn file_names() {
        let ts = at(2024, 1, 5, 10, 0, 0);
        assert_eq!(data_file_name("tempA", &ts), "tempA_20240105.txt");
        assert_eq!(log_file_name(&ts), "20240105.LOG");
    }

    #[test]
    fn same_day_same_path_next_day_different() {
        let policy = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 0, 0, 0));
        let morning = policy.path_for("tempA", &at(2024, 1, 5, 0, 0, 0));
        let night = policy.path_for("tempA", &at(2024, 1, 5, 23, 59, 59));
        let tomorrow = policy.path_for("tempA", &at(2024, 1, 6, 0, 0, 0));
        assert_eq!(morning, night);
        assert_ne!(night, tomorrow);
        assert_eq!(tomorrow, PathBuf::from("/data/tempA_20240106.txt"));
    }

    #[test]
    fn mid_day_start_uses_current_day_boundary() {
        let policy = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 15, 30, 0));
        let state = policy.state("tempA").unwrap();
        assert_eq!(state.current_file, PathBuf::from("/data/tempA_20240105.txt"));
        assert_eq!(state.day_boundary, end_of_day(&at(2024, 1, 5, 0, 0, 0)));
        assert!(!policy.is_rollover_due("tempA", &at(2024, 1, 5, 23, 59, 59)));
        assert!(policy.is_rollover_due("tempA", &at(2024, 1, 6, 0, 0, 0)));
    }

    #[test]
    fn roll_over_returns_completed_file_once() {
        let mut policy = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 9, 0, 0));
        let after_midnight = at(2024, 1, 6, 0, 0, 1);

        let completed = policy.roll_over("tempA", &after_midnight).unwrap();
        assert_eq!(completed, PathBuf::from("/data/tempA_20240105.txt"));
        assert_eq!(
            policy.state("tempA").unwrap().current_file,
            PathBuf::from("/data/tempA_20240106.txt")
        );
        assert!(policy.roll_over("tempA", &at(2024, 1, 6, 12, 0, 0)).is_none());
    }

    #[test]
    fn roll_over_after_long_gap_lands_on_current_day() {
        let mut policy = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 9, 0, 0));
        let later = at(2024, 1, 9, 8, 0, 0);
        assert_eq!(
            policy.roll_over("tempA", &later).unwrap(),
            PathBuf::from("/data/tempA_20240105.txt")
        );
        assert_eq!(
            policy.state("tempA").unwrap().day_boundary,
            end_of_day(&later)
        );
    }

    #[test]
    fn unknown_prefix_never_rolls() {
        let mut policy = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 9, 0, 0));
        assert!(policy.roll_over("ghost", &at(2024, 2, 1, 0, 0, 0)).is_none());
    }

    #[test]
    fn restart_resumes_same_file() {
        let first = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 8, 0, 0));
        let restarted = RotationPolicy::new("/data", ["tempA"], at(2024, 1, 5, 17, 0, 0));
        assert_eq!(first.state("tempA"), restarted.state("tempA"));
    }
}
