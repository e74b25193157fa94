//! Offsite copy of completed daily files.
//!
//! The transfer itself belongs to an external [`Uploader`]. [`UploadTrigger`] calls
//! it once per completed file, records the outcome in the daily LOG, and never
//! retries: the next day's rollover is the next opportunity.

use crate::config::UploadConfig;
use crate::error::{AppResult, LoggerError};
use crate::isolation::panic_message;
use crate::storage::EventLog;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transfers one local file to the remote store.
pub trait Uploader: Send + Sync {
    /// Copy `local_path` to `destination_id`. `Ok(false)` is a reported failure,
    /// `Err` a fault while trying.
    fn upload(&self, local_path: &Path, destination_id: &str) -> AppResult<bool>;

    /// Whether uploads actually go anywhere.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no upload is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUploader;

impl Uploader for NoopUploader {
    fn upload(&self, _local_path: &Path, _destination_id: &str) -> AppResult<bool> {
        Ok(false)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Runs an external command per upload, e.g.
/// `aws s3 cp {path} s3://serialdata/{object}`.
///
/// `{path}` becomes the local file and `{object}` the destination id in every
/// argument. Success is the command's exit status.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    program: String,
    args: Vec<String>,
}

impl CommandUploader {
    /// Build from `[program, args...]`.
    pub fn new(command: &[String]) -> AppResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| LoggerError::Config("Upload command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn render_args(&self, local_path: &Path, destination_id: &str) -> Vec<String> {
        let path = local_path.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{path}", &path).replace("{object}", destination_id))
            .collect()
    }
}

impl Uploader for CommandUploader {
    fn upload(&self, local_path: &Path, destination_id: &str) -> AppResult<bool> {
        let args = self.render_args(local_path, destination_id);
        debug!(program = %self.program, ?args, "running upload command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| LoggerError::Upload(format!("failed to run '{}': {}", self.program, e)))?;

        if !output.status.success() {
            warn!(
                program = %self.program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "upload command failed"
            );
        }
        Ok(output.status.success())
    }
}

/// Build the uploader described by `config`.
pub fn uploader_from_config(config: &UploadConfig) -> AppResult<Box<dyn Uploader>> {
    if config.command.is_empty() {
        Ok(Box::new(NoopUploader))
    } else {
        Ok(Box::new(CommandUploader::new(&config.command)?))
    }
}

/// Result of one rollover upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The uploader reported success.
    Uploaded,
    /// The uploader reported failure or faulted.
    Failed(String),
    /// No records were written that day, so there is no file.
    Missing,
    /// Uploads are not configured.
    Disabled,
}

/// Fires the uploader for each completed daily file.
pub struct UploadTrigger {
    uploader: Box<dyn Uploader>,
    log: Arc<EventLog>,
}

impl UploadTrigger {
    /// Report outcomes to `log`.
    pub fn new(uploader: Box<dyn Uploader>, log: Arc<EventLog>) -> Self {
        Self { uploader, log }
    }

    /// Upload the file completed for `prefix` at rollover.
    pub fn on_rollover(&self, prefix: &str, file_path: &Path) -> UploadOutcome {
        let object = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());

        if !self.uploader.is_enabled() {
            self.log
                .port_info(prefix, format!("Upload disabled, {} kept locally", object));
            return UploadOutcome::Disabled;
        }

        if !file_path.exists() {
            self.log
                .port_info(prefix, format!("No data recorded, {} not uploaded", object));
            return UploadOutcome::Missing;
        }

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            self.uploader.upload(file_path, &object)
        }))
        .unwrap_or_else(|payload| {
            Err(LoggerError::Upload(format!(
                "uploader panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        match attempt {
            Ok(true) => {
                self.log
                    .port_info(prefix, format!("File {} uploaded successfully", object));
                UploadOutcome::Uploaded
            }
            Ok(false) => {
                let reason = format!("Failed to upload {}", object);
                self.log.port_error(prefix, reason.clone());
                UploadOutcome::Failed(reason)
            }
            Err(e) => {
                let reason = format!("File upload error: {} ({})", e, object);
                self.log.port_error(prefix, reason.clone());
                UploadOutcome::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(PathBuf, String)>>,
        result: Option<bool>,
    }

    impl Uploader for Arc<Recording> {
        fn upload(&self, local_path: &Path, destination_id: &str) -> AppResult<bool> {
            self.calls
                .lock()
                .unwrap()
                .push((local_path.to_path_buf(), destination_id.to_string()));
            self.result
                .ok_or_else(|| LoggerError::Upload("bucket unreachable".into()))
        }
    }

    fn event_log(dir: &Path) -> Arc<EventLog> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 1).unwrap());
        Arc::new(EventLog::new(dir, Arc::new(clock)))
    }

    fn completed_file(dir: &Path) -> PathBuf {
        let path = dir.join("tempA_20240105.txt");
        std::fs::write(&path, "2024/01/05 10:00:00 GMT\t12.3\n").unwrap();
        path
    }

    #[test]
    fn uploads_completed_file_under_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(Recording {
            result: Some(true),
            ..Default::default()
        });
        let trigger = UploadTrigger::new(Box::new(Arc::clone(&uploader)), event_log(dir.path()));
        let path = completed_file(dir.path());

        assert_eq!(trigger.on_rollover("tempA", &path), UploadOutcome::Uploaded);
        let calls = uploader.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(path.clone(), "tempA_20240105.txt".to_string())]);

        let log = std::fs::read_to_string(dir.path().join("20240106.LOG")).unwrap();
        assert!(log.contains("tempA: File tempA_20240105.txt uploaded successfully"));
    }

    #[test]
    fn uploader_fault_is_logged_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(Recording::default());
        let trigger = UploadTrigger::new(Box::new(Arc::clone(&uploader)), event_log(dir.path()));
        let path = completed_file(dir.path());

        let outcome = trigger.on_rollover("tempA", &path);
        assert!(matches!(outcome, UploadOutcome::Failed(ref msg) if msg.contains("bucket unreachable")));
        let log = std::fs::read_to_string(dir.path().join("20240106.LOG")).unwrap();
        assert!(log.contains("File upload error"));
    }

    #[test]
    fn reported_failure_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(Recording {
            result: Some(false),
            ..Default::default()
        });
        let trigger = UploadTrigger::new(Box::new(Arc::clone(&uploader)), event_log(dir.path()));
        let path = completed_file(dir.path());

        assert_eq!(
            trigger.on_rollover("tempA", &path),
            UploadOutcome::Failed("Failed to upload tempA_20240105.txt".to_string())
        );
        assert_eq!(uploader.calls.lock().unwrap().len(), 1);
        let log = std::fs::read_to_string(dir.path().join("20240106.LOG")).unwrap();
        assert!(log.contains("tempA: Failed to upload tempA_20240105.txt"));
    }

    struct Exploding;

    impl Uploader for Exploding {
        fn upload(&self, _local_path: &Path, _destination_id: &str) -> AppResult<bool> {
            panic!("credential helper crashed")
        }
    }

    #[test]
    fn uploader_panic_becomes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let trigger = UploadTrigger::new(Box::new(Exploding), event_log(dir.path()));
        let path = completed_file(dir.path());

        let outcome = trigger.on_rollover("tempA", &path);
        assert!(
            matches!(outcome, UploadOutcome::Failed(ref msg) if msg.contains("credential helper crashed"))
        );
        let log = std::fs::read_to_string(dir.path().join("20240106.LOG")).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("tempA: File upload error: Upload error: uploader panicked"));
    }

    #[test]
    fn missing_file_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(Recording {
            result: Some(true),
            ..Default::default()
        });
        let trigger = UploadTrigger::new(Box::new(Arc::clone(&uploader)), event_log(dir.path()));

        let outcome = trigger.on_rollover("tempA", &dir.path().join("tempA_20240105.txt"));
        assert_eq!(outcome, UploadOutcome::Missing);
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_config_disables_uploads() {
        let uploader = uploader_from_config(&UploadConfig::default()).unwrap();
        assert!(!uploader.is_enabled());
    }

    #[test]
    fn command_placeholders_are_substituted() {
        let uploader = CommandUploader::new(&[
            "aws".to_string(),
            "s3".to_string(),
            "cp".to_string(),
            "{path}".to_string(),
            "s3://serialdata/{object}".to_string(),
        ])
        .unwrap();
        let args = uploader.render_args(Path::new("/data/tempA_20240105.txt"), "tempA_20240105.txt");
        assert_eq!(
            args,
            vec![
                "s3",
                "cp",
                "/data/tempA_20240105.txt",
                "s3://serialdata/tempA_20240105.txt"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_exit_status_decides_success() {
        let ok = CommandUploader::new(&["true".to_string()]).unwrap();
        assert!(ok.upload(Path::new("/dev/null"), "x").unwrap());
        let failing = CommandUploader::new(&["false".to_string()]).unwrap();
        assert!(!failing.upload(Path::new("/dev/null"), "x").unwrap());
    }

    #[test]
    fn missing_program_is_an_error() {
        let uploader = CommandUploader::new(&["definitely-not-a-real-uploader-binary".to_string()]).unwrap();
        assert!(uploader.upload(Path::new("/dev/null"), "x").is_err());
    }
}
