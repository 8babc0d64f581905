//! Per-run diagnostic log file.
//!
//! Lines look like `<utc timestamp> | <LEVEL> | <stage> | <action> | <detail>`.
//! The global helpers are no-ops until [`initialize_logger`] succeeds, so
//! library code can log unconditionally.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use time::OffsetDateTime;

use crate::AppError;

static RUN_LOGGER: OnceLock<RunLogger> = OnceLock::new();

/// Plain-text log file truncated when the run starts.
#[derive(Debug)]
pub struct RunLogger {
    file: Mutex<File>,
    path: PathBuf,
}

impl RunLogger {
    /// Creates (or truncates) the log file at `path`.
    ///
    /// # Errors
    /// Returns [`AppError::Logging`] when the file cannot be opened.
    pub fn create(path: &Path) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|error| {
                AppError::Logging(format!(
                    "unable to create log file '{}': {error}",
                    path.display()
                ))
            })?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line; `ERROR` lines are flushed immediately.
    pub fn write_line(&self, level: &str, stage: &str, action: &str, detail: &str) {
        let timestamp = timestamp_utc();
        let line = format!("{timestamp} | {level} | {stage} | {action} | {detail}\n");

        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
            if level == "ERROR" {
                let _ = file.flush();
            }
        }
    }
}

/// Installs the process-wide run logger at `path`.
///
/// A second call keeps the first logger.
///
/// # Errors
/// Returns [`AppError::Logging`] when the file cannot be created.
pub fn initialize_logger(path: &Path) -> Result<(), AppError> {
    if RUN_LOGGER.get().is_some() {
        return Ok(());
    }

    let logger = RunLogger::create(path)?;
    let path = logger.path().display().to_string();
    let _ = RUN_LOGGER.set(logger);
    log_info("logging", "file_created", &format!("log_file={path}"));
    Ok(())
}

/// Logs an `INFO` line.
pub fn log_info(stage: &str, action: &str, detail: &str) {
    if let Some(logger) = RUN_LOGGER.get() {
        logger.write_line("INFO", stage, action, detail);
    }
}

/// Logs a `WARN` line.
pub fn log_warn(stage: &str, action: &str, detail: &str) {
    if let Some(logger) = RUN_LOGGER.get() {
        logger.write_line("WARN", stage, action, detail);
    }
}

/// Logs an `ERROR` line.
pub fn log_error(stage: &str, action: &str, detail: &str) {
    if let Some(logger) = RUN_LOGGER.get() {
        logger.write_line("ERROR", stage, action, detail);
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn timestamp_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}
