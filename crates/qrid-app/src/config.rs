//! Runtime configuration: compiled defaults plus environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use qrid_core::Countdown;
use qrid_encoder::{DEFAULT_SIZE_PX, ErrorCorrection};
use qrid_identity::IdentitySettings;
use qrid_ui::WindowLayout;

use crate::AppError;

/// Artifact file name inside the work directory.
pub const ARTIFACT_FILE_NAME: &str = "output_qr_code.png";
/// Diagnostic log file name inside the work directory.
pub const LOG_FILE_NAME: &str = "QR_debug.log";
/// Default visible duration.
pub const DEFAULT_DISPLAY_SECONDS: u64 = 30;
/// Default label refresh cadence.
pub const DEFAULT_TICK_MILLIS: u64 = 1_000;
/// How long the signal watcher waits for the UI thread before cleaning up
/// on its own.
pub const DEFAULT_INTERRUPT_GRACE_MS: u64 = 2_000;

const ENV_DISPLAY_SECONDS: &str = "QRID_DISPLAY_SECONDS";
const ENV_TICK_MILLIS: &str = "QRID_TICK_MILLIS";
const ENV_WORK_DIR: &str = "QRID_WORK_DIR";
const ENV_DEVICE_ID_VAR: &str = "QRID_DEVICE_ID_VAR";

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QridConfig {
    /// Directory holding the artifact and the log.
    pub work_dir: PathBuf,
    /// Visible duration of the code.
    pub display_duration: Duration,
    /// Countdown tick interval.
    pub tick_interval: Duration,
    /// Artifact side length in pixels.
    pub qr_size: u32,
    /// QR error-correction level.
    pub error_correction: ErrorCorrection,
    /// Identifier store location.
    pub identity: IdentitySettings,
    /// Window geometry.
    pub layout: WindowLayout,
    /// Signal watcher grace period.
    pub interrupt_grace: Duration,
}

impl Default for QridConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            display_duration: Duration::from_secs(DEFAULT_DISPLAY_SECONDS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MILLIS),
            qr_size: DEFAULT_SIZE_PX,
            error_correction: ErrorCorrection::Low,
            identity: IdentitySettings::default(),
            layout: WindowLayout::default(),
            interrupt_grace: Duration::from_millis(DEFAULT_INTERRUPT_GRACE_MS),
        }
    }
}

impl QridConfig {
    /// Defaults overridden by `QRID_*` environment variables.
    ///
    /// Semantics:
    /// - `QRID_DISPLAY_SECONDS`, `QRID_TICK_MILLIS`: positive integers;
    ///   anything else keeps the default.
    /// - `QRID_WORK_DIR`: non-empty path.
    /// - `QRID_DEVICE_ID_VAR`: name of the variable the environment
    ///   identifier source reads.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seconds) = positive_u64_from_env(ENV_DISPLAY_SECONDS) {
            config.display_duration = Duration::from_secs(seconds);
        }
        if let Some(millis) = positive_u64_from_env(ENV_TICK_MILLIS) {
            config.tick_interval = Duration::from_millis(millis);
        }
        if let Some(dir) = non_empty_from_env(ENV_WORK_DIR) {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(var) = non_empty_from_env(ENV_DEVICE_ID_VAR) {
            config.identity.env_var = var;
        }

        config
    }

    /// Same defaults rooted at `work_dir`.
    pub fn in_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Artifact location.
    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(ARTIFACT_FILE_NAME)
    }

    /// Diagnostic log location.
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(LOG_FILE_NAME)
    }

    /// Fresh countdown for one session.
    ///
    /// # Errors
    /// Returns [`AppError::Countdown`] when the tick interval is zero.
    pub fn countdown(&self) -> Result<Countdown, AppError> {
        Ok(Countdown::new(self.display_duration, self.tick_interval)?)
    }
}

fn positive_u64_from_env(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn non_empty_from_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
