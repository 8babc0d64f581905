//! Session orchestration.

use std::io;
use std::path::Path;
use std::sync::Arc;

use qrid_core::{ArtifactManager, ArtifactObserver, CancellationToken};
use qrid_encoder::encode_to_file;
use qrid_identity::IdentifierSource;
use qrid_ui::TerminationCause;

use crate::logging::{log_error, log_info, log_warn};
use crate::{
    AppError, InterruptContext, PresentRequest, Presenter, QridConfig, install_interrupt_handler,
};

/// Result of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// What ended the session.
    pub cause: TerminationCause,
    /// Whether a leftover artifact from an earlier run was deleted first.
    pub stale_artifact_removed: bool,
}

/// Reports artifact deletions to the run log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingArtifactObserver;

impl ArtifactObserver for LoggingArtifactObserver {
    fn on_removed(&self, path: &Path) {
        log_info(
            "artifact",
            "deleted",
            &format!("QR code file deleted: {}", path.display()),
        );
    }

    fn on_remove_failed(&self, path: &Path, error: &io::Error) {
        log_error(
            "artifact",
            "delete_failed",
            &format!("path={} error={error}", path.display()),
        );
    }
}

/// Runs one identify -> encode -> display -> cleanup sequence.
pub struct SessionController<P> {
    config: QridConfig,
    source: Box<dyn IdentifierSource>,
    presenter: P,
    artifact: Arc<ArtifactManager>,
    interrupt: CancellationToken,
    finished: CancellationToken,
}

impl<P: Presenter> SessionController<P> {
    /// Creates a controller with a fresh interrupt token.
    pub fn new(config: QridConfig, source: Box<dyn IdentifierSource>, presenter: P) -> Self {
        Self::with_interrupt(config, source, presenter, CancellationToken::new())
    }

    /// Creates a controller observing `interrupt`.
    pub fn with_interrupt(
        config: QridConfig,
        source: Box<dyn IdentifierSource>,
        presenter: P,
        interrupt: CancellationToken,
    ) -> Self {
        let artifact = Arc::new(ArtifactManager::with_observer(
            config.artifact_path(),
            Arc::new(LoggingArtifactObserver),
        ));

        Self {
            config,
            source,
            presenter,
            artifact,
            interrupt,
            finished: CancellationToken::new(),
        }
    }

    /// Token cancelled when the process is interrupted.
    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Latch cancelled once final cleanup has run.
    pub fn finished_token(&self) -> CancellationToken {
        self.finished.clone()
    }

    /// Shared artifact manager.
    pub fn artifact(&self) -> Arc<ArtifactManager> {
        Arc::clone(&self.artifact)
    }

    /// Presenter, e.g. to inspect what it rendered.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Context the signal watcher needs to clean up for this controller.
    pub fn interrupt_context(&self) -> InterruptContext {
        InterruptContext {
            interrupt: self.interrupt.clone(),
            finished: self.finished.clone(),
            artifact: Arc::clone(&self.artifact),
            grace: self.config.interrupt_grace,
        }
    }

    /// Installs the process-wide SIGINT/SIGTERM (console control on Windows)
    /// watcher bound to this controller.
    ///
    /// # Errors
    /// Returns [`AppError::Signal`] when handlers cannot be registered.
    pub fn install_interrupt_handler(&self) -> Result<(), AppError> {
        install_interrupt_handler(self.interrupt_context())
    }

    /// Runs the session. Final cleanup runs on every path, success or error.
    ///
    /// # Errors
    /// Returns [`AppError::ConfigurationAccess`] or [`AppError::Encoding`]
    /// before any window is shown, or presenter failures.
    pub fn run(&mut self) -> Result<SessionOutcome, AppError> {
        let result = self.run_session();
        self.cleanup();
        result
    }

    fn run_session(&mut self) -> Result<SessionOutcome, AppError> {
        let stale_artifact_removed = match self.artifact.ensure_absent() {
            Ok(removed) => removed,
            Err(error) => {
                let error = AppError::from(error);
                log_warn("artifact", "pre_cleanup_failed", &error.to_string());
                false
            }
        };

        let identifier = self.source.read_identifier()?;
        log_info(
            "identity",
            "read",
            &format!(
                "source={} length={}",
                self.source.describe(),
                identifier.len()
            ),
        );

        let countdown = self.config.countdown()?;
        encode_to_file(
            &identifier,
            self.artifact.path(),
            self.config.qr_size,
            self.config.error_correction,
        )?;
        log_info(
            "artifact",
            "generated",
            &format!(
                "QR code generated: path={} size={}px",
                self.artifact.path().display(),
                self.config.qr_size
            ),
        );

        if self.interrupt.is_cancelled() {
            log_warn("session", "skipped", "interrupt arrived before display");
            return Ok(SessionOutcome {
                cause: TerminationCause::Interrupted,
                stale_artifact_removed,
            });
        }

        log_info(
            "session",
            "start",
            &format!(
                "duration_ms={} tick_ms={}",
                self.config.display_duration.as_millis(),
                self.config.tick_interval.as_millis()
            ),
        );
        let cause = self.presenter.present(PresentRequest {
            artifact_path: self.artifact.path(),
            countdown,
            interrupt: &self.interrupt,
            layout: self.config.layout,
        })?;
        log_info("session", "terminated", &format!("cause={cause}"));

        Ok(SessionOutcome {
            cause,
            stale_artifact_removed,
        })
    }

    fn cleanup(&self) {
        self.artifact.remove_if_present();
        log_info("cleanup", "complete", "application cleanup complete");
        self.finished.cancel();
    }
}
