#![warn(missing_docs)]
//! # qrid-app
//!
//! ## Purpose
//! Orchestrates one timed QR display session for `qrid`.
//!
//! ## Responsibilities
//! - Resolve runtime configuration ([`QridConfig`]).
//! - Sequence pre-cleanup, identifier read, encode, display, and final
//!   cleanup ([`SessionController`]).
//! - Run the countdown on a background worker that only emits events
//!   ([`spawn_countdown_worker`]).
//! - Install the interrupt watcher that guarantees cleanup on SIGINT/SIGTERM
//!   or console control events ([`install_interrupt_handler`]).
//! - Write the per-run diagnostic log ([`logging`]).
//!
//! ## Data flow
//! Identifier source -> encoder -> artifact path -> [`Presenter`] (image +
//! countdown label) -> termination cause -> artifact cleanup.
//!
//! ## Ownership and lifetimes
//! The controller owns the artifact manager behind an `Arc` so the signal
//! watcher thread can run the same idempotent cleanup.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Anything raised before the
//! presenter runs aborts the session; cleanup failures are logged only.
//!
//! ## Security and privacy notes
//! - The identifier value never reaches the log; only its length does.
//! - The artifact is removed on every exit path, including interrupts.

mod config;
mod console;
mod controller;
pub mod logging;
mod signals;
mod worker;

use std::path::Path;

use qrid_core::{ArtifactError, CancellationToken, CoreError, Countdown};
use qrid_encoder::EncodeError;
use qrid_identity::IdentityError;
use qrid_ui::{TerminationCause, WindowLayout};
use thiserror::Error;

pub use config::{
    ARTIFACT_FILE_NAME, DEFAULT_DISPLAY_SECONDS, DEFAULT_INTERRUPT_GRACE_MS, DEFAULT_TICK_MILLIS,
    LOG_FILE_NAME, QridConfig,
};
pub use console::ConsolePresenter;
pub use controller::{LoggingArtifactObserver, SessionController, SessionOutcome};
pub use signals::{
    InterruptContext, InterruptResolution, ReceivedSignal, handle_interrupt,
    install_interrupt_handler,
};
pub use worker::{CountdownWorker, spawn_countdown_worker};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("QRID_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Everything a presenter needs to run one session.
#[derive(Debug)]
pub struct PresentRequest<'a> {
    /// Rendered code artifact to show.
    pub artifact_path: &'a Path,
    /// Countdown driving the label and expiry.
    pub countdown: Countdown,
    /// Process interrupt token; cancelled when a signal arrives.
    pub interrupt: &'a CancellationToken,
    /// Window geometry.
    pub layout: WindowLayout,
}

/// Blocking display of one session.
pub trait Presenter {
    /// Shows the artifact with a countdown label and blocks until the session
    /// terminates.
    ///
    /// # Errors
    /// Returns [`AppError::Display`] when the display cannot be created or
    /// driven.
    fn present(&mut self, request: PresentRequest<'_>) -> Result<TerminationCause, AppError>;
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identifier could not be read from configuration.
    #[error("configuration access error: {0}")]
    ConfigurationAccess(#[from] IdentityError),
    /// Artifact could not be produced.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),
    /// Artifact delete failure.
    #[error("artifact io error: {0}")]
    ArtifactIo(#[from] ArtifactError),
    /// Countdown parameters rejected.
    #[error("countdown error: {0}")]
    Countdown(#[from] CoreError),
    /// Diagnostic log could not be created.
    #[error("logging error: {0}")]
    Logging(String),
    /// Interrupt handler could not be installed.
    #[error("signal handler error: {0}")]
    Signal(String),
    /// Display session failure.
    #[error("display error: {0}")]
    Display(String),
}
