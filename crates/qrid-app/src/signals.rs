//! Process interrupt watcher.
//!
//! A dedicated thread drives a current-thread tokio runtime that waits for
//! SIGINT/SIGTERM (unix) or Ctrl-C/Ctrl-Break/console close (Windows). The
//! watcher never touches UI state: it cancels the interrupt token and, if
//! the UI thread does not finish within the grace period, deletes the
//! artifact itself and exits.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use qrid_core::{ArtifactManager, CancellationToken};

use crate::AppError;
use crate::logging::{log_info, log_warn};

/// Signal that triggered the interrupt path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivedSignal {
    /// SIGINT, Ctrl-C or Ctrl-Break.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Console window closing (Windows).
    ConsoleClose,
}

impl fmt::Display for ReceivedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReceivedSignal::Interrupt => "interrupt",
            ReceivedSignal::Terminate => "terminate",
            ReceivedSignal::ConsoleClose => "console_close",
        };
        f.write_str(name)
    }
}

/// How the interrupt path finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptResolution {
    /// The controller finished its own cleanup within the grace period.
    SessionFinished,
    /// The watcher deleted the artifact because the controller did not finish.
    ForcedCleanup,
}

/// State shared between the controller and the signal watcher.
#[derive(Debug, Clone)]
pub struct InterruptContext {
    /// Cancelled when a signal arrives.
    pub interrupt: CancellationToken,
    /// Cancelled by the controller after its final cleanup.
    pub finished: CancellationToken,
    /// Artifact to delete if the controller is stuck.
    pub artifact: Arc<ArtifactManager>,
    /// How long to wait for the controller.
    pub grace: Duration,
}

/// Handles one received signal.
///
/// Cancels the interrupt token, then waits up to `context.grace` for the
/// controller to finish. If it does not, runs the artifact cleanup here.
pub fn handle_interrupt(signal: ReceivedSignal, context: &InterruptContext) -> InterruptResolution {
    log_warn("signal", "received", &format!("signal={signal}"));
    context.interrupt.cancel();

    if context.finished.wait_timeout(context.grace) {
        return InterruptResolution::SessionFinished;
    }

    context.artifact.remove_if_present();
    log_info(
        "cleanup",
        "complete",
        &format!(
            "application cleanup complete (forced after {}ms grace)",
            context.grace.as_millis()
        ),
    );
    InterruptResolution::ForcedCleanup
}

/// Registers signal handlers and spawns the watcher thread.
///
/// Registration happens before this returns, so a signal arriving right
/// after startup is not lost. A forced cleanup ends the process with exit
/// status 0.
///
/// # Errors
/// Returns [`AppError::Signal`] when the runtime, the handlers, or the
/// thread cannot be created.
pub fn install_interrupt_handler(context: InterruptContext) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| AppError::Signal(format!("failed to build signal runtime: {error}")))?;

    let mut listener = {
        let _guard = runtime.enter();
        SignalListener::register()
            .map_err(|error| AppError::Signal(format!("failed to register handlers: {error}")))?
    };

    thread::Builder::new()
        .name("qrid-signal-watcher".to_string())
        .spawn(move || {
            let signal = runtime.block_on(listener.recv());
            if handle_interrupt(signal, &context) == InterruptResolution::ForcedCleanup {
                std::process::exit(0);
            }
        })
        .map_err(|error| AppError::Signal(format!("failed to spawn signal watcher: {error}")))?;

    log_info("signal", "installed", "interrupt watcher running");
    Ok(())
}

#[cfg(unix)]
struct SignalListener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> ReceivedSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ReceivedSignal::Interrupt,
            _ = self.terminate.recv() => ReceivedSignal::Terminate,
        }
    }
}

#[cfg(windows)]
struct SignalListener {
    ctrl_c: tokio::signal::windows::CtrlC,
    ctrl_break: tokio::signal::windows::CtrlBreak,
    ctrl_close: tokio::signal::windows::CtrlClose,
}

#[cfg(windows)]
impl SignalListener {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close};

        Ok(Self {
            ctrl_c: ctrl_c()?,
            ctrl_break: ctrl_break()?,
            ctrl_close: ctrl_close()?,
        })
    }

    async fn recv(&mut self) -> ReceivedSignal {
        tokio::select! {
            _ = self.ctrl_c.recv() => ReceivedSignal::Interrupt,
            _ = self.ctrl_break.recv() => ReceivedSignal::Interrupt,
            _ = self.ctrl_close.recv() => ReceivedSignal::ConsoleClose,
        }
    }
}
