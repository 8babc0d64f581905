//! Shared fixtures for app integration tests.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use qrid_app::{AppError, PresentRequest, Presenter, QridConfig, spawn_countdown_worker};
use qrid_ui::{DisplaySession, SessionAction, SessionEvent, TerminationCause};

/// How the scripted presenter ends its session.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Let the countdown expire.
    RunToExpiry,
    /// Simulate a window close after this many label updates.
    CloseAfter(usize),
    /// Cancel the interrupt token after this many label updates.
    InterruptAfter(usize),
}

/// Presenter that drives a real countdown worker and records what it saw.
#[allow(dead_code)]
#[derive(Debug)]
pub struct ScriptedPresenter {
    script: Script,
    /// Label texts in display order.
    pub labels: Vec<String>,
    /// Label updates produced after the session terminated.
    pub labels_after_close: usize,
    /// Whether the artifact existed when the presenter was invoked.
    pub artifact_seen: bool,
    /// Number of `present` calls.
    pub calls: usize,
}

#[allow(dead_code)]
impl ScriptedPresenter {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            labels: Vec::new(),
            labels_after_close: 0,
            artifact_seen: false,
            calls: 0,
        }
    }
}

impl Presenter for ScriptedPresenter {
    fn present(&mut self, request: PresentRequest<'_>) -> Result<TerminationCause, AppError> {
        self.calls += 1;
        self.artifact_seen = request.artifact_path.is_file();

        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_countdown_worker(request.countdown, request.interrupt, move |event| {
            let _ = event_tx.send(event);
        })?;

        let mut session = DisplaySession::new();
        let cause = loop {
            let event = event_rx
                .recv_timeout(Duration::from_secs(10))
                .map_err(|error| AppError::Display(format!("no session event: {error}")))?;

            match session.handle(event) {
                SessionAction::UpdateLabel(text) => {
                    self.labels.push(text);
                    match self.script {
                        Script::CloseAfter(count) if self.labels.len() == count => {
                            if let SessionAction::Close(cause) =
                                session.handle(SessionEvent::CloseRequested)
                            {
                                break cause;
                            }
                        }
                        Script::InterruptAfter(count) if self.labels.len() == count => {
                            request.interrupt.cancel();
                        }
                        _ => {}
                    }
                }
                SessionAction::Close(cause) => break cause,
                SessionAction::Ignore => {}
            }
        };

        worker.shutdown();
        for event in event_rx.try_iter() {
            if matches!(session.handle(event), SessionAction::UpdateLabel(_)) {
                self.labels_after_close += 1;
            }
        }

        Ok(cause)
    }
}

/// Config rooted at `dir` with a short countdown.
#[allow(dead_code)]
pub fn fast_config(dir: &Path, display: Duration, tick: Duration) -> QridConfig {
    QridConfig {
        display_duration: display,
        tick_interval: tick,
        interrupt_grace: Duration::from_millis(200),
        ..QridConfig::in_dir(dir)
    }
}
