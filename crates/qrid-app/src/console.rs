//! Text presenter used where no native window shell exists.

use std::io::Write;
use std::sync::mpsc;

use qrid_ui::{DisplaySession, SessionAction, TerminationCause};

use crate::{AppError, PresentRequest, Presenter, spawn_countdown_worker};

/// Writes the artifact location and each countdown label to `out`.
///
/// The calling thread plays the UI role: it owns the [`DisplaySession`] and
/// applies every action, while the countdown worker only sends events.
#[derive(Debug)]
pub struct ConsolePresenter<W> {
    out: W,
}

impl<W: Write> ConsolePresenter<W> {
    /// Creates a presenter writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Borrows the writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> Result<(), AppError> {
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|error| AppError::Display(format!("console write failed: {error}")))
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn present(&mut self, request: PresentRequest<'_>) -> Result<TerminationCause, AppError> {
        self.write_line(&format!(
            "QR code saved as '{}'. Scan it before the countdown ends.",
            request.artifact_path.display()
        ))?;

        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_countdown_worker(request.countdown, request.interrupt, move |event| {
            let _ = event_tx.send(event);
        })?;

        let mut session = DisplaySession::new();
        let cause = loop {
            let Ok(event) = event_rx.recv() else {
                // Worker finished without a terminal event.
                return Err(AppError::Display(
                    "countdown worker stopped before the session terminated".to_string(),
                ));
            };

            match session.handle(event) {
                SessionAction::UpdateLabel(text) => self.write_line(&text)?,
                SessionAction::Close(cause) => break cause,
                SessionAction::Ignore => {}
            }
        };

        worker.shutdown();
        self.write_line(&format!("Session ended: {cause}"))?;
        Ok(cause)
    }
}
