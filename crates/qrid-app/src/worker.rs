//! Background countdown worker.

use std::thread::{self, JoinHandle};

use qrid_core::{CancellationToken, Countdown, CountdownOutcome, run_countdown};
use qrid_ui::SessionEvent;

use crate::AppError;
use crate::logging::log_info;

/// Handle to a running countdown thread.
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
pub struct CountdownWorker {
    session: CancellationToken,
    join: Option<JoinHandle<CountdownOutcome>>,
}

impl CountdownWorker {
    /// Asks the worker to stop; no further events are emitted afterwards.
    pub fn stop(&self) {
        self.session.cancel();
    }

    /// Stops the worker and waits for the thread.
    ///
    /// # Returns
    /// The countdown outcome, or `None` if the thread panicked.
    pub fn shutdown(mut self) -> Option<CountdownOutcome> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Option<CountdownOutcome> {
        self.session.cancel();
        let outcome = self.join.take().and_then(|join| join.join().ok());
        if let Some(outcome) = outcome {
            log_info("countdown_worker", "shutdown", &format!("outcome={outcome:?}"));
        }
        outcome
    }
}

impl Drop for CountdownWorker {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.join_inner();
        }
    }
}

/// Runs `countdown` on a named thread, delivering [`SessionEvent`]s to `sink`.
///
/// The worker waits on a child of `interrupt`, so either a process interrupt
/// or [`CountdownWorker::stop`] ends it. When an interrupt is what stopped
/// it, one final [`SessionEvent::Interrupted`] is delivered. `sink` must only
/// hand events over (channel send, message post); UI state belongs to the
/// receiving thread.
///
/// # Errors
/// Returns [`AppError::Display`] when the thread cannot be spawned.
pub fn spawn_countdown_worker<F>(
    countdown: Countdown,
    interrupt: &CancellationToken,
    sink: F,
) -> Result<CountdownWorker, AppError>
where
    F: FnMut(SessionEvent) + Send + 'static,
{
    let session = interrupt.child_token();
    let worker_session = session.clone();
    let interrupt = interrupt.clone();
    let mut sink = sink;

    let join = thread::Builder::new()
        .name("qrid-countdown-worker".to_string())
        .spawn(move || {
            let outcome = run_countdown(countdown, &worker_session, |event| {
                sink(SessionEvent::Countdown(event));
            });
            if outcome == CountdownOutcome::Cancelled && interrupt.is_cancelled() {
                sink(SessionEvent::Interrupted);
            }
            outcome
        })
        .map_err(|error| {
            AppError::Display(format!("failed to spawn countdown worker thread: {error}"))
        })?;

    Ok(CountdownWorker {
        session,
        join: Some(join),
    })
}
