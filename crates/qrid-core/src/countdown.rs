//! Countdown state machine and its cooperative runner.

use std::time::Duration;

use crate::{CancellationToken, CoreError};

/// Observable countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Countdown still running with the last observed remaining time.
    Running(Duration),
    /// Countdown reached zero and emitted its expiry event.
    Expired,
}

/// One countdown emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Remaining-time observation used for the label.
    Remaining(Duration),
    /// Terminal event, emitted exactly once after the zero observation.
    Expired,
}

/// How [`run_countdown`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// Every observation and the expiry event were delivered.
    Completed,
    /// The token was cancelled; nothing further was delivered.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Observe,
    Expire,
    Done,
}

/// Fixed-cadence countdown.
///
/// Iterating yields `Remaining(duration)`, then one observation per tick down
/// to `Remaining(0)`, then a single `Expired`. Remaining time saturates at
/// zero, so a duration that is not a multiple of the tick still ends on an
/// exact zero observation.
#[derive(Debug, Clone)]
pub struct Countdown {
    duration: Duration,
    tick: Duration,
    next_remaining: Duration,
    state: CountdownState,
    phase: Phase,
}

impl Countdown {
    /// Creates a countdown starting at `duration` and stepping by `tick`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTick`] when `tick` is zero.
    pub fn new(duration: Duration, tick: Duration) -> Result<Self, CoreError> {
        if tick.is_zero() {
            return Err(CoreError::InvalidTick);
        }

        Ok(Self {
            duration,
            tick,
            next_remaining: duration,
            state: CountdownState::Running(duration),
            phase: Phase::Observe,
        })
    }

    /// Configured starting duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Interval between observations.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Current state after the events consumed so far.
    pub fn state(&self) -> CountdownState {
        self.state
    }
}

impl Iterator for Countdown {
    type Item = CountdownEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.phase {
            Phase::Observe => {
                let remaining = self.next_remaining;
                if remaining.is_zero() {
                    self.phase = Phase::Expire;
                } else {
                    self.next_remaining = remaining.saturating_sub(self.tick);
                }
                self.state = CountdownState::Running(remaining);
                Some(CountdownEvent::Remaining(remaining))
            }
            Phase::Expire => {
                self.phase = Phase::Done;
                self.state = CountdownState::Expired;
                Some(CountdownEvent::Expired)
            }
            Phase::Done => None,
        }
    }
}

/// Drives `countdown` in real time, delivering events to `sink`.
///
/// The first observation is delivered immediately; each later observation
/// waits one tick on `token`. `Expired` follows the zero observation without
/// an extra wait. Once `token` is cancelled nothing more reaches `sink`.
pub fn run_countdown<F>(
    countdown: Countdown,
    token: &CancellationToken,
    mut sink: F,
) -> CountdownOutcome
where
    F: FnMut(CountdownEvent),
{
    let tick = countdown.tick();
    let mut first_observation = true;

    for event in countdown {
        if matches!(event, CountdownEvent::Remaining(_)) {
            if !first_observation && token.wait_timeout(tick) {
                return CountdownOutcome::Cancelled;
            }
            first_observation = false;
        }
        if token.is_cancelled() {
            return CountdownOutcome::Cancelled;
        }
        sink(event);
    }

    CountdownOutcome::Completed
}

/// Formats remaining time as `Time remaining: MM:SS`.
pub fn format_remaining(remaining: Duration) -> String {
    let seconds = remaining.as_secs();
    format!("Time remaining: {:02}:{:02}", seconds / 60, seconds % 60)
}
