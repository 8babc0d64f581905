#![warn(missing_docs)]
//! # qrid-ui
//!
//! ## Purpose
//! Defines the UI-thread state of one display session and the window layout.
//!
//! ## Responsibilities
//! - Reduce countdown, close, and interrupt events into label updates and a
//!   single termination decision ([`DisplaySession`]).
//! - Compute the centered window origin and the aspect-preserving image
//!   rectangle ([`WindowLayout`]).
//!
//! ## Data flow
//! The countdown worker emits [`SessionEvent`]s; the UI thread feeds them to
//! [`DisplaySession::handle`] and applies the returned [`SessionAction`] to
//! native widgets.
//!
//! ## Ownership and lifetimes
//! `DisplaySession` is owned by the UI thread only. Background threads never
//! touch it; they send events.
//!
//! ## Error model
//! The reducer is total: late or duplicate events map to
//! [`SessionAction::Ignore`] instead of errors.

use std::fmt;

use qrid_core::{CountdownEvent, format_remaining};

/// Why a display session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// Countdown reached zero.
    Expired,
    /// Operator closed the window.
    UserClosed,
    /// Process received an interrupt or termination signal.
    Interrupted,
}

impl TerminationCause {
    /// Stable lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationCause::Expired => "expired",
            TerminationCause::UserClosed => "user_closed",
            TerminationCause::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the session reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Countdown observation or expiry.
    Countdown(CountdownEvent),
    /// Operator asked to close the window.
    CloseRequested,
    /// Process interrupt arrived.
    Interrupted,
}

/// Effect the UI thread must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Replace the label text.
    UpdateLabel(String),
    /// Close the window; the session is now terminated.
    Close(TerminationCause),
    /// Nothing to do.
    Ignore,
}

/// Label and termination state of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySession {
    label: String,
    label_updates: usize,
    termination: Option<TerminationCause>,
}

impl DisplaySession {
    /// Creates a running session with an empty label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event.
    pub fn handle(&mut self, event: SessionEvent) -> SessionAction {
        if self.termination.is_some() {
            return SessionAction::Ignore;
        }

        match event {
            SessionEvent::Countdown(CountdownEvent::Remaining(remaining)) => {
                self.label = format_remaining(remaining);
                self.label_updates += 1;
                SessionAction::UpdateLabel(self.label.clone())
            }
            SessionEvent::Countdown(CountdownEvent::Expired) => {
                self.close(TerminationCause::Expired)
            }
            SessionEvent::CloseRequested => self.close(TerminationCause::UserClosed),
            SessionEvent::Interrupted => self.close(TerminationCause::Interrupted),
        }
    }

    /// Marks the session terminated.
    ///
    /// # Returns
    /// `true` for the first call; later calls are no-ops returning `false`.
    pub fn terminate(&mut self, cause: TerminationCause) -> bool {
        if self.termination.is_some() {
            return false;
        }
        self.termination = Some(cause);
        true
    }

    /// Current label text.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of label updates applied so far.
    pub fn label_updates(&self) -> usize {
        self.label_updates
    }

    /// Termination cause, once terminated.
    pub fn termination(&self) -> Option<TerminationCause> {
        self.termination
    }

    /// Returns `true` after the first close trigger.
    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    fn close(&mut self, cause: TerminationCause) -> SessionAction {
        if self.terminate(cause) {
            SessionAction::Close(cause)
        } else {
            SessionAction::Ignore
        }
    }
}

/// Pixel rectangle in window client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// Fixed-size window with an image stacked above a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    /// Window width in pixels.
    pub width: i32,
    /// Window height in pixels.
    pub height: i32,
    /// Label row height in pixels.
    pub label_height: i32,
    /// Outer and inter-row padding in pixels.
    pub padding: i32,
}

impl Default for WindowLayout {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            label_height: 28,
            padding: 8,
        }
    }
}

impl WindowLayout {
    /// Top-left corner that centers the window on a `screen_width x
    /// screen_height` display. May be negative on tiny screens.
    pub fn centered_origin(&self, screen_width: i32, screen_height: i32) -> (i32, i32) {
        (
            screen_width / 2 - self.width / 2,
            screen_height / 2 - self.height / 2,
        )
    }

    /// Area reserved for the image.
    pub fn image_area(&self) -> Rect {
        Rect {
            x: self.padding,
            y: self.padding,
            width: (self.width - 2 * self.padding).max(1),
            height: (self.height - self.label_height - 3 * self.padding).max(1),
        }
    }

    /// Label row, spanning the window width below the image area.
    pub fn label_rect(&self) -> Rect {
        let image = self.image_area();
        Rect {
            x: self.padding,
            y: image.y + image.height + self.padding,
            width: image.width,
            height: self.label_height,
        }
    }

    /// Largest rectangle with the image's aspect ratio that fits
    /// [`image_area`](Self::image_area), centered inside it.
    pub fn fit_image(&self, image_width: u32, image_height: u32) -> Rect {
        let area = self.image_area();
        let image_width = image_width.max(1) as f64;
        let image_height = image_height.max(1) as f64;
        let scale = (area.width as f64 / image_width).min(area.height as f64 / image_height);
        let width = ((image_width * scale).floor() as i32).clamp(1, area.width);
        let height = ((image_height * scale).floor() as i32).clamp(1, area.height);

        Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        }
    }
}
