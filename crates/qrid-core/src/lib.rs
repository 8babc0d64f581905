#![warn(missing_docs)]
//! # qrid-core
//!
//! ## Purpose
//! Defines the platform-independent model used across the `qrid` workspace.
//!
//! ## Responsibilities
//! - Represent the device [`Identifier`] read from configuration.
//! - Drive the display countdown as a pure state machine ([`Countdown`]) and
//!   as a cooperative, cancellable runner ([`run_countdown`]).
//! - Own the single on-disk code artifact through [`ArtifactManager`].
//! - Provide the [`CancellationToken`] used to stop background work.
//!
//! ## Data flow
//! The controller reads an [`Identifier`], asks the encoder to write the
//! artifact at [`ArtifactManager::path`], then runs a [`Countdown`] whose
//! events are forwarded to the UI thread. Session end always funnels into
//! [`ArtifactManager::remove_if_present`].
//!
//! ## Ownership and lifetimes
//! Tokens and managers are cheap to share (`Arc` inside / `Arc` outside), so
//! the signal path and the UI path can hold the same artifact without
//! borrowing across threads.
//!
//! ## Error model
//! Validation failures return [`CoreError`]; filesystem failures while
//! managing the artifact return [`ArtifactError`].
//!
//! ## Security and privacy notes
//! The identifier is identifying material. Its `Debug` output is redacted and
//! the artifact is deleted at most once, at session end.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use qrid_core::{Countdown, CountdownEvent, format_remaining};
//!
//! let countdown = Countdown::new(Duration::from_secs(2), Duration::from_secs(1)).unwrap();
//! let labels: Vec<String> = countdown
//!     .filter_map(|event| match event {
//!         CountdownEvent::Remaining(remaining) => Some(format_remaining(remaining)),
//!         CountdownEvent::Expired => None,
//!     })
//!     .collect();
//! assert_eq!(labels.first().map(String::as_str), Some("Time remaining: 00:02"));
//! assert_eq!(labels.last().map(String::as_str), Some("Time remaining: 00:00"));
//! ```

mod artifact;
mod cancel;
mod countdown;

use std::fmt;

use thiserror::Error;

pub use artifact::{ArtifactError, ArtifactManager, ArtifactObserver, NoopArtifactObserver};
pub use cancel::CancellationToken;
pub use countdown::{
    Countdown, CountdownEvent, CountdownOutcome, CountdownState, format_remaining, run_countdown,
};

/// Opaque, non-empty device identifier sourced from configuration.
///
/// The value is kept verbatim (no trimming) so the encoded payload matches
/// the configured string byte for byte.
#[derive(Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    /// Creates a validated identifier.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyIdentifier`] when the value is empty or only
    /// whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::EmptyIdentifier);
        }
        Ok(Self(value))
    }

    /// Returns the raw identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; construction rejects empty values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier(<redacted>, len={})", self.0.len())
    }
}

/// Core model error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Identifier text was empty or whitespace.
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    /// Countdown tick interval must be positive.
    #[error("countdown tick interval must be greater than zero")]
    InvalidTick,
}
