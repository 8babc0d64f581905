//! Lifetime management for the single generated code artifact.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Receives deletion outcomes so callers can log them.
pub trait ArtifactObserver: Send + Sync {
    /// Called after the artifact file was deleted.
    fn on_removed(&self, path: &Path);

    /// Called when deleting the artifact failed during final cleanup.
    fn on_remove_failed(&self, path: &Path, error: &io::Error);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopArtifactObserver;

impl ArtifactObserver for NoopArtifactObserver {
    fn on_removed(&self, _path: &Path) {}

    fn on_remove_failed(&self, _path: &Path, _error: &io::Error) {}
}

/// Owns the artifact path for one run.
///
/// [`ensure_absent`](Self::ensure_absent) clears stale state before encoding;
/// [`remove_if_present`](Self::remove_if_present) is the final cleanup and
/// only acts on its first call.
pub struct ArtifactManager {
    path: PathBuf,
    finalized: AtomicBool,
    observer: Arc<dyn ArtifactObserver>,
}

impl ArtifactManager {
    /// Creates a manager without deletion notifications.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_observer(path, Arc::new(NoopArtifactObserver))
    }

    /// Creates a manager reporting deletions to `observer`.
    pub fn with_observer(path: impl Into<PathBuf>, observer: Arc<dyn ArtifactObserver>) -> Self {
        Self {
            path: path.into(),
            finalized: AtomicBool::new(false),
            observer,
        }
    }

    /// Artifact location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when the artifact file currently exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Returns `true` once final cleanup has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Deletes a leftover artifact, if any.
    ///
    /// # Returns
    /// `true` when a stale file was removed.
    ///
    /// # Errors
    /// Returns [`ArtifactError::Remove`] when the file exists but cannot be
    /// deleted.
    pub fn ensure_absent(&self) -> Result<bool, ArtifactError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                self.observer.on_removed(&self.path);
                Ok(true)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ArtifactError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Final best-effort cleanup; never fails the caller.
    ///
    /// Only the first call touches the filesystem. Failures are reported to
    /// the observer and swallowed.
    ///
    /// # Returns
    /// `true` when this call deleted the file.
    pub fn remove_if_present(&self) -> bool {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return false;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                self.observer.on_removed(&self.path);
                true
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => false,
            Err(error) => {
                self.observer.on_remove_failed(&self.path, &error);
                false
            }
        }
    }
}

impl std::fmt::Debug for ArtifactManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactManager")
            .field("path", &self.path)
            .field("finalized", &self.is_finalized())
            .finish_non_exhaustive()
    }
}

/// Artifact filesystem error type.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Existing artifact could not be deleted.
    #[error("failed to remove artifact '{}': {source}", path.display())]
    Remove {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
