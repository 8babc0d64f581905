//! Thread-safe cancellation token with parent/child propagation.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Cloneable cancellation flag that blocked waiters can observe.
///
/// Clones share state. A token created with [`CancellationToken::child_token`]
/// is cancelled whenever its parent is, but cancelling the child leaves the
/// parent untouched.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    children: Mutex<Vec<Weak<TokenInner>>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels this token and every child token. Repeated calls are no-ops.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on this
    /// token or an ancestor.
    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Blocks for at most `timeout`, returning early on cancellation.
    ///
    /// # Returns
    /// `true` when the token is cancelled, `false` when the timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = lock(&self.inner.cancelled);
        let (guard, _) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Blocks until the token is cancelled.
    pub fn wait(&self) {
        let guard = lock(&self.inner.cancelled);
        let _guard = self
            .inner
            .condvar
            .wait_while(guard, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Creates a token cancelled together with `self`.
    pub fn child_token(&self) -> Self {
        let child = Self::new();
        let mut children = lock(&self.inner.children);
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }
}

impl TokenInner {
    fn cancel(&self) {
        {
            let mut cancelled = lock(&self.cancelled);
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.condvar.notify_all();

        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_timeout_reports_elapsed_without_cancel() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn child_created_after_cancel_starts_cancelled() {
        let parent = CancellationToken::new();
        parent.cancel();
        assert!(parent.child_token().is_cancelled());
    }
}
