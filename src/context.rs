//! Cancellation context shared by every combinator.
//!
//! A [`Context`] bundles three things a pipeline needs to shut down cleanly:
//! a broadcast cancellation flag, an optional deadline, and a tracker for the
//! worker tasks spawned on its behalf. It is cheap to clone and every clone
//! observes the same signal.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;

use crate::error::Error;

/// The ambient cancellation signal threaded through a pipeline.
///
/// Combinators only observe a context; firing it is the business of whoever
/// holds the matching [`Canceller`].
///
/// # Examples
///
/// ```rust
/// use conduit::{Context, Error};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (ctx, canceller) = Context::background().with_cancel();
/// assert!(!ctx.is_done());
///
/// canceller.cancel();
/// assert_eq!(ctx.done().await, Error::Cancelled);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    workers: TaskTracker,
}

impl Context {
    /// Create a root context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            workers: TaskTracker::new(),
        }
    }

    /// Derive a child context along with the handle that cancels it.
    ///
    /// Cancelling the parent also cancels the child; cancelling the child
    /// leaves the parent untouched.
    pub fn with_cancel(&self) -> (Context, Canceller) {
        self.derive(self.deadline)
    }

    /// Derive a child context that expires at `deadline`.
    ///
    /// The child keeps the parent's deadline if that one is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> (Context, Canceller) {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        self.derive(Some(deadline))
    }

    /// Derive a child context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> (Context, Canceller) {
        self.with_deadline(Instant::now() + timeout)
    }

    fn derive(&self, deadline: Option<Instant>) -> (Context, Canceller) {
        let token = self.token.child_token();
        let ctx = Context {
            token: token.clone(),
            deadline,
            workers: self.workers.clone(),
        };
        (ctx, Canceller { token })
    }

    /// The deadline after which this context counts as done, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Check whether the context has been cancelled or has expired
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context is cancelled or its deadline passes.
    ///
    /// Resolves immediately if that already happened, yielding the cause.
    pub async fn done(&self) -> Error {
        if let Some(err) = self.err() {
            return err;
        }
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Error::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Error::Cancelled
            }
        }
    }

    /// Spawn a worker task tracked by this context tree.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Workers are joined through the tracker, not the handle.
        drop(self.workers.spawn(worker));
    }

    /// Number of workers spawned through this context tree that are still running
    pub fn active_workers(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker spawned through this context tree to exit.
    ///
    /// Workers spawned after this call are still waited for.
    pub async fn join_workers(&self) {
        self.workers.close();
        self.workers.wait().await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Fires the cancellation signal of the context it was created with.
#[derive(Clone, Debug)]
pub struct Canceller {
    token: CancellationToken,
}

impl Canceller {
    /// Cancel the context and every context derived from it
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("context cancelled");
        }
        self.token.cancel();
    }

    /// Check whether this canceller has already fired
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Turn the canceller into a guard that cancels when dropped
    pub fn drop_guard(self) -> DropGuard {
        self.token.drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_is_never_done() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.deadline(), None);

        let waited = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_children() {
        let (parent, canceller) = Context::background().with_cancel();
        let (child, _child_canceller) = parent.with_cancel();

        canceller.cancel();
        assert!(canceller.is_cancelled());
        assert_eq!(parent.err(), Some(Error::Cancelled));
        assert_eq!(child.done().await, Error::Cancelled);
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent_alive() {
        let (parent, _canceller) = Context::background().with_cancel();
        let (child, child_canceller) = parent.with_cancel();

        child_canceller.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());
    }

    #[tokio::test]
    async fn test_timeout_expires() {
        let (ctx, _canceller) = Context::background().with_timeout(Duration::from_millis(10));
        assert_eq!(ctx.done().await, Error::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_child_keeps_earlier_deadline() {
        let (parent, _p) = Context::background().with_timeout(Duration::from_millis(10));
        let (child, _c) = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_drop_guard_cancels() {
        let (ctx, canceller) = Context::background().with_cancel();
        {
            let _guard = canceller.drop_guard();
        }
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_join_workers_waits_for_spawned_tasks() {
        let ctx = Context::background();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        ctx.spawn(async move {
            let _ = rx.await;
        });
        assert_eq!(ctx.active_workers(), 1);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), ctx.join_workers())
            .await
            .unwrap();
        assert_eq!(ctx.active_workers(), 0);
    }
}
