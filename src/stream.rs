//! The stream primitive every combinator is built on.
//!
//! A [`Stream`] is the receiving half of a bounded tokio channel and a
//! [`Sender`] is its producing half. The stream closes when the last sender is
//! dropped, so the worker owning the sender closes it exactly once simply by
//! returning. Both halves take a [`Context`] on every blocking operation so that
//! a cancelled pipeline can never wedge on a full or empty channel.

use std::fmt;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio::sync::{mpsc, Semaphore};

pub use tokio::sync::mpsc::Permit;

use crate::context::Context;
use crate::error::{Error, Result};

/// Buffer size used by the combinators, standing in for an unbuffered handoff.
pub(crate) const HANDOFF: usize = 1;

/// Create a stream and the sender that feeds it.
///
/// `capacity` is clamped to at least one slot and at most
/// [`Semaphore::MAX_PERMITS`], the largest buffer tokio accepts.
pub fn channel<T>(capacity: usize) -> (Sender<T>, Stream<T>) {
    let (tx, rx) = mpsc::channel(capacity.clamp(1, Semaphore::MAX_PERMITS));
    (Sender { tx }, Stream { rx })
}

/// An ordered, closable sequence of values produced by a worker task.
///
/// `Stream` implements [`futures_core::Stream`], so it can be consumed with
/// `futures::StreamExt` like any other async stream. Dropping it tells the
/// producer that nobody is listening any more.
pub struct Stream<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Stream<T> {
    /// Create a stream that is already closed
    pub fn closed() -> Self {
        let (_, stream) = channel(HANDOFF);
        stream
    }

    /// Receive the next value.
    ///
    /// Returns `None` once the stream is closed or `ctx` is done, whichever
    /// comes first. Cancellation is checked before the channel.
    pub async fn recv(&mut self, ctx: &Context) -> Option<T> {
        tokio::select! {
            biased;
            _ = ctx.done() => None,
            value = self.rx.recv() => value,
        }
    }

    /// Pump every value of this stream into `tx`.
    ///
    /// Returns `Ok(())` when this stream closes, or the error that stopped a
    /// receive or a send: cancellation of `ctx`, or `tx`'s receiver going away.
    pub async fn forward(&mut self, ctx: &Context, tx: &Sender<T>) -> Result<()> {
        loop {
            let value = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                value = self.rx.recv() => value,
            };
            match value {
                Some(value) => tx.send(ctx, value).await?,
                None => return Ok(()),
            }
        }
    }

    /// Drain the stream into a vector, stopping early if `ctx` is done
    pub async fn into_vec(mut self, ctx: &Context) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.recv(ctx).await {
            items.push(item);
        }
        items
    }

    /// Give back the underlying tokio receiver
    pub fn into_inner(self) -> mpsc::Receiver<T> {
        self.rx
    }
}

impl<T> From<mpsc::Receiver<T>> for Stream<T> {
    fn from(rx: mpsc::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T> futures_core::Stream for Stream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

/// The producing half of a [`Stream`].
pub struct Sender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Sender<T> {
    /// Send a value, waiting for buffer space.
    ///
    /// Fails with the context's cause if `ctx` is done first, or with
    /// [`Error::Disconnected`] if the stream has been dropped. The value is
    /// dropped in either case.
    pub async fn send(&self, ctx: &Context, value: T) -> Result<()> {
        tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            sent = self.tx.send(value) => sent.map_err(Error::from),
        }
    }

    /// Reserve a buffer slot before producing the value that will fill it.
    ///
    /// This lets a producer hold off expensive work until the stream can
    /// actually take the result.
    pub async fn reserve(&self, ctx: &Context) -> Result<Permit<'_, T>> {
        let permit = tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            permit = self.tx.reserve() => permit.map_err(|_| Error::Disconnected)?,
        };
        // A slot freed by the receiver's last recv may be granted after it hung up.
        if self.tx.is_closed() {
            return Err(Error::Disconnected);
        }
        Ok(permit)
    }

    /// Check whether the receiving stream has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
