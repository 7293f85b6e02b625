//! Filters: combinators that forward a subset of a stream.
//!
//! [`skip`] with no predicate and [`skip_n`] with `n == 0` hand the input back
//! untouched instead of spawning a passthrough worker.

use crate::context::Context;
use crate::stream::{channel, Stream, HANDOFF};

/// Plain function pointer form of a [`skip`] predicate.
///
/// Handy for spelling out `None::<Predicate<T>>`.
pub type Predicate<T> = fn(&Context, &T) -> bool;

/// Emit the first value of `stream`, then close.
///
/// The output closes empty if the input closes empty or the context is done
/// first. The rest of the input is not drained: `stream` is dropped as soon as
/// its first value arrives, which releases the producer behind it.
pub fn first<T>(ctx: &Context, mut stream: Stream<T>) -> Stream<T>
where
    T: Send + 'static,
{
    let (tx, out) = channel(1);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        let Some(value) = stream.recv(&worker_ctx).await else {
            return;
        };
        drop(stream);
        if let Err(err) = tx.send(&worker_ctx, value).await {
            tracing::trace!(%err, "first stopped");
        }
    });
    out
}

/// Forward every value for which `predicate` returns `false`.
///
/// With no predicate the input stream itself is returned.
///
/// # Examples
///
/// ```rust
/// use conduit::{from, skip, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let odds = skip(&ctx, from(&ctx, [1, 2, 3, 4, 5]), Some(|_: &Context, v: &i32| v % 2 == 0));
/// assert_eq!(odds.into_vec(&ctx).await, vec![1, 3, 5]);
/// # }
/// ```
pub fn skip<T, P>(ctx: &Context, mut stream: Stream<T>, predicate: Option<P>) -> Stream<T>
where
    T: Send + 'static,
    P: FnMut(&Context, &T) -> bool + Send + 'static,
{
    let Some(mut predicate) = predicate else {
        return stream;
    };
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        while let Some(value) = stream.recv(&worker_ctx).await {
            if predicate(&worker_ctx, &value) {
                continue;
            }
            if let Err(err) = tx.send(&worker_ctx, value).await {
                tracing::trace!(%err, "skip stopped");
                return;
            }
        }
    });
    out
}

/// Discard the first `n` values, then forward the rest.
///
/// With `n == 0` the input stream itself is returned.
pub fn skip_n<T>(ctx: &Context, mut stream: Stream<T>, n: usize) -> Stream<T>
where
    T: Send + 'static,
{
    if n == 0 {
        return stream;
    }
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        for _ in 0..n {
            if stream.recv(&worker_ctx).await.is_none() {
                return;
            }
        }
        if let Err(err) = stream.forward(&worker_ctx, &tx).await {
            tracing::trace!(%err, "skip_n stopped");
        }
    });
    out
}

/// Forward at most `n` values, then close.
///
/// `n == 0` gives back an already-closed stream, and `n == 1` is [`first`].
/// The input is dropped as soon as its `n`th value arrives, so an endless
/// producer upstream stops there too.
///
/// # Examples
///
/// ```rust
/// use conduit::{from, take, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let head = take(&ctx, from(&ctx, [1, 2, 3, 4, 5]), 3);
/// assert_eq!(head.into_vec(&ctx).await, vec![1, 2, 3]);
/// # }
/// ```
pub fn take<T>(ctx: &Context, mut stream: Stream<T>, n: usize) -> Stream<T>
where
    T: Send + 'static,
{
    match n {
        // Mirrors a zero timeout firing straight away.
        0 => return Stream::closed(),
        1 => return first(ctx, stream),
        _ => {}
    }
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        for _ in 1..n {
            let Some(value) = stream.recv(&worker_ctx).await else {
                return;
            };
            if let Err(err) = tx.send(&worker_ctx, value).await {
                tracing::trace!(%err, "take stopped");
                return;
            }
        }
        let Some(last) = stream.recv(&worker_ctx).await else {
            return;
        };
        drop(stream);
        if let Err(err) = tx.send(&worker_ctx, last).await {
            tracing::trace!(%err, "take stopped");
        }
    });
    out
}
