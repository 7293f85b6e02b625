//! Producers: combinators that start a pipeline.
//!
//! Every producer except [`fan_out`] spawns one worker task that owns the
//! output's [`Sender`](crate::stream::Sender) and closes the stream by
//! returning.

use std::future::Future;
use std::sync::Arc;
use tokio_stream::StreamExt;

use crate::context::Context;
use crate::stream::{channel, Stream, HANDOFF};

/// Emit the given values in order, then close.
///
/// # Examples
///
/// ```rust
/// use conduit::{from, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let values = from(&ctx, [7, 8, 9]).into_vec(&ctx).await;
/// assert_eq!(values, vec![7, 8, 9]);
/// # }
/// ```
pub fn from<T, V>(ctx: &Context, values: V) -> Stream<T>
where
    T: Send + 'static,
    V: Into<Vec<T>>,
{
    from_iter(ctx, values.into())
}

/// Emit values pulled lazily from an iterator, then close.
///
/// The iterator is advanced inside the worker, one value per send, so an
/// infinite iterator is fine as long as something bounds the stream downstream.
pub fn from_iter<I>(ctx: &Context, iter: I) -> Stream<I::Item>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let iter = iter.into_iter();
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        for value in iter {
            if let Err(err) = tx.send(&worker_ctx, value).await {
                tracing::trace!(%err, "from_iter stopped");
                return;
            }
        }
    });
    out
}

/// Emit the values of a key/value iterator, dropping the keys.
pub fn from_pairs<I, K, V>(ctx: &Context, iter: I) -> Stream<V>
where
    I: IntoIterator<Item = (K, V)>,
    I::IntoIter: Send + 'static,
    K: Send,
    V: Send + 'static,
{
    let iter = iter.into_iter();
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        for (_, value) in iter {
            if let Err(err) = tx.send(&worker_ctx, value).await {
                tracing::trace!(%err, "from_pairs stopped");
                return;
            }
        }
    });
    out
}

/// Emit the items of an async stream, then close.
///
/// Each poll of `source` races the context, so a source that stalls cannot keep
/// the worker alive past cancellation.
pub fn from_stream<S>(ctx: &Context, source: S) -> Stream<S::Item>
where
    S: futures_core::Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        tokio::pin!(source);
        loop {
            let next = tokio::select! {
                biased;
                _ = worker_ctx.done() => return,
                next = source.next() => next,
            };
            let Some(value) = next else { return };
            if tx.send(&worker_ctx, value).await.is_err() {
                return;
            }
        }
    });
    out
}

/// Emit `f(ctx)` forever, until the context is done or the stream is dropped.
///
/// A slot downstream is reserved before each call, so `f` only runs when its
/// result can be delivered. Bound the stream with [`take`](crate::take) or a
/// cancellable context, otherwise it never closes.
///
/// Under `take(n)` on a current-thread runtime `f` runs exactly `n` times. On a
/// multi-thread runtime the slot freed by the `n`th receive can wake this
/// worker before `take` drops its input, so one extra call may run; its result
/// is discarded.
///
/// # Examples
///
/// ```rust
/// use conduit::{repeat, take, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let answers = take(&ctx, repeat(&ctx, |_| async { 42 }), 3);
/// assert_eq!(answers.into_vec(&ctx).await, vec![42, 42, 42]);
/// # }
/// ```
pub fn repeat<T, F, Fut>(ctx: &Context, mut f: F) -> Stream<T>
where
    T: Send + 'static,
    F: FnMut(Context) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        loop {
            let permit = match tx.reserve(&worker_ctx).await {
                Ok(permit) => permit,
                Err(err) => {
                    tracing::trace!(%err, "repeat stopped");
                    return;
                }
            };
            let value = f(worker_ctx.clone()).await;
            if worker_ctx.is_done() {
                return;
            }
            permit.send(value);
        }
    });
    out
}

/// Produce a stream of `n` one-shot streams, the `index`th carrying
/// `f(ctx, index)`.
///
/// Each value is computed by its own worker, so the calls run concurrently
/// while [`bridge`](crate::bridge) still reads them back in index order. The
/// outer stream buffers up to `n` inner streams, capped at tokio's channel
/// limit. An inner stream closes empty if the context is done before its value
/// is delivered.
pub fn chan_chan<T, F, Fut>(ctx: &Context, n: usize, f: F) -> Stream<Stream<T>>
where
    T: Send + 'static,
    F: Fn(Context, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let (tx, out) = channel(n);
    let f = Arc::new(f);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        for index in 0..n {
            let (inner_tx, inner) = channel(1);
            let f = Arc::clone(&f);
            let value_ctx = worker_ctx.clone();
            worker_ctx.spawn(async move {
                if value_ctx.is_done() {
                    return;
                }
                let value = f(value_ctx.clone(), index).await;
                if let Err(err) = inner_tx.send(&value_ctx, value).await {
                    tracing::trace!(%err, index, "chan_chan value dropped");
                }
            });
            if let Err(err) = tx.send(&worker_ctx, inner).await {
                tracing::trace!(%err, index, "chan_chan stopped");
                return;
            }
        }
    });
    out
}

/// Build `n` streams by calling `f(ctx, index)` for each index, in order.
///
/// Runs synchronously on the caller's task; the returned vector's `i`th
/// stream is exactly `f(ctx, i)`. Pair with [`fan_in`](crate::fan_in) to merge
/// them back.
pub fn fan_out<T, F>(ctx: &Context, n: usize, mut f: F) -> Vec<Stream<T>>
where
    F: FnMut(&Context, usize) -> Stream<T>,
{
    (0..n).map(|index| f(ctx, index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::take;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_from() {
        let ctx = Context::background();
        let values = from(&ctx, vec![1, 2, 3]).into_vec(&ctx).await;
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_from_empty() {
        let ctx = Context::background();
        let values = from(&ctx, Vec::<i32>::new()).into_vec(&ctx).await;
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_from_iter_is_lazy() {
        let ctx = Context::background();
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let naturals = (0..).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let values = take(&ctx, from_iter(&ctx, naturals), 3).into_vec(&ctx).await;
        assert_eq!(values, vec![0, 1, 2]);

        ctx.join_workers().await;
        // One value may sit in the handoff buffer and one more in a pending send.
        assert!(pulled.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_from_pairs_emits_values() {
        let ctx = Context::background();
        let pairs = vec![("a", 1), ("b", 2), ("c", 3)];
        let values = from_pairs(&ctx, pairs).into_vec(&ctx).await;
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_from_pairs_with_map_iterator() {
        let ctx = Context::background();
        let map: HashMap<&str, i32> = [("only", 9)].into_iter().collect();
        let values = from_pairs(&ctx, map).into_vec(&ctx).await;
        assert_eq!(values, vec![9]);
    }

    #[tokio::test]
    async fn test_from_stream() {
        let ctx = Context::background();
        let source = tokio_stream::iter(vec!["x", "y"]);
        let values = from_stream(&ctx, source).into_vec(&ctx).await;
        assert_eq!(values, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_from_stream_stops_on_pending_source() {
        let (ctx, canceller) = Context::background().with_cancel();
        let out = from_stream(&ctx, tokio_stream::pending::<i32>());

        canceller.cancel();
        assert!(out.into_vec(&Context::background()).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_calls_once_per_value() {
        let ctx = Context::background();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let stream = repeat(&ctx, move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { n }
        });

        let values = take(&ctx, stream, 4).into_vec(&ctx).await;
        assert_eq!(values, vec![0, 1, 2, 3]);

        ctx.join_workers().await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_chan_chan_inner_streams() {
        let ctx = Context::background();
        let mut outer = chan_chan(&ctx, 2, |_, i| async move { i * 100 });

        let mut values = Vec::new();
        while let Some(inner) = outer.recv(&ctx).await {
            values.extend(inner.into_vec(&ctx).await);
        }
        assert_eq!(values, vec![0, 100]);
    }

    #[tokio::test]
    async fn test_chan_chan_inner_closes_empty_on_cancel() {
        let (ctx, canceller) = Context::background().with_cancel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        let mut outer = chan_chan(&ctx, 1, move |_, i| {
            let release = Arc::clone(&release);
            async move {
                let rx = release.lock().await.take();
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                i
            }
        });

        let reader = Context::background();
        let inner = outer.recv(&reader).await.unwrap();
        canceller.cancel();
        drop(release_tx);

        assert!(inner.into_vec(&reader).await.is_empty());
        tokio::time::timeout(Duration::from_secs(2), ctx.join_workers())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_chan_chan_zero() {
        let ctx = Context::background();
        let outer = chan_chan(&ctx, 0, |_, i| async move { i });
        assert!(outer.into_vec(&ctx).await.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_keeps_index_order() {
        let ctx = Context::background();
        let streams = fan_out(&ctx, 2, |ctx, i| from(ctx, [i, i + 10]));
        assert_eq!(streams.len(), 2);

        let mut per_stream = Vec::new();
        for stream in streams {
            per_stream.push(stream.into_vec(&ctx).await);
        }
        assert_eq!(per_stream, vec![vec![0, 10], vec![1, 11]]);
    }
}
