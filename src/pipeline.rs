//! Pipeline shapers: merging, splitting and flattening streams.
//!
//! These are the combinators that change the shape of a pipeline rather than
//! its values. [`fan_in`] is the one place where ordering across sources is
//! given up; [`bridge`] restores it for a stream of streams.

use tokio_util::task::TaskTracker;

use crate::context::Context;
use crate::error::Result;
use crate::stream::{channel, Sender, Stream, HANDOFF};

/// Merge any number of streams into one.
///
/// One forwarding worker runs per input. Values from the same input keep their
/// relative order; values from different inputs interleave arbitrarily. The
/// output closes once every forwarder has finished, so merging nothing yields
/// a closed stream.
///
/// # Examples
///
/// ```rust
/// use conduit::{fan_in, fan_out, from, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let streams = fan_out(&ctx, 3, |ctx, i| from(ctx, [i * 10; 2]));
/// let mut merged = fan_in(&ctx, streams).into_vec(&ctx).await;
/// merged.sort();
/// assert_eq!(merged, vec![0, 0, 10, 10, 20, 20]);
/// # }
/// ```
pub fn fan_in<T, I>(ctx: &Context, streams: I) -> Stream<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Stream<T>>,
{
    let (tx, out) = channel(HANDOFF);
    let barrier = TaskTracker::new();
    let mut sources = 0usize;
    for mut stream in streams {
        let tx = tx.clone();
        let worker_ctx = ctx.clone();
        ctx.spawn(barrier.track_future(async move {
            if let Err(err) = stream.forward(&worker_ctx, &tx).await {
                tracing::trace!(%err, "fan_in forwarder stopped");
            }
        }));
        sources += 1;
    }
    barrier.close();
    tracing::trace!(sources, "fan_in started");

    // The merged stream closes when this last sender goes.
    ctx.spawn(async move {
        barrier.wait().await;
        drop(tx);
    });
    out
}

/// Flatten a stream of streams, preserving both orders.
///
/// Inner streams are drained one at a time, in the order they arrive, so the
/// output is every value of the first inner stream, then the second, and so
/// on. Pair with [`chan_chan`](crate::chan_chan) for ordered concurrent work.
///
/// # Examples
///
/// ```rust
/// use conduit::{bridge, chan_chan, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let streams = chan_chan(&ctx, 3, |_, i| async move { i * 10 });
/// assert_eq!(bridge(&ctx, streams).into_vec(&ctx).await, vec![0, 10, 20]);
/// # }
/// ```
pub fn bridge<T>(ctx: &Context, mut streams: Stream<Stream<T>>) -> Stream<T>
where
    T: Send + 'static,
{
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        while let Some(mut inner) = streams.recv(&worker_ctx).await {
            if let Err(err) = inner.forward(&worker_ctx, &tx).await {
                tracing::trace!(%err, "bridge stopped");
                return;
            }
        }
    });
    out
}

/// Pass `stream` through until it closes or the context is done.
///
/// Use it to consume a stream you do not control without risking a wait that
/// outlives the pipeline.
pub fn or_done<T>(ctx: &Context, mut stream: Stream<T>) -> Stream<T>
where
    T: Send + 'static,
{
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        if let Err(err) = stream.forward(&worker_ctx, &tx).await {
            tracing::trace!(%err, "or_done stopped");
        }
    });
    out
}

/// Split `stream` into two streams that each see every value.
///
/// Each value is offered to both outputs at once and the source only advances
/// once both have taken it. Delivery is best effort under cancellation: if the
/// context fires after one output took a value but before the other did, only
/// the first ever sees it. Both outputs close together when the input closes or
/// the context is done. Dropping one output leaves the other running; dropping
/// both stops the worker.
pub fn tee<T>(ctx: &Context, mut stream: Stream<T>) -> (Stream<T>, Stream<T>)
where
    T: Clone + Send + 'static,
{
    let (tx1, out1) = channel(HANDOFF);
    let (tx2, out2) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        let mut outputs = [Some(tx1), Some(tx2)];
        while let Some(value) = stream.recv(&worker_ctx).await {
            let [left, right] = &outputs;
            let delivered = futures::future::join(
                deliver(&worker_ctx, left.as_ref(), value.clone()),
                deliver(&worker_ctx, right.as_ref(), value),
            )
            .await;

            for (output, result) in outputs.iter_mut().zip([delivered.0, delivered.1]) {
                match result {
                    Ok(()) => {}
                    Err(err) if err.is_cancellation() => {
                        tracing::trace!(%err, "tee stopped");
                        return;
                    }
                    Err(_) => *output = None,
                }
            }
            if outputs.iter().all(Option::is_none) {
                return;
            }
        }
    });
    (out1, out2)
}

async fn deliver<T>(ctx: &Context, tx: Option<&Sender<T>>, value: T) -> Result<()> {
    match tx {
        Some(tx) => tx.send(ctx, value).await,
        None => Ok(()),
    }
}
