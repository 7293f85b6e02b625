//! Transformers: per-element mapping.

use std::future::Future;

use crate::context::Context;
use crate::stream::{channel, Stream, HANDOFF};

/// Apply `f` to every value of `stream`, one-to-one and in order.
///
/// If the context is done while a result is being delivered, that result is
/// dropped and the output closes; `f` may already have run for it.
///
/// # Examples
///
/// ```rust
/// use conduit::{from, map, Context};
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = Context::background();
/// let labels = map(&ctx, from(&ctx, [1, 2]), |_, v| async move { format!("num:{v}") });
/// assert_eq!(labels.into_vec(&ctx).await, vec!["num:1", "num:2"]);
/// # }
/// ```
pub fn map<T, U, F, Fut>(ctx: &Context, mut stream: Stream<T>, mut f: F) -> Stream<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(Context, T) -> Fut + Send + 'static,
    Fut: Future<Output = U> + Send + 'static,
{
    let (tx, out) = channel(HANDOFF);
    let worker_ctx = ctx.clone();
    ctx.spawn(async move {
        while let Some(value) = stream.recv(&worker_ctx).await {
            let mapped = f(worker_ctx.clone(), value).await;
            if let Err(err) = tx.send(&worker_ctx, mapped).await {
                tracing::trace!(%err, "map stopped");
                return;
            }
        }
    });
    out
}
