//! # Cancellation-aware channel pipelines for tokio
//!
//! This crate builds concurrent stream-processing pipelines out of a single
//! primitive: a closable channel of typed values, fed by a worker task and
//! consumed downstream, with a shared [`Context`] cancelling every blocking
//! send and receive along the way.
//!
//! ## Core Concepts
//!
//! - **Stream**: the receiving end of a channel, closed exactly once by the
//!   worker that produces it
//! - **Context**: a cancellation signal with an optional deadline, threaded
//!   through every combinator
//! - **Producers**: [`from`], [`from_iter`], [`from_pairs`], [`from_stream`],
//!   [`repeat`], [`chan_chan`], [`fan_out`]
//! - **Transformer**: [`map`]
//! - **Filters**: [`first`], [`skip`], [`skip_n`], [`take`]
//! - **Pipeline shapers**: [`fan_in`], [`bridge`], [`or_done`], [`tee`]
//!
//! Every worker exits when its input closes, when the context is done, or when
//! its output is dropped, so a pipeline never leaks tasks.
//!
//! ## Example
//!
//! ```rust
//! use conduit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::background();
//!
//!     let mut next = 0;
//!     let numbers = repeat(&ctx, move |_| {
//!         next += 1;
//!         async move { next }
//!     });
//!     let odds = skip(&ctx, numbers, Some(|_: &Context, v: &i32| v % 2 == 0));
//!     let labels = map(&ctx, odds, |_, v| async move { format!("odd: {v}") });
//!
//!     let head = take(&ctx, labels, 3).into_vec(&ctx).await;
//!     assert_eq!(head, vec!["odd: 1", "odd: 3", "odd: 5"]);
//! }
//! ```

pub mod context;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod producers;
pub mod stream;
pub mod transformers;

// Re-export commonly used items
pub mod prelude {
    pub use crate::context::{Canceller, Context};
    pub use crate::error::{Error, Result};
    pub use crate::filters::{first, skip, skip_n, take, Predicate};
    pub use crate::pipeline::{bridge, fan_in, or_done, tee};
    pub use crate::producers::{chan_chan, fan_out, from, from_iter, from_pairs, from_stream, repeat};
    pub use crate::stream::{channel, Sender, Stream};
    pub use crate::transformers::map;
}

pub use context::{Canceller, Context};
pub use error::{Error, Result};
pub use filters::{first, skip, skip_n, take, Predicate};
pub use pipeline::{bridge, fan_in, or_done, tee};
pub use producers::{chan_chan, fan_out, from, from_iter, from_pairs, from_stream, repeat};
pub use stream::{channel, Sender, Stream};
pub use transformers::map;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
