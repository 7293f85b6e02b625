//! Pipeline walkthrough for conduit
//!
//! Run with: cargo run --example pipeline

use std::time::Duration;

use conduit::prelude::*;

/// Example 1: generate, filter, transform, truncate
async fn odd_labels_example() {
    println!("=== Odd Labels ===");

    let ctx = Context::background();
    let mut next = 0;
    let numbers = repeat(&ctx, move |_| {
        next += 1;
        async move { next }
    });
    let odds = skip(&ctx, numbers, Some(|_: &Context, v: &i32| v % 2 == 0));
    let labels = map(&ctx, odds, |_, v| async move { format!("odd: {v}") });
    let (left, right) = tee(&ctx, take(&ctx, labels, 5));

    let mut merged = fan_in(&ctx, [left, right]);
    while let Some(label) = merged.recv(&ctx).await {
        println!("{label}");
    }

    ctx.join_workers().await;
    println!();
}

/// Example 2: unordered fan-out against ordered chan_chan
async fn fan_out_vs_bridge_example() {
    println!("=== Fan-out vs Bridge ===");

    let ctx = Context::background();
    let slow_square = |_: Context, i: usize| async move {
        tokio::time::sleep(Duration::from_millis(((5 - i) * 10) as u64)).await;
        i * i
    };

    let streams = fan_out(&ctx, 5, |ctx, i| map(ctx, from(ctx, [i]), slow_square));
    println!("fan_in: {:?}", fan_in(&ctx, streams).into_vec(&ctx).await);

    let ordered = bridge(&ctx, chan_chan(&ctx, 5, slow_square));
    println!("bridge: {:?}", ordered.into_vec(&ctx).await);
    println!();
}

/// Example 3: a deadline stops an endless pipeline
async fn deadline_example() {
    println!("=== Deadline ===");

    let (ctx, _canceller) = Context::background().with_timeout(Duration::from_millis(50));
    let ticks = repeat(&ctx, |ctx| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.is_done()
    });
    let seen = ticks.into_vec(&ctx).await;
    println!("received {} ticks before: {:?}", seen.len(), ctx.err());
    println!();
}

#[tokio::main]
async fn main() {
    odd_labels_example().await;
    fan_out_vs_bridge_example().await;
    deadline_example().await;
}
