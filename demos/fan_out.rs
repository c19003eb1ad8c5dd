//! # Example: fan_out
//!
//! Delivers a few events to a mixed set of subscribers and prints each round's result.
//!
//! Shows how to:
//! - Register closures with [`SubscriberFn`].
//! - Bound a round's concurrency and per-call time with [`NotifyConfig`].
//! - Attach the built-in [`LogWriter`] observer.
//!
//! ## Flow
//! ```text
//! notify(event)
//!     ├─► Registry::snapshot()
//!     ├─► Round: acquire permit ─► Invoker::call (per subscriber)
//!     │     └─► publish(RoundStarted / SubscriberFailed / TimeoutHit / ...)
//!     └─► AggregateResult ──► println!
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example fan_out --features logging
//! ```

use std::{sync::Arc, time::Duration};

use notivisor::{Config, Dispatcher, LogWriter, NotifyConfig, SubscriberError, SubscriberFn};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct OrderPlaced {
    id: u32,
    amount_cents: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = Config::default();
    cfg.max_concurrent = 4;
    cfg.call_timeout = Duration::from_millis(200);

    let dispatcher: Dispatcher<OrderPlaced> = Dispatcher::builder(cfg)
        .with_observer(Arc::new(LogWriter::new()))
        .build();

    dispatcher.register(SubscriberFn::arc(
        "audit",
        |ev: Arc<OrderPlaced>, _ctx: CancellationToken| async move {
            println!("[audit] order #{} ({} cents)", ev.id, ev.amount_cents);
            Ok::<_, SubscriberError>(())
        },
    ));

    dispatcher.register(SubscriberFn::arc(
        "fraud-check",
        |ev: Arc<OrderPlaced>, _ctx: CancellationToken| async move {
            if ev.amount_cents > 100_000 {
                return Err(SubscriberError::fail(format!("order #{} flagged", ev.id)));
            }
            Ok(())
        },
    ));

    dispatcher.register(SubscriberFn::arc(
        "warehouse",
        |ev: Arc<OrderPlaced>, ctx: CancellationToken| async move {
            // Simulates a slow downstream that only answers for small orders.
            let delay = Duration::from_millis(ev.amount_cents / 100);
            tokio::select! {
                _ = tokio::time::sleep(delay) => Ok(()),
                _ = ctx.cancelled() => Err(SubscriberError::fail("cancelled")),
            }
        },
    ));

    let orders = [
        OrderPlaced { id: 1, amount_cents: 1_500 },
        OrderPlaced { id: 2, amount_cents: 250_000 },
        OrderPlaced { id: 3, amount_cents: 9_900 },
    ];
    for order in orders {
        let id = order.id;
        let res = dispatcher.notify(order).await;
        println!("order #{id}: {res}");
        for (sub, outcome) in res.iter() {
            println!("  {sub}: {}", outcome.as_label());
        }
    }

    let strict = NotifyConfig::new()
        .with_concurrency_limit(1)
        .with_round_deadline(Duration::from_millis(50));
    let res = dispatcher
        .notify_with(OrderPlaced { id: 4, amount_cents: 20_000 }, &strict)
        .await;
    println!("order #4 (strict): {res} cancelled={:?}", res.cancelled);

    dispatcher.shutdown().await;
}
