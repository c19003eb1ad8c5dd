//! # Example: custom_observer
//!
//! Demonstrates how to build and attach a custom lifecycle observer.
//!
//! Shows how to:
//! - Implement the [`Observe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for per-round metrics.
//! - Cancel a background round through its [`RoundHandle`](notivisor::RoundHandle).
//!
//! ## Flow
//! ```text
//! spawn_notify(event) ──► RoundHandle
//!     ├─► Round publishes RoundStarted / SubscriberPanicked / RoundCancelled / ...
//!     ├─► observer listener ──► ObserverSet.emit_arc() ──► Tally.on_event()
//!     └─► handle.cancel() ──► unresolved calls become TimedOut
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_observer
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use notivisor::{
    Config, Dispatcher, Event, EventKind, Observe, SubscriberError, SubscriberFn,
};
use tokio_util::sync::CancellationToken;

/// Counts failures and timeouts; prints round boundaries.
#[derive(Default)]
struct Tally {
    failed: AtomicU64,
    timed_out: AtomicU64,
}

#[async_trait::async_trait]
impl Observe for Tally {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::RoundStarted => {
                println!(
                    "[obs] round {} started with {} subscribers",
                    ev.round.unwrap_or(0),
                    ev.count.unwrap_or(0)
                );
            }
            EventKind::SubscriberFailed | EventKind::SubscriberPanicked => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                println!(
                    "[obs] {} failed: {}",
                    ev.name.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::TimeoutHit => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::RoundCancelled => {
                println!(
                    "[obs] round {} cancelled ({})",
                    ev.round.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::RoundCompleted => {
                println!(
                    "[obs] round {} completed: {}",
                    ev.round.unwrap_or(0),
                    ev.reason.as_deref().unwrap_or("")
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

#[tokio::main]
async fn main() {
    let tally = Arc::new(Tally::default());
    let dispatcher: Dispatcher<u64> = Dispatcher::builder(Config::default())
        .with_observer(tally.clone())
        .build();

    dispatcher.register(SubscriberFn::arc(
        "fast",
        |_ev: Arc<u64>, _ctx: CancellationToken| async { Ok::<_, SubscriberError>(()) },
    ));
    dispatcher.register(SubscriberFn::arc(
        "flaky",
        |ev: Arc<u64>, _ctx: CancellationToken| async move {
            if *ev % 2 == 0 {
                panic!("even events are not supported");
            }
            Ok::<_, SubscriberError>(())
        },
    ));
    dispatcher.register(SubscriberFn::arc(
        "sluggish",
        |_ev: Arc<u64>, ctx: CancellationToken| async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(()),
                _ = ctx.cancelled() => Err(SubscriberError::fail("cancelled")),
            }
        },
    ));

    let handle = dispatcher.spawn_notify(2u64);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();
    let res = handle.join().await;
    println!("round result: {res} cancelled={:?}", res.cancelled);

    dispatcher.shutdown().await;
    println!(
        "totals: failed={} timed_out={}",
        tally.failed.load(Ordering::Relaxed),
        tally.timed_out.load(Ordering::Relaxed)
    );
}
