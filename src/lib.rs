//! # notivisor
//!
//! **Notivisor** is a concurrent fan-out notification dispatcher for async Rust.
//!
//! Subscribers register with a [`Dispatcher`]; each [`notify`](Dispatcher::notify)
//! call delivers one event to every subscriber registered at that moment, runs
//! the calls concurrently under a bound, and returns one [`Outcome`] per
//! subscriber. A slow, failing or panicking subscriber never affects its
//! siblings or the caller.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Subscriber  │   │  Subscriber  │   │  Subscriber  │
//!     │   (sub-0)    │   │   (sub-1)    │   │   (sub-2)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ register         ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - Registry (id → subscriber, snapshot per round)                 │
//! │  - Limiter  (dispatcher-wide concurrency bound)                   │
//! │  - Bus      (broadcast lifecycle events)                          │
//! │  - runtime token (shutdown cancels every round)                   │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ notify(event)
//!        ▼
//!     ┌──────────────────────────────────────────────┐
//!     │  Round                                       │
//!     │  snapshot ─► acquire permit ─► Invoker::call │──► AggregateResult
//!     │  (deadline / cancel abandons the remainder)  │
//!     └──────┬───────────────────────────────────────┘
//!            │ Publishes: RoundStarted, SubscriberFailed,
//!            │ SubscriberPanicked, TimeoutHit, RoundCancelled, RoundCompleted
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │   observer listener    │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                              ObserverSet
//!                            (per-observer queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Round lifecycle
//! ```text
//! notify(event)
//!   ├─► snapshot = registry.snapshot()       (later changes do not apply)
//!   ├─► publish RoundStarted{ round, count }
//!   ├─► for each (id, sub) in snapshot:
//!   │     ├─ acquire permit (cancellable by deadline / shutdown)
//!   │     └─ spawn Invoker::call ─► Delivered | Failed | TimedOut
//!   ├─► await all calls (or deadline / cancel)
//!   │     └─ unresolved or never dispatched ─► TimedOut
//!   └─► publish RoundCompleted, return AggregateResult
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Subscribers**   | Async, cancellable event handlers.                             | [`Subscriber`], [`SubscriberFn`]            |
//! | **Dispatch**      | Bounded concurrent fan-out with per-call timeouts.             | [`Dispatcher`], [`RoundHandle`]             |
//! | **Results**       | One outcome per subscriber per round.                          | [`Outcome`], [`AggregateResult`]            |
//! | **Observers**     | Hook into dispatcher lifecycle events (logging, metrics).      | [`Observe`], [`ObserverSet`]                |
//! | **Errors**        | Typed errors for subscribers and the runtime.                  | [`SubscriberError`], [`RuntimeError`]       |
//! | **Configuration** | Dispatcher defaults and per-round overrides.                   | [`Config`], [`NotifyConfig`]                |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] observer backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use notivisor::{Config, Dispatcher, NotifyConfig, SubscriberError, SubscriberFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut cfg = Config::default();
//!     cfg.call_timeout = Duration::from_secs(1);
//!
//!     let dispatcher: Dispatcher<String> = Dispatcher::builder(cfg).build();
//!
//!     dispatcher.register(SubscriberFn::arc("audit", |ev: Arc<String>, _ctx: CancellationToken| async move {
//!         println!("audit: {ev}");
//!         Ok::<_, SubscriberError>(())
//!     }));
//!     dispatcher.register(SubscriberFn::arc("mailer", |_ev: Arc<String>, ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() {
//!             return Err(SubscriberError::fail("cancelled"));
//!         }
//!         Ok(())
//!     }));
//!
//!     let round = NotifyConfig::new().with_concurrency_limit(1);
//!     let res = dispatcher.notify_with("user.created".to_string(), &round).await;
//!     println!("{res}");
//!
//!     dispatcher.shutdown().await;
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod observers;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, NotifyConfig};
pub use core::{
    AggregateResult, CancelReason, Dispatcher, DispatcherBuilder, Invoker, Limiter, Outcome, Permit,
    Registry, RoundHandle,
};
pub use error::{AcquireError, RuntimeError, SubscriberError};
pub use events::{Bus, Event, EventKind};
pub use observers::{Observe, ObserverSet};
pub use subscribers::{Subscriber, SubscriberFn, SubscriberId, SubscriberRef};

// Optional: expose a built-in tracing logger observer.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
