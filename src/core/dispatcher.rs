//! # Dispatcher: owns the registry and runs notification rounds.
//!
//! The [`Dispatcher`] owns the event bus, the subscriber [`Registry`], the
//! dispatcher-wide [`Limiter`] and a runtime cancellation token. Every call to
//! [`notify`](Dispatcher::notify) snapshots the registry and drives one round.
//!
//! ## High-level architecture
//! ```text
//! caller ──► notify(event) ──► Registry::snapshot()
//!                                   │
//!                           Round (child of runtime token)
//!                                   │  for each (id, sub):
//!                                   ├─► Limiter::acquire
//!                                   └─► Invoker::call ──► tokio::spawn(sub.update)
//!                                   │
//!                           AggregateResult { id → Outcome }
//!
//! Lifecycle events:
//!   Registry / Invoker / Round ── publish ──► Bus ──► observer listener ──► ObserverSet
//! ```
//!
//! ## Rules
//! - `notify` never fails and never panics because of a subscriber.
//! - Subscribers registered after the snapshot are not part of the round;
//!   subscribers removed after it are still attempted.
//! - No retries: callers inspect the [`AggregateResult`] and decide.
//! - `shutdown` cancels every in-flight round (unresolved calls become
//!   `TimedOut`), stops granting permits and waits for those rounds to
//!   publish their final events before the observers stop.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use notivisor::{Config, Dispatcher, NotifyConfig, Outcome, SubscriberError, SubscriberFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let dispatcher: Dispatcher<String> = Dispatcher::new(Config::default());
//!
//!     let id = dispatcher.register(SubscriberFn::arc("printer", |ev: Arc<String>, _ctx: CancellationToken| async move {
//!         println!("got {ev}");
//!         Ok::<_, SubscriberError>(())
//!     }));
//!
//!     let cfg = NotifyConfig::new().with_call_timeout(Duration::from_millis(100));
//!     let res = dispatcher.notify_with("hello".to_string(), &cfg).await;
//!     assert_eq!(res.get(id), Some(&Outcome::Delivered));
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{Config, NotifyConfig};
use crate::core::builder::DispatcherBuilder;
use crate::core::limiter::Limiter;
use crate::core::outcome::{AggregateResult, CancelReason, Outcome};
use crate::core::registry::Registry;
use crate::core::round::Round;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{SubscriberId, SubscriberRef};

/// Concurrent fan-out notification dispatcher for events of type `E`.
pub struct Dispatcher<E> {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry<E>>,
    limiter: Limiter,
    runtime_token: CancellationToken,
    rounds: TaskTracker,
    next_round: AtomicU64,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<E> Dispatcher<E>
where
    E: Send + Sync + 'static,
{
    /// Creates a dispatcher without observers.
    ///
    /// Does not spawn anything, so it can be built outside a tokio runtime.
    pub fn new(cfg: Config) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::new_internal(cfg, bus, CancellationToken::new(), None)
    }

    /// Returns a builder (use it to attach observers).
    pub fn builder(cfg: Config) -> DispatcherBuilder<E> {
        DispatcherBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        listener_token: CancellationToken,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            registry: Arc::new(Registry::new(bus.clone())),
            limiter: Limiter::new(cfg.concurrency_limit()),
            runtime_token: CancellationToken::new(),
            rounds: TaskTracker::new(),
            next_round: AtomicU64::new(1),
            listener_token,
            listener: Mutex::new(listener),
            bus,
            cfg,
        }
    }

    /// Registers a subscriber; see [`Registry::register`].
    pub fn register(&self, subscriber: SubscriberRef<E>) -> SubscriberId {
        self.registry.register(subscriber)
    }

    /// Registers a subscriber; see [`Registry::try_register`].
    pub fn try_register(&self, subscriber: SubscriberRef<E>) -> Result<SubscriberId, RuntimeError> {
        self.registry.try_register(subscriber)
    }

    /// Removes a subscriber (idempotent); see [`Registry::unregister`].
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.registry.unregister(id)
    }

    /// The registry owned by this dispatcher.
    pub fn registry(&self) -> &Arc<Registry<E>> {
        &self.registry
    }

    /// Dispatcher-wide configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Raw receiver of lifecycle events (in addition to observers).
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Delivers `event` to every registered subscriber using the dispatcher defaults.
    ///
    /// Returns once the round is complete: every call resolved, or the round
    /// deadline expired.
    pub async fn notify(&self, event: impl Into<Arc<E>>) -> AggregateResult {
        self.notify_with(event, &NotifyConfig::default()).await
    }

    /// Delivers `event` with per-round overrides.
    pub async fn notify_with(&self, event: impl Into<Arc<E>>, cfg: &NotifyConfig) -> AggregateResult {
        let _tracked = self.rounds.token();
        let (round, snapshot) = self.prepare(cfg, self.runtime_token.child_token());
        round.run(snapshot, event.into()).await
    }

    /// Starts a round in the background and returns a handle to it.
    ///
    /// The snapshot is taken before this returns, so subscribers registered
    /// afterwards are not part of the round. Requires a tokio runtime.
    pub fn spawn_notify(&self, event: impl Into<Arc<E>>) -> RoundHandle {
        self.spawn_notify_with(event, &NotifyConfig::default())
    }

    /// Background variant of [`notify_with`](Self::notify_with).
    pub fn spawn_notify_with(&self, event: impl Into<Arc<E>>, cfg: &NotifyConfig) -> RoundHandle {
        let token = self.runtime_token.child_token();
        let (round, snapshot) = self.prepare(cfg, token.clone());
        let ids = snapshot.iter().map(|(id, _)| *id).collect();
        let event = event.into();
        let join = self.rounds.spawn(round.run(snapshot, event));
        RoundHandle { token, join, ids }
    }

    /// Cancels in-flight rounds, refuses new permits and stops observer workers.
    ///
    /// Waits for the cancelled rounds to finish (they stop waiting at once),
    /// so observers still receive their `RoundCancelled` and `RoundCompleted`.
    /// Rounds started after shutdown complete at once with every subscriber
    /// `TimedOut` and [`CancelReason::Cancelled`].
    pub async fn shutdown(&self) {
        if self.runtime_token.is_cancelled() {
            return;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();
        self.limiter.close();

        self.rounds.close();
        self.rounds.wait().await;
        tracing::debug!("in-flight rounds finished, stopping observers");
        self.listener_token.cancel();

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
    }

    /// True once [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Started phase: allocate a round number and take the snapshot.
    fn prepare(
        &self,
        cfg: &NotifyConfig,
        token: CancellationToken,
    ) -> (Round, Vec<(SubscriberId, SubscriberRef<E>)>) {
        let id = self.next_round.fetch_add(1, AtomicOrdering::Relaxed);
        let round = Round::new(
            id,
            self.bus.clone(),
            self.limiter.clone(),
            cfg.resolve(&self.cfg),
            token,
        );
        (round, self.registry.snapshot())
    }
}

/// Handle to a round started with [`Dispatcher::spawn_notify`].
///
/// Dropping the handle does not cancel the round.
#[derive(Debug)]
pub struct RoundHandle {
    token: CancellationToken,
    join: JoinHandle<AggregateResult>,
    ids: Vec<SubscriberId>,
}

impl RoundHandle {
    /// Cancels the round; unresolved subscribers are recorded as `TimedOut`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the round has completed.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Subscribers included in the round's snapshot.
    pub fn subscribers(&self) -> &[SubscriberId] {
        &self.ids
    }

    /// Waits for the round to complete.
    ///
    /// If the round task itself was aborted (runtime shutdown), every
    /// subscriber is reported `TimedOut`.
    pub async fn join(self) -> AggregateResult {
        match self.join.await {
            Ok(res) => res,
            Err(_join_err) => AggregateResult {
                outcomes: self.ids.into_iter().map(|id| (id, Outcome::TimedOut)).collect(),
                cancelled: Some(CancelReason::Cancelled),
                ..AggregateResult::default()
            },
        }
    }
}
