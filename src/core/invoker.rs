//! # Execute one subscriber call under isolation.
//!
//! The [`Invoker`] runs [`Subscriber::update`](crate::Subscriber::update) in its
//! own tokio task and turns whatever happens there into an [`Outcome`].
//!
//! ## Outcome mapping
//! ```text
//! spawn(update(event, child_token))
//!   ├─ Ok(())              ─► Delivered
//!   ├─ Err(e)              ─► Failed(e)                       + SubscriberFailed
//!   ├─ panic               ─► Failed(Panicked{info})          + SubscriberPanicked
//!   ├─ call timeout        ─► cancel child, detach ─► TimedOut + TimeoutHit
//!   └─ round cancelled     ─► cancel child, detach ─► TimedOut
//! ```
//!
//! The caller's `guard` (typically its concurrency permits) moves into the
//! spawned task and is dropped when the subscriber body ends, not when the
//! call returns.
//!
//! ## Rules
//! - The subscriber is invoked **exactly once** per call.
//! - A panic never propagates past the join boundary.
//! - Timeouts are **best-effort**: the task is detached, not preempted. It keeps
//!   running until it observes its cancelled token or finishes on its own.
//! - Child token per call: cancelling it never affects the round or siblings.

use std::any::Any;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::core::outcome::Outcome;
use crate::error::SubscriberError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{SubscriberId, SubscriberRef};

/// Per-round call executor.
#[derive(Clone, Debug)]
pub struct Invoker {
    bus: Bus,
    round: u64,
    timeout: Option<Duration>,
}

enum Expired {
    Timeout(Duration),
    Cancelled,
}

impl Invoker {
    /// Creates an invoker for `round` with an optional per-call timeout
    /// (`None` or zero = no timeout).
    pub fn new(bus: Bus, round: u64, timeout: Option<Duration>) -> Self {
        Self {
            bus,
            round,
            timeout: timeout.filter(|d| *d > Duration::ZERO),
        }
    }

    /// Delivers `event` to `subscriber` and reports how it went.
    ///
    /// Never panics and never fails: every path ends in an [`Outcome`].
    /// `guard` lives as long as the subscriber body, including after a timeout.
    pub async fn call<E, G>(
        &self,
        id: SubscriberId,
        subscriber: SubscriberRef<E>,
        event: Arc<E>,
        round_token: &CancellationToken,
        guard: G,
    ) -> Outcome
    where
        E: Send + Sync + 'static,
        G: Send + 'static,
    {
        let child = round_token.child_token();
        let name: Arc<str> = Arc::from(subscriber.name());

        let ctx = child.clone();
        let mut join = tokio::spawn(async move {
            let _guard = guard;
            subscriber.update(event, ctx).await
        });

        let timeout = self.timeout;
        let expiry = async move {
            match timeout {
                Some(dur) => time::sleep(dur).await,
                None => future::pending::<()>().await,
            }
        };

        let expired = select! {
            biased;
            res = &mut join => {
                return self.resolved(id, &name, res);
            }
            _ = round_token.cancelled() => Expired::Cancelled,
            _ = expiry => Expired::Timeout(timeout.unwrap_or_default()),
        };

        child.cancel();
        drop(join);
        if let Expired::Timeout(dur) = expired {
            self.bus.publish(
                self.event(EventKind::TimeoutHit, id, &name)
                    .with_timeout(dur),
            );
        }
        Outcome::TimedOut
    }

    /// Maps the joined task result to an outcome, publishing failures.
    fn resolved(
        &self,
        id: SubscriberId,
        name: &Arc<str>,
        res: Result<Result<(), SubscriberError>, tokio::task::JoinError>,
    ) -> Outcome {
        match res {
            Ok(Ok(())) => Outcome::Delivered,
            Ok(Err(err)) => {
                self.bus.publish(
                    self.event(EventKind::SubscriberFailed, id, name)
                        .with_reason(err.to_string()),
                );
                Outcome::Failed(err)
            }
            Err(join_err) if join_err.is_panic() => {
                let info = panic_message(join_err.into_panic().as_ref());
                self.bus.publish(
                    self.event(EventKind::SubscriberPanicked, id, name)
                        .with_reason(info.as_str()),
                );
                Outcome::Failed(SubscriberError::Panicked { info })
            }
            // Aborted by runtime shutdown: the call never resolved.
            Err(_cancelled) => Outcome::TimedOut,
        }
    }

    fn event(&self, kind: EventKind, id: SubscriberId, name: &Arc<str>) -> Event {
        Event::new(kind)
            .with_round(self.round)
            .with_subscriber(id)
            .with_name(Arc::clone(name))
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
