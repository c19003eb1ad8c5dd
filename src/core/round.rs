//! # One notification round.
//!
//! A round owns the snapshot, the set of outstanding invocations and the
//! outcome map. It moves through four phases:
//!
//! ```text
//! Started ──► FanningOut ──► Aggregating ──► Complete
//!    │            │               │
//!    │ (empty)    │ deadline/     │ deadline/
//!    └────────────┴── cancel ─────┴── cancel ──► Complete (partial, rest TimedOut)
//! ```
//!
//! ## Fan-out
//! ```text
//! for (id, sub) in snapshot:                   (snapshot order)
//!   ├─► round permit   (only if the round narrows the limit)
//!   ├─► dispatcher permit
//!   └─► JoinSet::spawn { invoker.call(.., permits) }
//! ```
//! Permits are taken by the coordinator before spawning and travel into the
//! subscriber's own task, so a slot frees only when the subscriber body ends.
//! A timed-out body that ignores its token keeps its slot until it returns.
//!
//! ## Rules
//! - Exactly one outcome per snapshot member.
//! - Subscribers not yet dispatched when the round is cancelled get `TimedOut`.
//! - After a deadline/cancel the round stops waiting at once; detached
//!   invocations observe the cancelled token and release their permits.

use std::future;
use std::sync::Arc;

use tokio::select;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::RoundSettings;
use crate::core::invoker::Invoker;
use crate::core::limiter::{Limiter, Permit};
use crate::core::outcome::{AggregateResult, CancelReason, Outcome};
use crate::error::AcquireError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{SubscriberId, SubscriberRef};

/// Phase of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoundPhase {
    Started,
    FanningOut,
    Aggregating,
    Complete,
}

/// Ephemeral coordinator of one `notify` call.
pub(crate) struct Round {
    id: u64,
    bus: Bus,
    limiter: Limiter,
    settings: RoundSettings,
    token: CancellationToken,
    phase: RoundPhase,
}

/// Permits held by one in-flight invocation.
struct Slots {
    _round: Option<Permit>,
    _global: Permit,
}

impl Round {
    pub(crate) fn new(
        id: u64,
        bus: Bus,
        limiter: Limiter,
        settings: RoundSettings,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            bus,
            limiter,
            settings,
            token,
            phase: RoundPhase::Started,
        }
    }

    /// Drives the round to `Complete` and returns its result.
    pub(crate) async fn run<E>(
        mut self,
        snapshot: Vec<(SubscriberId, SubscriberRef<E>)>,
        event: Arc<E>,
    ) -> AggregateResult
    where
        E: Send + Sync + 'static,
    {
        let started = Instant::now();
        let ids: Vec<SubscriberId> = snapshot.iter().map(|(id, _)| *id).collect();
        let mut result = AggregateResult::default();

        self.bus.publish(
            Event::new(EventKind::RoundStarted)
                .with_round(self.id)
                .with_count(snapshot.len()),
        );
        if snapshot.is_empty() {
            return self.complete(result, started);
        }

        let deadline = self.settings.round_deadline.map(|d| started + d);
        let expiry = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        let round_limiter = self.settings.round_limit.map(Limiter::new);
        let invoker = Invoker::new(self.bus.clone(), self.id, self.settings.call_timeout);
        let mut calls: JoinSet<(SubscriberId, Outcome)> = JoinSet::new();
        let mut cancelled: Option<CancelReason> = None;

        self.enter(RoundPhase::FanningOut);
        for (id, subscriber) in snapshot {
            let slots = select! {
                biased;
                _ = &mut expiry => {
                    cancelled = Some(CancelReason::Deadline);
                    break;
                }
                res = self.acquire(round_limiter.as_ref()) => match res {
                    Ok(slots) => slots,
                    Err(_) => {
                        cancelled = Some(CancelReason::Cancelled);
                        break;
                    }
                },
            };

            let invoker = invoker.clone();
            let event = Arc::clone(&event);
            let token = self.token.clone();
            calls.spawn(async move {
                let outcome = invoker.call(id, subscriber, event, &token, slots).await;
                (id, outcome)
            });

            while let Some(done) = calls.try_join_next() {
                record(&mut result, done);
            }
        }

        self.enter(RoundPhase::Aggregating);
        while cancelled.is_none() {
            select! {
                biased;
                _ = &mut expiry => cancelled = Some(CancelReason::Deadline),
                _ = self.token.cancelled() => cancelled = Some(CancelReason::Cancelled),
                next = calls.join_next() => match next {
                    Some(done) => record(&mut result, done),
                    None => break,
                },
            }
        }

        if let Some(reason) = cancelled {
            self.token.cancel();
            while let Some(done) = calls.try_join_next() {
                record(&mut result, done);
            }
            calls.detach_all();
            self.bus.publish(
                Event::new(EventKind::RoundCancelled)
                    .with_round(self.id)
                    .with_reason(reason.as_label()),
            );
            result.cancelled = Some(reason);
        }

        for id in ids {
            result.outcomes.entry(id).or_insert(Outcome::TimedOut);
        }
        self.complete(result, started)
    }

    /// Takes the round-local permit (if any) and then the dispatcher permit.
    ///
    /// All rounds acquire in the same order, so they cannot deadlock on each other.
    async fn acquire(&self, round_limiter: Option<&Limiter>) -> Result<Slots, AcquireError> {
        let round = match round_limiter {
            Some(lim) => Some(lim.acquire(&self.token).await?),
            None => None,
        };
        let global = self.limiter.acquire(&self.token).await?;
        Ok(Slots {
            _round: round,
            _global: global,
        })
    }

    fn complete(&mut self, mut result: AggregateResult, started: Instant) -> AggregateResult {
        self.enter(RoundPhase::Complete);
        result.elapsed = started.elapsed();
        self.bus.publish(
            Event::new(EventKind::RoundCompleted)
                .with_round(self.id)
                .with_count(result.len())
                .with_reason(result.to_string()),
        );
        result
    }

    fn enter(&mut self, phase: RoundPhase) {
        tracing::trace!(round = self.id, from = ?self.phase, to = ?phase, "round phase");
        self.phase = phase;
    }
}

/// Stores a finished invocation; aborted tasks are left for the `TimedOut` fill-in.
fn record(
    result: &mut AggregateResult,
    done: Result<(SubscriberId, Outcome), tokio::task::JoinError>,
) {
    if let Ok((id, outcome)) = done {
        result.outcomes.insert(id, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberError;
    use crate::subscribers::SubscriberFn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn settings(
        round_limit: Option<usize>,
        call_timeout: Option<Duration>,
        round_deadline: Option<Duration>,
    ) -> RoundSettings {
        RoundSettings {
            round_limit,
            call_timeout,
            round_deadline,
        }
    }

    fn sleeper(ms: u64) -> SubscriberRef<()> {
        SubscriberFn::arc("sleeper", move |_ev: Arc<()>, _ctx: CancellationToken| async move {
            time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, SubscriberError>(())
        })
    }

    fn snapshot(subs: Vec<SubscriberRef<()>>) -> Vec<(SubscriberId, SubscriberRef<()>)> {
        subs.into_iter()
            .enumerate()
            .map(|(i, s)| (SubscriberId::from_raw(i as u64), s))
            .collect()
    }

    fn round(limit: usize, s: RoundSettings) -> Round {
        Round::new(1, Bus::new(64), Limiter::new(limit), s, CancellationToken::new())
    }

    #[tokio::test]
    async fn empty_snapshot_completes_immediately() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let r = Round::new(2, bus, Limiter::new(1), settings(None, None, None), CancellationToken::new());
        let res = r
            .run(Vec::<(SubscriberId, SubscriberRef<()>)>::new(), Arc::new(()))
            .await;
        assert!(res.is_empty());
        assert_eq!(res.cancelled, None);

        let started = rx.recv().await.unwrap();
        assert_eq!((started.kind, started.count), (EventKind::RoundStarted, Some(0)));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RoundCompleted);
    }

    #[tokio::test]
    async fn timed_out_bodies_keep_their_slot() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let limiter = Limiter::new(1);

        let deaf: SubscriberRef<()> = {
            let live = Arc::clone(&live);
            let peak = Arc::clone(&peak);
            SubscriberFn::arc("deaf", move |_ev: Arc<()>, _ctx: CancellationToken| {
                let live = Arc::clone(&live);
                let peak = Arc::clone(&peak);
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    time::sleep(Duration::from_millis(150)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, SubscriberError>(())
                }
            })
        };

        for n in 0..4 {
            let r = Round::new(
                n,
                Bus::new(8),
                limiter.clone(),
                settings(None, Some(Duration::from_millis(20)), None),
                CancellationToken::new(),
            );
            let res = r.run(snapshot(vec![Arc::clone(&deaf)]), Arc::new(())).await;
            assert_eq!(res.timed_out(), 1);
        }

        assert!(peak.load(Ordering::SeqCst) <= 1);
        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let subs: Vec<SubscriberRef<()>> = (0..12)
            .map(|_| {
                let live = Arc::clone(&live);
                let peak = Arc::clone(&peak);
                let s: SubscriberRef<()> = SubscriberFn::arc("gauge", move |_ev: Arc<()>, _ctx: CancellationToken| {
                    let live = Arc::clone(&live);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        time::sleep(Duration::from_millis(20)).await;
                        live.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, SubscriberError>(())
                    }
                });
                s
            })
            .collect();

        let res = round(3, settings(None, None, None))
            .run(snapshot(subs), Arc::new(()))
            .await;
        assert_eq!(res.delivered(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn round_limit_narrows_dispatcher_limit() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let subs: Vec<SubscriberRef<()>> = (0..6)
            .map(|_| {
                let live = Arc::clone(&live);
                let peak = Arc::clone(&peak);
                let s: SubscriberRef<()> = SubscriberFn::arc("gauge", move |_ev: Arc<()>, _ctx: CancellationToken| {
                    let live = Arc::clone(&live);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        time::sleep(Duration::from_millis(10)).await;
                        live.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, SubscriberError>(())
                    }
                });
                s
            })
            .collect();

        let res = round(8, settings(Some(1), None, None))
            .run(snapshot(subs), Arc::new(()))
            .await;
        assert_eq!(res.delivered(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_bounds_latency_and_fills_timed_out() {
        let subs = vec![sleeper(0), sleeper(5_000), sleeper(5_000)];
        let start = Instant::now();
        let res = round(1, settings(None, None, Some(Duration::from_millis(150))))
            .run(snapshot(subs), Arc::new(()))
            .await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(res.len(), 3);
        assert_eq!(res.cancelled, Some(CancelReason::Deadline));
        assert_eq!(res.get(SubscriberId::from_raw(0)), Some(&Outcome::Delivered));
        assert_eq!(res.timed_out(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_marks_everything_timed_out() {
        let token = CancellationToken::new();
        token.cancel();
        let r = Round::new(
            9,
            Bus::new(8),
            Limiter::new(2),
            settings(None, None, None),
            token,
        );
        let res = r.run(snapshot(vec![sleeper(0), sleeper(0)]), Arc::new(())).await;
        assert_eq!(res.cancelled, Some(CancelReason::Cancelled));
        assert_eq!(res.timed_out(), 2);
    }

    #[tokio::test]
    async fn publishes_round_lifecycle() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let r = Round::new(
            5,
            bus,
            Limiter::new(2),
            settings(None, None, None),
            CancellationToken::new(),
        );
        let res = r.run(snapshot(vec![sleeper(0)]), Arc::new(())).await;
        assert!(res.all_delivered());

        let started = rx.recv().await.unwrap();
        assert_eq!(started.kind, EventKind::RoundStarted);
        assert_eq!(started.count, Some(1));
        let done = rx.recv().await.unwrap();
        assert_eq!(done.kind, EventKind::RoundCompleted);
        assert_eq!(done.round, Some(5));
        assert_eq!(done.reason.as_deref(), Some("delivered=1 failed=0 timed_out=0"));
    }
}
