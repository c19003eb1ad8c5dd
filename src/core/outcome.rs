//! # Round results.
//!
//! [`Outcome`] is recorded once per subscriber per round; [`AggregateResult`]
//! collects them together with the round's cancellation status.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::SubscriberError;
use crate::subscribers::SubscriberId;

/// Result of delivering one event to one subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `update` returned `Ok(())`.
    Delivered,
    /// `update` returned an error or panicked.
    Failed(SubscriberError),
    /// The call exceeded its timeout, or the round ended (deadline/cancel)
    /// before it resolved or before it was dispatched.
    TimedOut,
}

impl Outcome {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Delivered => "delivered",
            Outcome::Failed(_) => "failed",
            Outcome::TimedOut => "timed_out",
        }
    }

    #[inline]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    #[inline]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

/// Why a round stopped before every call resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The round deadline expired.
    Deadline,
    /// The round was cancelled explicitly (round handle or dispatcher shutdown).
    Cancelled,
}

impl CancelReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelReason::Deadline => "deadline",
            CancelReason::Cancelled => "cancelled",
        }
    }
}

/// Outcome of one notification round.
///
/// Contains exactly one [`Outcome`] per subscriber in the round's snapshot.
#[derive(Clone, Debug, Default)]
pub struct AggregateResult {
    /// Per-subscriber outcomes, ordered by id (= snapshot order).
    pub outcomes: BTreeMap<SubscriberId, Outcome>,
    /// Set when the round ended through its deadline or a cancellation.
    pub cancelled: Option<CancelReason>,
    /// Wall time spent in the round.
    pub elapsed: Duration,
}

impl AggregateResult {
    /// Outcome of one subscriber, if it was part of the round.
    pub fn get(&self, id: SubscriberId) -> Option<&Outcome> {
        self.outcomes.get(&id)
    }

    /// Iterates `(id, outcome)` pairs in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = (SubscriberId, &Outcome)> {
        self.outcomes.iter().map(|(id, o)| (*id, o))
    }

    /// Number of outcomes (= snapshot size).
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_failed()).count()
    }

    pub fn timed_out(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_timed_out()).count()
    }

    /// True if every subscriber in the round received the event.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.values().all(Outcome::is_delivered)
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivered={} failed={} timed_out={}",
            self.delivered(),
            self.failed(),
            self.timed_out()
        )
    }
}
