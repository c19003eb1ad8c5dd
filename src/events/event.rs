//! # Lifecycle events emitted by the registry, invoker and dispatcher.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Registry events**: subscribers added/removed
//! - **Delivery events**: per-subscriber failures, panics and timeouts
//! - **Round events**: round start, cancellation and completion
//!
//! The [`Event`] struct carries metadata such as timestamps, round number,
//! subscriber identity, reasons and counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use notivisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_round(7)
//!     .with_name("mailer")
//!     .with_timeout(Duration::from_millis(100));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.round, Some(7));
//! assert_eq!(ev.timeout_ms, Some(100));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::subscribers::SubscriberId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// Subscriber added to the registry.
    ///
    /// Sets:
    /// - `subscriber`: assigned id
    /// - `name`: subscriber name
    SubscriberRegistered,

    /// Subscriber removed from the registry (only when it was present).
    ///
    /// Sets:
    /// - `subscriber`: removed id
    /// - `name`: subscriber name
    SubscriberUnregistered,

    // === Delivery events ===
    /// Subscriber returned an error.
    ///
    /// Sets:
    /// - `round`, `subscriber`, `name`
    /// - `reason`: error message
    SubscriberFailed,

    /// Subscriber panicked; the panic was contained.
    ///
    /// Sets:
    /// - `round`, `subscriber`, `name`
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber exceeded its per-call timeout.
    ///
    /// Sets:
    /// - `round`, `subscriber`, `name`
    /// - `timeout_ms`: configured call timeout (ms)
    TimeoutHit,

    // === Round events ===
    /// Round took its snapshot and is about to fan out.
    ///
    /// Sets:
    /// - `round`
    /// - `count`: snapshot size
    RoundStarted,

    /// Round was cancelled (deadline or explicit cancel) before all calls resolved.
    ///
    /// Sets:
    /// - `round`
    /// - `reason`: `"deadline"` or `"cancelled"`
    RoundCancelled,

    /// Round reached `Complete`.
    ///
    /// Sets:
    /// - `round`
    /// - `count`: number of outcomes
    /// - `reason`: outcome summary
    RoundCompleted,

    // === Runtime events ===
    /// Dispatcher shutdown requested.
    ShutdownRequested,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Round number, if applicable.
    pub round: Option<u64>,
    /// Subscriber id, if applicable.
    pub subscriber: Option<SubscriberId>,
    /// Subscriber name, if applicable.
    pub name: Option<Arc<str>>,
    /// Human-readable reason (errors, panic info, summaries).
    pub reason: Option<Arc<str>>,
    /// Call timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Generic counter (snapshot size, outcome count).
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            round: None,
            subscriber: None,
            name: None,
            reason: None,
            timeout_ms: None,
            count: None,
        }
    }

    /// Attaches a round number.
    #[inline]
    pub fn with_round(mut self, round: u64) -> Self {
        self.round = Some(round);
        self
    }

    /// Attaches a subscriber id.
    #[inline]
    pub fn with_subscriber(mut self, id: SubscriberId) -> Self {
        self.subscriber = Some(id);
        self
    }

    /// Attaches a subscriber name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a counter (saturates at `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::RoundStarted);
        let b = Event::new(EventKind::RoundCompleted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_fill_fields() {
        let ev = Event::new(EventKind::SubscriberFailed)
            .with_subscriber(SubscriberId::from_raw(3))
            .with_reason("boom")
            .with_count(usize::MAX)
            .with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.subscriber, Some(SubscriberId::from_raw(3)));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert_eq!(ev.count, Some(u32::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
