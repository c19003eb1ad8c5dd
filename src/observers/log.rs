//! # LogWriter: structured event logger
//!
//! A minimal observer that renders incoming [`Event`]s through `tracing`.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  round started round=3 subscribers=12
//! WARN  subscriber failed round=3 subscriber=sub-4 name="mailer" reason="delivery failed: smtp down"
//! WARN  subscriber timed out round=3 subscriber=sub-9 name="slow" timeout_ms=100
//! INFO  round completed round=3 outcomes=12 summary="delivered=10 failed=1 timed_out=1"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.name.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        let subscriber = e.subscriber.map(|id| id.to_string()).unwrap_or_default();
        let round = e.round.unwrap_or(0);

        match e.kind {
            EventKind::SubscriberRegistered => {
                tracing::debug!(subscriber = %subscriber, name, "subscriber registered");
            }
            EventKind::SubscriberUnregistered => {
                tracing::debug!(subscriber = %subscriber, name, "subscriber unregistered");
            }
            EventKind::SubscriberFailed => {
                tracing::warn!(round, subscriber = %subscriber, name, reason, "subscriber failed");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(round, subscriber = %subscriber, name, info = reason, "subscriber panicked");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(
                    round,
                    subscriber = %subscriber,
                    name,
                    timeout_ms = e.timeout_ms.unwrap_or(0),
                    "subscriber timed out"
                );
            }
            EventKind::RoundStarted => {
                tracing::info!(round, subscribers = e.count.unwrap_or(0), "round started");
            }
            EventKind::RoundCancelled => {
                tracing::warn!(round, reason, "round cancelled");
            }
            EventKind::RoundCompleted => {
                tracing::info!(round, outcomes = e.count.unwrap_or(0), summary = reason, "round completed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
