//! # Subscriber capability.
//!
//! This module defines the [`Subscriber`] trait (async, cancelable) that every
//! notification target implements. The common handle type is
//! [`SubscriberRef`], an `Arc<dyn Subscriber<E>>` suitable for sharing across
//! the registry, rounds and invoker tasks.
//!
//! A subscriber receives the round's event as `Arc<E>` (shared, read-only) and a
//! [`CancellationToken`] that fires when the call times out or the round is
//! cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubscriberError;

/// Shared handle to a subscriber.
pub type SubscriberRef<E> = Arc<dyn Subscriber<E>>;

/// # Notification target.
///
/// One callable operation, [`update`](Subscriber::update), invoked at most once
/// per round in its own task.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use notivisor::{Subscriber, SubscriberError};
///
/// struct Mailer;
///
/// #[async_trait]
/// impl Subscriber<String> for Mailer {
///     async fn update(&self, event: Arc<String>, ctx: CancellationToken) -> Result<(), SubscriberError> {
///         if ctx.is_cancelled() {
///             return Ok(());
///         }
///         // send mail about `event`...
///         let _ = event;
///         Ok(())
///     }
///
///     fn name(&self) -> &str { "mailer" }
/// }
/// ```
#[async_trait]
pub trait Subscriber<E>: Send + Sync + 'static {
    /// Handles one event.
    ///
    /// Runs in a dedicated task. `Err` is recorded as a failed delivery; a panic
    /// is caught and recorded the same way. Implementations should watch `ctx`
    /// and return early once it is cancelled: the runtime stops waiting at that
    /// point but cannot preempt the call.
    async fn update(&self, event: Arc<E>, ctx: CancellationToken) -> Result<(), SubscriberError>;

    /// Human-readable name (for logs/events).
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
