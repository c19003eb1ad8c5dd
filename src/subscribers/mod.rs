//! # Subscriber abstractions.
//!
//! This module provides the notification-target types:
//! - [`Subscriber`] - trait for implementing async cancelable event handlers
//! - [`SubscriberFn`] - function-based subscriber implementation
//! - [`SubscriberRef`] - shared reference to a subscriber (`Arc<dyn Subscriber<E>>`)
//! - [`SubscriberId`] - identity assigned by the registry

mod id;
mod subscriber;
mod subscriber_fn;

pub use id::SubscriberId;
pub use subscriber::{Subscriber, SubscriberRef};
pub use subscriber_fn::SubscriberFn;
