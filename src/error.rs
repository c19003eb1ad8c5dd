//! Error types used by the notivisor runtime and by subscribers.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors raised by the dispatcher runtime itself.
//! - [`SubscriberError`]: errors produced by a single subscriber invocation.
//! - [`AcquireError`]: reasons a concurrency permit could not be obtained.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics),
//! the error enums additionally provide `as_message`.
//!
//! Subscriber errors never escape [`Dispatcher::notify`](crate::Dispatcher::notify):
//! they are contained by the invoker and surfaced as [`Outcome::Failed`](crate::Outcome::Failed).

use thiserror::Error;

/// # Errors produced by the notivisor runtime.
///
/// These are failures of the dispatcher machinery, not of subscribers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The registry ran out of subscriber ids.
    ///
    /// Ids come from a `u64` counter, so this is treated as fatal.
    #[error("subscriber id space exhausted")]
    RegistrationExhausted,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use notivisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::RegistrationExhausted.as_label(), "registration_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::RegistrationExhausted => "registration_exhausted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::RegistrationExhausted => {
                format!("no subscriber ids left after {}", u64::MAX)
            }
        }
    }
}

/// # Errors produced by a subscriber invocation.
///
/// Returned by [`Subscriber::update`](crate::Subscriber::update) to report a
/// failed delivery, or synthesized by the invoker when the subscriber panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    /// The subscriber reported a failure.
    #[error("delivery failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The subscriber panicked; the panic was contained at the call boundary.
    #[error("subscriber panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SubscriberError {
    /// Convenience constructor for [`SubscriberError::Fail`].
    ///
    /// # Example
    /// ```
    /// use notivisor::SubscriberError;
    ///
    /// let err = SubscriberError::fail("smtp down");
    /// assert_eq!(err.to_string(), "delivery failed: smtp down");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        SubscriberError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use notivisor::SubscriberError;
    ///
    /// let err = SubscriberError::Panicked { info: "boom".into() };
    /// assert_eq!(err.as_label(), "subscriber_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberError::Fail { .. } => "subscriber_failed",
            SubscriberError::Panicked { .. } => "subscriber_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SubscriberError::Fail { error } => format!("error: {error}"),
            SubscriberError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// True if the failure came from a contained panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, SubscriberError::Panicked { .. })
    }
}

/// # Reasons a [`Limiter`](crate::Limiter) permit was not granted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The round (or the whole dispatcher) was cancelled while waiting.
    #[error("permit wait cancelled")]
    Cancelled,

    /// The limiter was closed; no more permits will be granted.
    #[error("limiter closed")]
    Closed,
}

impl AcquireError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AcquireError::Cancelled => "acquire_cancelled",
            AcquireError::Closed => "acquire_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(SubscriberError::fail("x").as_label(), "subscriber_failed");
        assert_eq!(AcquireError::Cancelled.as_label(), "acquire_cancelled");
        assert_eq!(AcquireError::Closed.as_label(), "acquire_closed");
    }

    #[test]
    fn panic_detection() {
        assert!(SubscriberError::Panicked { info: "p".into() }.is_panic());
        assert!(!SubscriberError::fail("f").is_panic());
        assert_eq!(SubscriberError::fail("f").as_message(), "error: f");
    }
}
