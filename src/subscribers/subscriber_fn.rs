//! # Function-backed subscriber (`SubscriberFn`)
//!
//! [`SubscriberFn`] wraps a closure `F: Fn(Arc<E>, CancellationToken) -> Fut`,
//! producing a fresh future per call. No state is shared between calls unless
//! the closure captures an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use notivisor::{SubscriberFn, SubscriberRef, SubscriberError};
//!
//! let s: SubscriberRef<u32> = SubscriberFn::arc("audit", |ev: Arc<u32>, _ctx: CancellationToken| async move {
//!     let _ = *ev;
//!     Ok::<_, SubscriberError>(())
//! });
//!
//! assert_eq!(s.name(), "audit");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SubscriberError;
use crate::subscribers::Subscriber;

/// Function-backed subscriber implementation.
#[derive(Debug)]
pub struct SubscriberFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubscriberFn<F> {
    /// Creates a new function-backed subscriber.
    ///
    /// Prefer [`SubscriberFn::arc`] when you immediately need a [`SubscriberRef`](crate::SubscriberRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<E, F, Fut> Subscriber<E> for SubscriberFn<F>
where
    E: Send + Sync + 'static,
    F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
{
    async fn update(&self, event: Arc<E>, ctx: CancellationToken) -> Result<(), SubscriberError> {
        (self.f)(event, ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::SubscriberRef;

    #[tokio::test]
    async fn calls_closure_with_event() {
        let s: SubscriberRef<u32> =
            SubscriberFn::arc("even", |ev: Arc<u32>, _ctx: CancellationToken| async move {
                if *ev % 2 == 0 {
                    Ok(())
                } else {
                    Err(SubscriberError::fail(format!("odd: {ev}")))
                }
            });

        assert_eq!(s.name(), "even");
        assert!(s.update(Arc::new(2), CancellationToken::new()).await.is_ok());
        assert_eq!(
            s.update(Arc::new(3), CancellationToken::new()).await,
            Err(SubscriberError::fail("odd: 3"))
        );
    }
}
