//! # Concurrency limiter.
//!
//! Bounds the number of in-flight subscriber invocations with a semaphore.
//! A permit is acquired by the round coordinator **before** an invocation is
//! spawned and released when the subscriber body returns. A call recorded as
//! timed out keeps its permit until its detached body actually finishes, so
//! live subscriber tasks never outnumber permits.
//!
//! ```text
//! acquire(token)
//!   ├─ permit free        ─► Ok(Permit)
//!   ├─ token cancelled    ─► Err(AcquireError::Cancelled)
//!   └─ limiter closed     ─► Err(AcquireError::Closed)
//! ```
//!
//! ## Fairness
//! Waiters are queued FIFO by the underlying tokio semaphore, but nothing
//! prioritizes one round over another: a round with many subscribers queued
//! ahead of a later round can delay it for as long as its own calls run.

use std::sync::Arc;

use tokio::select;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::AcquireError;

/// Scoped concurrency slot; released on drop.
#[derive(Debug)]
#[must_use = "dropping a permit releases the slot immediately"]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

/// Semaphore-backed limiter of concurrent invocations.
#[derive(Clone, Debug)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Limiter {
    /// Creates a limiter with `n` slots (clamped to a minimum of 1).
    pub fn new(n: usize) -> Self {
        let capacity = n.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot, or fails once `token` is cancelled.
    ///
    /// Cancellation is checked first, so an already-cancelled round never
    /// takes a permit even when one is free.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<Permit, AcquireError> {
        if token.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }
        let permit_future = Arc::clone(&self.semaphore).acquire_owned();
        tokio::pin!(permit_future);

        select! {
            biased;
            _ = token.cancelled() => Err(AcquireError::Cancelled),
            res = &mut permit_future => match res {
                Ok(permit) => Ok(Permit { _inner: permit }),
                Err(_closed) => Err(AcquireError::Closed),
            },
        }
    }

    /// Releases a permit explicitly (same as dropping it).
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    /// Stops granting permits; pending and future `acquire` calls fail with `Closed`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Configured number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bounds_concurrent_permits() {
        let lim = Limiter::new(2);
        let token = CancellationToken::new();

        let a = lim.acquire(&token).await.unwrap();
        let _b = lim.acquire(&token).await.unwrap();
        assert_eq!(lim.available(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(50), lim.acquire(&token)).await;
        assert!(blocked.is_err(), "third permit must wait");

        lim.release(a);
        assert_eq!(lim.available(), 1);
        assert!(lim.acquire(&token).await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_unblocks_waiter() {
        let lim = Limiter::new(1);
        let token = CancellationToken::new();
        let _held = lim.acquire(&token).await.unwrap();

        let waiter = {
            let lim = lim.clone();
            let token = token.clone();
            tokio::spawn(async move { lim.acquire(&token).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), Err(AcquireError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_token_never_takes_free_permit() {
        let lim = Limiter::new(1);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(lim.acquire(&token).await.unwrap_err(), AcquireError::Cancelled);
        assert_eq!(lim.available(), 1);
    }

    #[tokio::test]
    async fn close_fails_acquire() {
        let lim = Limiter::new(0);
        assert_eq!(lim.capacity(), 1);
        lim.close();
        let token = CancellationToken::new();
        assert_eq!(lim.acquire(&token).await.unwrap_err(), AcquireError::Closed);
    }
}
