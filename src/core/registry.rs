//! # Subscriber registry.
//!
//! Thread-safe mapping from [`SubscriberId`] to subscriber capability.
//!
//! ## Architecture
//! ```text
//! register(sub)   ──► next_id.fetch_add ──► write lock ──► insert ──► SubscriberRegistered
//! unregister(id)  ──► write lock ──► remove (no-op if absent) ──► SubscriberUnregistered
//! snapshot()      ──► read lock ──► clone (id, Arc) pairs ──► release lock
//! ```
//!
//! ## Rules
//! - Ids come from a monotonic counter and are never reused.
//! - `unregister` is idempotent: unknown or already-removed ids are a no-op.
//! - `snapshot` holds the read lock only while copying; subscribers are never
//!   invoked under the lock, so the lock is never held across `.await`.
//! - A snapshot is isolated: later (un)registrations do not change it.
//!
//! Snapshot order is ascending id, i.e. registration order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{SubscriberId, SubscriberRef};

/// Registry of subscribers for events of type `E`.
pub struct Registry<E> {
    subscribers: RwLock<BTreeMap<SubscriberId, SubscriberRef<E>>>,
    next_id: AtomicU64,
    bus: Bus,
}

impl<E> Registry<E>
where
    E: Send + Sync + 'static,
{
    /// Creates an empty registry publishing to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            bus,
        }
    }

    /// Registers a subscriber and returns its fresh id.
    ///
    /// # Panics
    /// Panics if the id space is exhausted (see [`try_register`](Self::try_register)).
    pub fn register(&self, subscriber: SubscriberRef<E>) -> SubscriberId {
        match self.try_register(subscriber) {
            Ok(id) => id,
            Err(e) => panic!("{e}: {}", e.as_message()),
        }
    }

    /// Registers a subscriber, reporting id exhaustion instead of panicking.
    pub fn try_register(&self, subscriber: SubscriberRef<E>) -> Result<SubscriberId, RuntimeError> {
        let raw = self
            .next_id
            .fetch_update(AtomicOrdering::Relaxed, AtomicOrdering::Relaxed, |n| {
                n.checked_add(1)
            })
            .map_err(|_| RuntimeError::RegistrationExhausted)?;
        let id = SubscriberId::from_raw(raw);
        let name = subscriber.name().to_owned();

        self.write().insert(id, subscriber);
        self.bus.publish(
            Event::new(EventKind::SubscriberRegistered)
                .with_subscriber(id)
                .with_name(name),
        );
        Ok(id)
    }

    /// Removes a subscriber.
    ///
    /// Returns `true` if it was present. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.write().remove(&id);
        match removed {
            Some(sub) => {
                self.bus.publish(
                    Event::new(EventKind::SubscriberUnregistered)
                        .with_subscriber(id)
                        .with_name(sub.name()),
                );
                true
            }
            None => false,
        }
    }

    /// Returns a point-in-time copy of all subscribers in registration order.
    pub fn snapshot(&self) -> Vec<(SubscriberId, SubscriberRef<E>)> {
        self.read()
            .iter()
            .map(|(id, sub)| (*id, Arc::clone(sub)))
            .collect()
    }

    /// Returns the ids of all registered subscribers (ascending).
    pub fn ids(&self) -> Vec<SubscriberId> {
        self.read().keys().copied().collect()
    }

    /// True if `id` is currently registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ---------------------------
    // Lock helpers
    // ---------------------------

    // The map is only touched by insert/remove/clone, none of which run user
    // code, so a poisoned lock still guards a consistent map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<SubscriberId, SubscriberRef<E>>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<SubscriberId, SubscriberRef<E>>> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn set_next_id(&self, raw: u64) {
        self.next_id.store(raw, AtomicOrdering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberError;
    use crate::subscribers::SubscriberFn;
    use std::collections::HashSet;
    use tokio_util::sync::CancellationToken;

    fn noop(name: &'static str) -> SubscriberRef<u32> {
        SubscriberFn::arc(name, |_ev: Arc<u32>, _ctx: CancellationToken| async {
            Ok::<_, SubscriberError>(())
        })
    }

    #[test]
    fn register_assigns_fresh_ids_in_order() {
        let reg = Registry::new(Bus::new(8));
        let a = reg.register(noop("a"));
        let b = reg.register(noop("b"));
        assert!(a < b);

        let snap = reg.snapshot();
        let names: Vec<&str> = snap.iter().map(|(_, s)| s.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(reg.ids(), vec![a, b]);
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = Registry::new(Bus::new(8));
        let a = reg.register(noop("a"));
        assert!(reg.unregister(a));
        assert!(!reg.unregister(a));
        assert!(!reg.unregister(SubscriberId::from_raw(999)));
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_changes() {
        let reg = Registry::new(Bus::new(8));
        let a = reg.register(noop("a"));
        let snap = reg.snapshot();

        reg.unregister(a);
        let b = reg.register(noop("b"));

        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0, a);
        assert!(reg.contains(b));
        assert!(!reg.contains(a));
    }

    #[test]
    fn ids_are_never_reused() {
        let reg = Registry::new(Bus::new(8));
        let a = reg.register(noop("a"));
        reg.unregister(a);
        let b = reg.register(noop("b"));
        assert_ne!(a, b);
    }

    #[test]
    fn exhaustion_is_reported() {
        let reg = Registry::new(Bus::new(8));
        reg.set_next_id(u64::MAX);
        assert_eq!(
            reg.try_register(noop("late")).unwrap_err(),
            RuntimeError::RegistrationExhausted
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn concurrent_register_unregister_keeps_ids_unique() {
        let reg = Arc::new(Registry::new(Bus::new(8)));
        let mut handles = Vec::new();
        for t in 0..8 {
            let reg = Arc::clone(&reg);
            handles.push(std::thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..200 {
                    let id = reg.register(noop("c"));
                    if (i + t) % 2 == 0 {
                        reg.unregister(id);
                        reg.unregister(id);
                    } else {
                        kept.push(id);
                    }
                    let _ = reg.snapshot();
                }
                kept
            }));
        }

        let mut all = HashSet::new();
        let mut total = 0;
        for h in handles {
            for id in h.join().unwrap() {
                all.insert(id);
                total += 1;
            }
        }
        assert_eq!(all.len(), total);
        assert_eq!(reg.len(), total);
    }

    #[tokio::test]
    async fn publishes_registry_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let reg = Registry::new(bus);

        let a = reg.register(noop("a"));
        reg.unregister(a);
        reg.unregister(a);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberRegistered);
        assert_eq!(ev.subscriber, Some(a));
        assert_eq!(ev.name.as_deref(), Some("a"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberUnregistered);
        assert!(rx.try_recv().is_err());
    }
}
