use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    events::Bus,
    observers::{Observe, ObserverSet},
};
use super::dispatcher::Dispatcher;

/// Builder for constructing a [`Dispatcher`] with optional observers.
pub struct DispatcherBuilder<E> {
    cfg: Config,
    observers: Vec<Arc<dyn Observe>>,
    _event: PhantomData<fn(E)>,
}

impl<E> DispatcherBuilder<E>
where
    E: Send + Sync + 'static,
{
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
            _event: PhantomData,
        }
    }

    /// Sets lifecycle observers.
    ///
    /// Observers receive dispatcher events (rounds, failures, timeouts)
    /// through dedicated workers with bounded queues.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Adds one lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Builds the dispatcher.
    ///
    /// With observers attached this spawns the observer workers and the bus
    /// listener, so it must be called from within a tokio runtime.
    pub fn build(self) -> Dispatcher<E> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener_token = CancellationToken::new();

        let listener = if self.observers.is_empty() {
            None
        } else {
            Some(spawn_listener(&bus, self.observers, listener_token.clone()))
        };
        Dispatcher::new_internal(self.cfg, bus, listener_token, listener)
    }
}

/// Forwards bus events to the observer set until `token` is cancelled (after
/// shutdown has drained in-flight rounds), then flushes what is still
/// buffered and shuts the observers down.
fn spawn_listener(
    bus: &Bus,
    observers: Vec<Arc<dyn Observe>>,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    let set = ObserverSet::new(observers);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "observer listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }

        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit_arc(Arc::new(ev)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberError;
    use crate::events::{Event, EventKind};
    use crate::subscribers::SubscriberFn;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Observe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "kinds"
        }
    }

    struct Explodes;

    #[async_trait]
    impl Observe for Explodes {
        async fn on_event(&self, _ev: &Event) {
            panic!("observer exploded");
        }
    }

    #[tokio::test]
    async fn observers_see_round_events_and_panics_are_contained() {
        let kinds = Arc::new(Kinds::default());
        let d: Dispatcher<u64> = Dispatcher::builder(Config::default())
            .with_observer(Arc::new(Explodes))
            .with_observer(kinds.clone())
            .build();

        let id = d.register(SubscriberFn::arc("sum", |ev: Arc<u64>, _ctx: CancellationToken| async move {
            let _ = *ev + 1;
            Ok::<_, SubscriberError>(())
        }));
        let res = d.notify(41u64).await;
        assert!(res.get(id).is_some_and(|o| o.is_delivered()));

        d.shutdown().await;
        let seen = kinds.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                EventKind::SubscriberRegistered,
                EventKind::RoundStarted,
                EventKind::RoundCompleted,
                EventKind::ShutdownRequested,
            ]
        );
    }

    #[tokio::test]
    async fn observers_see_rounds_ended_by_shutdown() {
        let kinds = Arc::new(Kinds::default());
        let d: Dispatcher<u64> = Dispatcher::builder(Config::default())
            .with_observer(kinds.clone())
            .build();

        let stuck = d.register(SubscriberFn::arc("stuck", |_ev: Arc<u64>, _ctx: CancellationToken| async {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Ok::<_, SubscriberError>(())
        }));
        let handle = d.spawn_notify(7u64);
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        d.shutdown().await;
        let res = handle.join().await;
        assert_eq!(res.cancelled, Some(crate::core::CancelReason::Cancelled));
        assert!(res.get(stuck).is_some_and(|o| o.is_timed_out()));

        let seen = kinds.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                EventKind::SubscriberRegistered,
                EventKind::RoundStarted,
                EventKind::ShutdownRequested,
                EventKind::RoundCancelled,
                EventKind::RoundCompleted,
            ]
        );
    }

    #[test]
    fn builds_without_runtime_when_no_observers() {
        let d: Dispatcher<()> = DispatcherBuilder::new(Config::default()).build();
        assert!(d.registry().is_empty());
    }
}
