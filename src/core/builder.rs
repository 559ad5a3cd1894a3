use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::backend::Backend;
use crate::core::config::SceneConfig;
use crate::core::scene::Scene;
use crate::core::state::StateCell;
use crate::core::supervised::Supervised;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Scene`] with optional subscribers.
pub struct SceneBuilder<V> {
    cfg: SceneConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> SceneBuilder<V>
where
    V: Clone + Send + 'static,
{
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SceneConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            _value: PhantomData,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive scene events (props, signals, timeouts, teardown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Starts the backend and returns the first handle.
    ///
    /// This consumes the builder and initializes:
    /// - the event bus
    /// - subscriber workers and their forwarder (if any subscriber is set)
    /// - the command channel and the supervised backend task
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn build(self) -> Scene<V> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let state = StateCell::default();

        let forwarder = (!self.subscribers.is_empty()).then(|| {
            let rx = bus.subscribe();
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            (rx, subs)
        });

        let backend = Backend::new(
            rx,
            bus.clone(),
            state.clone(),
            self.cfg.inactivity_timeout(),
            self.cfg.absolute_timeout(),
        );
        let supervised = Supervised::spawn(|ctx| backend.run(ctx));

        if let Some((rx, subs)) = forwarder {
            let backend = supervised.clone();
            tokio::spawn(subs.forward(rx, async move {
                let _ = backend.wait().await;
            }));
        }
        Scene::from_parts(tx, supervised, state, bus)
    }
}
