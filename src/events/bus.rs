//! # Event bus for broadcasting scene events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The backend,
//! the scene façade (abort requests) and subscriber workers (overflow/panic)
//! publish into it; the subscriber forwarder and any
//! [`Scene::subscribe_events`](crate::Scene::subscribe_events) receiver read from it.
//!
//! ```text
//! Backend ──┐
//! Scene   ──┼──► Bus ──► SubscriberSet::forward ──► workers
//! Workers ──┘       └──► Scene::subscribe_events() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: the backend never waits on observers.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if nobody is subscribed at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for scene events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
