//! # One-shot topic signals.
//!
//! [`Subscriptions`] maps a topic to the waiters currently blocked on it. A
//! signal drains the whole topic: every waiter receives exactly one `()` and
//! the entry disappears.
//!
//! ```text
//! subscribe("ready") ─┐
//! subscribe("ready") ─┼─► topics["ready"] = [w1, w2]
//!                     │
//! signal("ready") ────┴─► w1 ◄ (), w2 ◄ ()   topics["ready"] removed
//! signal("ready") ──────► NoSubscriber
//! ```
//!
//! Waiters whose receiver was dropped (a bounded wait that expired) are pruned
//! on every subscribe and signal, together with topics left without waiters;
//! they never count as subscribers.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::error::SceneError;

#[derive(Default)]
pub(crate) struct Subscriptions {
    topics: HashMap<String, Vec<oneshot::Sender<()>>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `topic`.
    pub fn subscribe(&mut self, topic: String, waiter: oneshot::Sender<()>) {
        self.prune();
        self.topics.entry(topic).or_default().push(waiter);
    }

    /// Wakes every live waiter of `topic` and returns how many were woken.
    pub fn signal(&mut self, topic: &str) -> Result<usize, SceneError> {
        self.prune();
        let live: Vec<_> = self
            .topics
            .remove(topic)
            .unwrap_or_default()
            .into_iter()
            .filter(|w| !w.is_closed())
            .collect();
        if live.is_empty() {
            return Err(SceneError::NoSubscriber {
                topic: topic.to_string(),
            });
        }
        let count = live.len();
        for waiter in live {
            let _ = waiter.send(());
        }
        Ok(count)
    }

    /// Number of live waiters for `topic`.
    #[cfg(test)]
    pub fn waiting(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |ws| ws.iter().filter(|w| !w.is_closed()).count())
    }

    /// Number of topics with at least one registered waiter.
    #[cfg(test)]
    pub fn topics(&self) -> usize {
        self.topics.len()
    }

    /// Drops waiters whose receiver is gone, and topics left without waiters.
    fn prune(&mut self) {
        self.topics.retain(|_, waiters| {
            waiters.retain(|w| !w.is_closed());
            !waiters.is_empty()
        });
    }

    /// Drops every waiter; their receivers observe a closed channel.
    pub fn release_all(&mut self) -> usize {
        self.topics.drain().map(|(_, ws)| ws.len()).sum()
    }
}
