//! # Stateful subscriber that tracks currently held props.
//!
//! [`PropTracker`] maintains an in-memory set of prop keys by listening to
//! [`EventKind::PropStored`], [`EventKind::PropDisposed`] and
//! [`EventKind::CleanupFailed`] events. A [`EventKind::SceneEnded`] event clears it,
//! since teardown removes every prop.
//!
//! ## Architecture
//! ```text
//!  Backend ── publish(Event) ──► Bus ──► SubscriberSet ──► PropTracker
//!                                                           │
//!                       PropStored ── insert(key) ──────────┤
//!        PropDisposed / CleanupFailed ── remove(key) ───────┤
//!                       SceneEnded ── clear() ──────────────┘
//!
//! Anytime:
//!   PropTracker::snapshot() ──► sorted Vec<String> of held keys
//! ```
//!
//! Delivery is asynchronous: a snapshot reflects the events processed so far,
//! not necessarily every command already answered by the scene.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracks which prop keys a scene currently holds.
///
/// Cloneable; clones share the same internal state, so one clone can be handed
/// to [`SceneBuilder::with_subscriber`](crate::SceneBuilder::with_subscriber)
/// while another is kept for snapshots.
#[derive(Clone, Default)]
pub struct PropTracker {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl PropTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tracker with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashSet::with_capacity(capacity))),
        }
    }

    /// Returns the currently held keys, sorted.
    pub async fn snapshot(&self) -> Vec<String> {
        let g = self.inner.lock().await;
        let mut keys: Vec<String> = g.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

#[async_trait]
impl Subscribe for PropTracker {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::PropStored => {
                if let Some(key) = ev.key.as_deref() {
                    self.inner.lock().await.insert(key.to_string());
                }
            }
            EventKind::PropDisposed | EventKind::CleanupFailed => {
                if let Some(key) = ev.key.as_deref() {
                    self.inner.lock().await.remove(key);
                }
            }
            EventKind::SceneEnded => self.inner.lock().await.clear(),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "PropTracker"
    }
}
