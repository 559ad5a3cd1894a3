//! # Event subscribers for scenes.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling scene events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Backend ── publish(Event) ──► Bus ──► SubscriberSet::forward
//!                                                    │
//!                                   ┌────────────────┼──────────┐
//!                                   ▼                ▼          ▼
//!                               LogWriter      PropTracker   Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react to events (logging, metrics, alerts)
//! - **Stateful subscribers** maintain state derived from events ([`PropTracker`])
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use scenevisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct TimeoutCounter;
//!
//! #[async_trait]
//! impl Subscribe for TimeoutCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TimeoutHit {
//!             // increment timeout counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod props;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use props::PropTracker;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
