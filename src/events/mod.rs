//! Scene events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the backend task, `Scene::abort`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `SubscriberSet::forward`, spawned by `SceneBuilder::build`, and
//!   receivers from `Scene::subscribe_events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
