//! # scenevisor
//!
//! **Scenevisor** is a lifecycle-bounded shared-state coordinator for async Rust.
//!
//! A [`Scene`] is one logical session through which independent tasks store,
//! fetch and dispose of named values ("props") and publish or await one-shot
//! topic signals. All state lives in a single backend task, so no lock guards
//! it. Two optional deadlines (inactivity and absolute) end the scene on their
//! own, and every remaining prop's cleanup runs exactly once on the way out.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Scene handle │   │ Scene handle │   │ Scene handle │
//!     │  (task #1)   │   │  (task #2)   │   │  (task #3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │   Envelope { Command, reply }       │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │            command channel (SceneConfig::command_capacity)        │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Backend (Supervised loop)                                        │
//! │  - PropTable (key → value + once-only cleanup)                    │
//! │  - Subscriptions (topic → waiters)                                │
//! │  - Timers (inactivity, absolute)                                  │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   │ publishes Events
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 Bus (SceneConfig::bus_capacity)                   │
//! └──────────────┬───────────────────────────────────┬────────────────┘
//!                ▼                                   ▼
//!     SubscriberSet::forward              Scene::subscribe_events()
//!                ▼
//!       worker per subscriber ──► on_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! Active ──(stop | abort | deadline | last handle dropped)──► Ending ──► Ended
//!
//! Ending:
//!   ├─► queued commands dropped, callers see the scene ending
//!   ├─► every remaining prop cleaned up once (failures collected)
//!   └─► every pending waiter released
//!
//! Ended:
//!   terminal result = abort error | timeout | first cleanup failure (graceful stop only) | Ok
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                  |
//! |-------------------|------------------------------------------------------------|-------------------------------------|
//! | **Scene**         | Props, signals, deadlines and teardown.                    | [`Scene`], [`SceneState`]           |
//! | **Configuration** | Deadlines and channel capacities.                          | [`SceneConfig`], [`SceneBuilder`]   |
//! | **Errors**        | Typed, cloneable errors with stable labels.                | [`SceneError`], [`TimeoutKind`]     |
//! | **Subscriber API**| Hook into scene events (logging, metrics, prop tracking).  | [`Subscribe`], [`PropTracker`]      |
//! | **Supervision**   | Reusable stop/kill/wait primitive for a background loop.   | [`Supervised`], [`LoopContext`]     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use scenevisor::{Scene, SceneError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), SceneError> {
//!     let scene: Scene<u64> = Scene::start_limited(Duration::from_secs(5), Duration::ZERO);
//!
//!     let consumer = {
//!         let scene = scene.clone();
//!         tokio::spawn(async move {
//!             scene.wait_signal("ready").await?;
//!             scene.dispose("answer").await
//!         })
//!     };
//!
//!     // Retry until the consumer has registered its waiter.
//!     scene.store_clean("answer", 42, |key, v| {
//!         println!("cleaning {key}={v}");
//!         Ok(())
//!     }).await?;
//!     while let Err(e) = scene.signal("ready").await {
//!         assert!(e.is_no_subscriber());
//!         tokio::task::yield_now().await;
//!     }
//!
//!     assert_eq!(consumer.await.expect("consumer panicked")?, 42);
//!     scene.stop().await
//! }
//! ```

mod core;
mod error;
mod events;
mod subscribers;

pub use core::{
    LoopAbandoned, LoopContext, Scene, SceneBuilder, SceneConfig, SceneState, Supervised,
};
pub use error::{BoxError, SceneError, SharedError, TimeoutKind};
pub use events::{Bus, Event, EventKind};
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
pub use subscribers::{PropTracker, Subscribe, SubscriberSet};
