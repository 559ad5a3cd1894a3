//! Scene core: backend, caller handle and lifecycle.
//!
//! The public API from this module is [`Scene`] with its [`SceneBuilder`] and
//! [`SceneConfig`], plus the reusable [`Supervised`] loop primitive.
//!
//! Internal modules:
//! - [`backend`]: the task owning props and subscriptions;
//! - [`envelope`]: command/reply protocol between handles and the backend;
//! - [`props`]: prop table with once-only cleanups;
//! - [`signals`]: one-shot topic subscriptions;
//! - [`timers`]: inactivity and absolute deadlines;
//! - [`supervised`]: graceful stop, kill and result for a background loop.

mod backend;
mod builder;
mod config;
mod envelope;
mod props;
mod scene;
mod signals;
mod state;
mod supervised;
mod timers;

pub use builder::SceneBuilder;
pub use config::SceneConfig;
pub use scene::Scene;
pub use state::SceneState;
pub use supervised::{LoopAbandoned, LoopContext, Supervised};

pub(crate) use supervised::panic_info;
