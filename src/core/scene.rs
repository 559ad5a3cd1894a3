//! # Scene: the caller-facing handle.
//!
//! A [`Scene`] is a cheap, cloneable handle to one running session. Every
//! operation is a round trip to the backend task:
//!
//! ```text
//! caller ── Envelope ──► command channel ──► Backend ── reply ──► caller
//!    │                                                             ▲
//!    └──────────── scene ending (stop / abort / deadline) ─────────┘
//! ```
//!
//! ## Failure classification
//! - the scene is already ending when the command is enqueued → [`SceneError::Ended`];
//! - the scene starts ending after the command was enqueued but before it was
//!   answered → the terminal error if there is one, [`SceneError::Ended`] otherwise.
//!
//! ## Example
//! ```rust
//! use scenevisor::{Scene, SceneError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), SceneError> {
//!     let scene: Scene<String> = Scene::start();
//!
//!     scene.store("greeting", "hello".to_string()).await?;
//!     assert_eq!(scene.fetch("greeting").await?, "hello");
//!
//!     scene.stop().await?;
//!     assert!(scene.fetch("greeting").await.unwrap_err().is_ended());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::core::builder::SceneBuilder;
use crate::core::config::SceneConfig;
use crate::core::envelope::{Command, Envelope, Reply};
use crate::core::state::{SceneState, StateCell};
use crate::core::supervised::Supervised;
use crate::error::{BoxError, SceneError};
use crate::events::{Bus, Event, EventKind};

/// Handle to a running scene.
///
/// Cloning is cheap; all clones talk to the same backend.
pub struct Scene<V> {
    commands: mpsc::Sender<Envelope<V>>,
    backend: Supervised<SceneError>,
    state: StateCell,
    bus: Bus,
}

impl<V> Clone for Scene<V> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            backend: self.backend.clone(),
            state: self.state.clone(),
            bus: self.bus.clone(),
        }
    }
}

impl<V> Scene<V>
where
    V: Clone + Send + 'static,
{
    /// Starts a scene without deadlines.
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn start() -> Self {
        Self::builder(SceneConfig::default()).build()
    }

    /// Starts a scene with the given deadlines; `Duration::ZERO` disables one.
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn start_limited(inactivity: Duration, absolute: Duration) -> Self {
        Self::builder(SceneConfig::limited(inactivity, absolute)).build()
    }

    /// Returns a builder for a scene with subscribers or custom channel sizes.
    pub fn builder(cfg: SceneConfig) -> SceneBuilder<V> {
        SceneBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        commands: mpsc::Sender<Envelope<V>>,
        backend: Supervised<SceneError>,
        state: StateCell,
        bus: Bus,
    ) -> Self {
        Self {
            commands,
            backend,
            state,
            bus,
        }
    }

    /// Stores `value` under `key`. Fails if the key is already present.
    pub async fn store(&self, key: impl Into<String>, value: V) -> Result<(), SceneError> {
        self.command(Command::Store {
            key: key.into(),
            value,
            cleanup: None,
        })
        .await
        .map(|_| ())
    }

    /// Stores `value` under `key` with a cleanup that runs once on removal.
    ///
    /// The cleanup runs on the backend task, either in [`dispose`](Self::dispose)
    /// or during teardown. It must not call back into this scene.
    pub async fn store_clean<F>(
        &self,
        key: impl Into<String>,
        value: V,
        cleanup: F,
    ) -> Result<(), SceneError>
    where
        F: FnOnce(&str, &V) -> Result<(), BoxError> + Send + 'static,
    {
        self.command(Command::Store {
            key: key.into(),
            value,
            cleanup: Some(Box::new(cleanup)),
        })
        .await
        .map(|_| ())
    }

    /// Returns a clone of the value stored under `key`.
    pub async fn fetch(&self, key: impl Into<String>) -> Result<V, SceneError> {
        let command = Command::Fetch { key: key.into() };
        let kind = command.kind();
        self.command(command)
            .await
            .map(|reply| reply.into_value(kind))
    }

    /// Removes the prop under `key`, runs its cleanup and returns the value.
    ///
    /// If the cleanup fails the prop is removed anyway and
    /// [`SceneError::CleanupFailed`] is returned.
    pub async fn dispose(&self, key: impl Into<String>) -> Result<V, SceneError> {
        let command = Command::Dispose { key: key.into() };
        let kind = command.kind();
        self.command(command)
            .await
            .map(|reply| reply.into_value(kind))
    }

    /// Wakes every waiter of `topic`. Fails with `NoSubscriber` if nobody waits.
    pub async fn signal(&self, topic: impl Into<String>) -> Result<(), SceneError> {
        self.command(Command::Signal {
            topic: topic.into(),
        })
        .await
        .map(|_| ())
    }

    /// Waits for the next signal on `topic` without a time limit.
    pub async fn wait_signal(&self, topic: impl Into<String>) -> Result<(), SceneError> {
        self.wait_signal_limited(topic, Duration::ZERO).await
    }

    /// Waits for the next signal on `topic` for at most `timeout`.
    ///
    /// `Duration::ZERO` waits without limit. The waiter is registered before the
    /// wait starts, so a signal sent after this call enqueued its registration is
    /// never missed.
    pub async fn wait_signal_limited(
        &self,
        topic: impl Into<String>,
        timeout: Duration,
    ) -> Result<(), SceneError> {
        let topic = topic.into();
        let (waiter, signaled) = oneshot::channel();
        self.command(Command::Subscribe {
            topic: topic.clone(),
            waiter,
        })
        .await?;

        let limit = async {
            if timeout.is_zero() {
                std::future::pending::<()>().await;
            } else {
                tokio::time::sleep(timeout).await;
            }
        };

        tokio::select! {
            biased;
            res = signaled => match res {
                Ok(()) => Ok(()),
                Err(_released) => Err(self.terminal().await),
            },
            _ = self.backend.ending() => Err(self.terminal().await),
            _ = limit => Err(SceneError::WaitedTooLong { topic }),
        }
    }

    /// Requests a graceful stop and waits for teardown.
    ///
    /// Returns the terminal error, if any: an earlier abort or timeout, or the
    /// first cleanup failure of the teardown.
    pub async fn stop(&self) -> Result<(), SceneError> {
        self.backend.stop().await
    }

    /// Ends the scene with `err` as terminal error. Does not wait.
    ///
    /// Ignored if another abort came first, or the scene is already ending on
    /// its own (deadline, every handle dropped) or ended.
    pub fn abort(&self, err: impl Into<BoxError>) {
        let err = SceneError::aborted(err);
        let reason = err.to_string();
        if self.backend.kill(err) {
            self.bus
                .publish(Event::new(EventKind::AbortRequested).with_reason(reason));
        }
    }

    /// Waits until the scene ended and returns its terminal result.
    pub async fn wait(&self) -> Result<(), SceneError> {
        self.backend.wait().await
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> SceneState {
        self.state.get()
    }

    /// Subscribes to the scene's events; only events published afterwards are seen.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// One envelope round trip, classifying failures by when the scene ended.
    async fn command(&self, command: Command<V>) -> Result<Reply<V>, SceneError> {
        let (env, reply) = Envelope::new(command);

        tokio::select! {
            biased;
            _ = self.backend.ending() => return Err(SceneError::Ended),
            sent = self.commands.send(env) => {
                if sent.is_err() {
                    return Err(SceneError::Ended);
                }
            }
        }

        tokio::select! {
            biased;
            res = reply => match res {
                Ok(response) => response,
                Err(_dropped) => Err(self.terminal().await),
            },
            _ = self.backend.ending() => Err(self.terminal().await),
        }
    }

    /// Error reported to a caller whose command was overtaken by the scene ending.
    async fn terminal(&self) -> SceneError {
        match self.backend.wait().await {
            Err(err) => err,
            Ok(()) => SceneError::Ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_one_backend() {
        let a: Scene<u32> = Scene::start();
        let b = a.clone();
        a.store("n", 7).await.unwrap();
        assert_eq!(b.fetch("n").await.unwrap(), 7);
        b.stop().await.unwrap();
        assert_eq!(a.state(), SceneState::Ended);
    }

    #[tokio::test]
    async fn test_ended_after_stop() {
        let scene: Scene<u32> = Scene::start();
        scene.stop().await.unwrap();
        assert!(scene.store("k", 1).await.unwrap_err().is_ended());
        assert!(scene.signal("t").await.unwrap_err().is_ended());
    }

    #[tokio::test]
    async fn test_abort_is_terminal_error() {
        let scene: Scene<u32> = Scene::start();
        scene.abort("operator gave up");
        let err = scene.wait().await.unwrap_err();
        assert_eq!(err.as_label(), "scene_aborted");
        assert!(err.to_string().contains("operator gave up"));
        assert!(scene.fetch("k").await.unwrap_err().is_ended());
    }

    #[tokio::test]
    async fn test_waiter_released_by_stop() {
        let scene: Scene<u32> = Scene::start();
        let waiter = {
            let scene = scene.clone();
            tokio::spawn(async move { scene.wait_signal("never").await })
        };
        tokio::task::yield_now().await;
        scene.stop().await.unwrap();
        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.is_ended());
    }
}
