//! # Supervised background loop.
//!
//! [`Supervised`] runs one async function as a background task and gives every
//! clone of the handle the same control surface:
//!
//! - [`stop`](Supervised::stop): request a graceful stop, then wait for the result;
//! - [`kill`](Supervised::kill): request a stop and record an error as terminal cause;
//! - [`wait`](Supervised::wait): wait for the result without requesting anything;
//! - [`ending`](Supervised::ending): future resolving once shutdown has begun.
//!
//! ## Lifecycle
//! ```text
//! spawn(f) ──► f(LoopContext) running
//!                 │
//!   stop()/kill() ├─► stop token cancelled ─► ending token cancelled
//!   f returns     └─────────────────────────► ending token cancelled
//!                 ▼
//!            result stored once (kill error dominates f's own result)
//!                 ▼
//!            wait()/stop() observers released
//! ```
//!
//! ## Rules
//! - The result is written **exactly once** and never changes afterwards.
//! - Only the **first** kill error is kept; kills after completion are ignored.
//! - Once the loop announced it is ending on its own ([`LoopContext::conclude`]),
//!   kills are ignored as well: the loop's own cause stands.
//! - A panic inside `f` is caught and stored as `E::from(LoopAbandoned)`.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// The supervised function never produced a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("supervised loop abandoned: {reason}")]
pub struct LoopAbandoned {
    /// Panic message or a description of what happened.
    pub reason: String,
}

/// Context handed to the supervised function.
#[derive(Clone, Debug)]
pub struct LoopContext {
    stop: CancellationToken,
    ending: CancellationToken,
    concluded: Arc<AtomicBool>,
}

impl LoopContext {
    /// Resolves when a stop or kill was requested.
    pub async fn stopped(&self) {
        self.stop.cancelled().await;
    }

    /// Returns true once a stop or kill was requested.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Announces that the loop is ending on its own, before it returns.
    ///
    /// Releases [`Supervised::ending`] observers right away; later kills are
    /// ignored, so the loop's own result becomes terminal.
    pub fn conclude(&self) {
        self.concluded.store(true, Ordering::Release);
        self.ending.cancel();
    }
}

type Outcome<E> = Option<Result<(), E>>;

struct Inner<E> {
    stop: CancellationToken,
    ending: CancellationToken,
    killed: Mutex<Option<E>>,
    concluded: Arc<AtomicBool>,
    done: watch::Receiver<Outcome<E>>,
}

/// Handle to a supervised background loop.
///
/// Cheap to clone; all clones control the same loop.
pub struct Supervised<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for Supervised<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Supervised<E>
where
    E: From<LoopAbandoned> + Clone + Send + Sync + 'static,
{
    /// Spawns `f` on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(LoopContext) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let stop = CancellationToken::new();
        let ending = CancellationToken::new();
        let concluded = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = watch::channel::<Outcome<E>>(None);

        let inner = Arc::new(Inner {
            stop: stop.clone(),
            ending: ending.clone(),
            killed: Mutex::new(None),
            concluded: Arc::clone(&concluded),
            done: done_rx,
        });

        let fut = f(LoopContext {
            stop,
            ending,
            concluded,
        });
        let me = Arc::clone(&inner);
        tokio::spawn(async move {
            let res = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(E::from(LoopAbandoned {
                    reason: panic_info(&*payload),
                })),
            };
            me.ending.cancel();

            let mut killed = me.killed.lock().unwrap_or_else(PoisonError::into_inner);
            let res = match killed.take() {
                Some(err) => Err(err),
                None => res,
            };
            done_tx.send_replace(Some(res));
        });

        Self { inner }
    }

    /// Requests a graceful stop and waits until the loop returned.
    ///
    /// Returns the stored terminal result (which may be an earlier kill error).
    pub async fn stop(&self) -> Result<(), E> {
        self.inner.stop.cancel();
        self.inner.ending.cancel();
        self.wait().await
    }

    /// Requests a stop and records `err` as terminal cause.
    ///
    /// Does not wait. Returns `false` when `err` was not recorded: an earlier
    /// kill came first, the loop concluded on its own, or it already finished.
    pub fn kill(&self, err: E) -> bool {
        let recorded = {
            let mut killed = self
                .inner
                .killed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let open = killed.is_none()
                && !self.inner.concluded.load(Ordering::Acquire)
                && !self.is_finished();
            if open {
                *killed = Some(err);
            }
            open
        };
        self.inner.stop.cancel();
        self.inner.ending.cancel();
        recorded
    }

    /// Waits until the loop finished and returns its terminal result.
    pub async fn wait(&self) -> Result<(), E> {
        let mut done = self.inner.done.clone();
        match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Ok(())),
            Err(_closed) => Err(E::from(LoopAbandoned {
                reason: "loop task dropped before completion".to_string(),
            })),
        }
    }
}

impl<E> Supervised<E> {
    /// Resolves once shutdown has begun: stop, kill, or the loop returning on its own.
    pub async fn ending(&self) {
        self.inner.ending.cancelled().await;
    }

    /// Non-blocking variant of [`ending`](Self::ending).
    pub fn is_ending(&self) -> bool {
        self.inner.ending.is_cancelled()
    }

    /// Returns true once the terminal result is stored.
    pub fn is_finished(&self) -> bool {
        self.inner.done.borrow().is_some()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_info(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
