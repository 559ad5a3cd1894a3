//! Error types used by scenes, their backend and prop cleanups.
//!
//! Everything a scene reports is a [`SceneError`]. Errors are returned as values
//! and are [`Clone`]: the terminal error of a scene is handed to every caller of
//! [`Scene::wait`](crate::Scene::wait) and [`Scene::stop`](crate::Scene::stop).
//!
//! Foreign errors (cleanup failures, abort causes) are carried as [`SharedError`].

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::LoopAbandoned;

/// Boxed error returned by cleanup callbacks and accepted by [`Scene::abort`](crate::Scene::abort).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared, cloneable form of a foreign error stored inside a [`SceneError`].
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Which of the two scene deadlines fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// No command was processed within the inactivity window.
    Inactivity,
    /// The absolute lifetime measured from scene start elapsed.
    Absolute,
}

impl TimeoutKind {
    /// Returns a short stable name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeoutKind::Inactivity => "inactivity",
            TimeoutKind::Absolute => "absolute",
        }
    }
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Errors produced by a scene.
///
/// A variant either classifies a single rejected operation (`PropNotFound`,
/// `NoSubscriber`, ...) or describes why the scene ended (`Timeout`, `Aborted`,
/// a teardown `CleanupFailed`).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SceneError {
    /// The scene no longer accepts work.
    #[error("scene already ended")]
    Ended,

    /// The scene terminated itself because a configured deadline passed.
    #[error("scene {kind} timeout reached after {after:?}")]
    Timeout {
        /// Which deadline fired.
        kind: TimeoutKind,
        /// The configured duration of that deadline.
        after: Duration,
    },

    /// A store collided with a prop that is already present.
    #[error("prop {key:?} already exists")]
    PropAlreadyExists {
        /// The colliding key.
        key: String,
    },

    /// A fetch or dispose referenced a key that is not stored.
    #[error("prop {key:?} does not exist")]
    PropNotFound {
        /// The missing key.
        key: String,
    },

    /// A cleanup callback returned an error or panicked.
    #[error("cleanup of prop {key:?} failed: {source}")]
    CleanupFailed {
        /// Key of the prop whose cleanup failed.
        key: String,
        /// The error reported by the cleanup.
        #[source]
        source: SharedError,
    },

    /// A signal was raised for a topic nobody waits on.
    #[error("no subscriber to signal {topic:?}")]
    NoSubscriber {
        /// The signaled topic.
        topic: String,
    },

    /// A bounded wait for a signal expired.
    #[error("waiting for signal {topic:?} timed out")]
    WaitedTooLong {
        /// The awaited topic.
        topic: String,
    },

    /// The scene was aborted by a caller.
    #[error("scene aborted: {source}")]
    Aborted {
        /// The error passed to `abort`.
        #[source]
        source: SharedError,
    },

    /// The backend task vanished without publishing a result (panic or runtime shutdown).
    #[error("scene backend lost: {reason}")]
    BackendLost {
        /// Panic message or a description of how the backend was lost.
        reason: String,
    },
}

impl SceneError {
    /// Wraps a caller-supplied error as an abort cause.
    pub fn aborted(err: impl Into<BoxError>) -> Self {
        SceneError::Aborted {
            source: Arc::from(err.into()),
        }
    }

    /// Builds a `CleanupFailed` error for `key`.
    pub fn cleanup_failed(key: impl Into<String>, err: impl Into<BoxError>) -> Self {
        SceneError::CleanupFailed {
            key: key.into(),
            source: Arc::from(err.into()),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use scenevisor::SceneError;
    ///
    /// let err = SceneError::PropNotFound { key: "foo".into() };
    /// assert_eq!(err.as_label(), "prop_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SceneError::Ended => "scene_ended",
            SceneError::Timeout { .. } => "scene_timeout",
            SceneError::PropAlreadyExists { .. } => "prop_already_exists",
            SceneError::PropNotFound { .. } => "prop_not_found",
            SceneError::CleanupFailed { .. } => "cleanup_failed",
            SceneError::NoSubscriber { .. } => "no_subscriber",
            SceneError::WaitedTooLong { .. } => "waited_too_long",
            SceneError::Aborted { .. } => "scene_aborted",
            SceneError::BackendLost { .. } => "scene_backend_lost",
        }
    }

    /// True if the scene did not accept the operation because it ended.
    pub fn is_ended(&self) -> bool {
        matches!(self, SceneError::Ended)
    }

    /// True for either deadline; see [`SceneError::timeout_kind`] for which one.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SceneError::Timeout { .. })
    }

    /// Returns the deadline kind for `Timeout`, `None` otherwise.
    pub fn timeout_kind(&self) -> Option<TimeoutKind> {
        match self {
            SceneError::Timeout { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True if a store hit a key that is already present.
    pub fn is_prop_already_exists(&self) -> bool {
        matches!(self, SceneError::PropAlreadyExists { .. })
    }

    /// True if a fetch or dispose named a missing key.
    pub fn is_prop_not_found(&self) -> bool {
        matches!(self, SceneError::PropNotFound { .. })
    }

    /// True if a cleanup callback failed or panicked.
    pub fn is_cleanup_failed(&self) -> bool {
        matches!(self, SceneError::CleanupFailed { .. })
    }

    /// True if a signal found nobody waiting.
    pub fn is_no_subscriber(&self) -> bool {
        matches!(self, SceneError::NoSubscriber { .. })
    }

    /// True if a bounded signal wait expired.
    pub fn is_waited_too_long(&self) -> bool {
        matches!(self, SceneError::WaitedTooLong { .. })
    }

    /// True if a caller aborted the scene.
    pub fn is_aborted(&self) -> bool {
        matches!(self, SceneError::Aborted { .. })
    }
}

impl From<LoopAbandoned> for SceneError {
    fn from(e: LoopAbandoned) -> Self {
        SceneError::BackendLost { reason: e.reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key_or_topic() {
        let err = SceneError::PropAlreadyExists { key: "foo".into() };
        assert_eq!(err.to_string(), "prop \"foo\" already exists");

        let err = SceneError::WaitedTooLong { topic: "ready".into() };
        assert_eq!(err.to_string(), "waiting for signal \"ready\" timed out");

        let err = SceneError::Timeout {
            kind: TimeoutKind::Inactivity,
            after: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "scene inactivity timeout reached after 50ms");
    }

    #[test]
    fn test_cleanup_failed_keeps_source() {
        let err = SceneError::cleanup_failed("foo", "ouch");
        assert!(err.is_cleanup_failed());
        assert_eq!(err.as_label(), "cleanup_failed");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("ouch"));
    }

    #[test]
    fn test_clone_shares_foreign_source() {
        let err = SceneError::aborted(std::io::Error::other("disk gone"));
        let copy = err.clone();
        assert!(copy.is_aborted());
        assert_eq!(copy.to_string(), "scene aborted: disk gone");
    }

    #[test]
    fn test_timeout_kind() {
        let err = SceneError::Timeout {
            kind: TimeoutKind::Absolute,
            after: Duration::from_secs(1),
        };
        assert!(err.is_timeout());
        assert_eq!(err.timeout_kind(), Some(TimeoutKind::Absolute));
        assert_eq!(SceneError::Ended.timeout_kind(), None);
    }

    #[test]
    fn test_labels_are_distinct() {
        let errors = [
            SceneError::Ended,
            SceneError::Timeout {
                kind: TimeoutKind::Absolute,
                after: Duration::ZERO,
            },
            SceneError::PropAlreadyExists { key: "k".into() },
            SceneError::PropNotFound { key: "k".into() },
            SceneError::cleanup_failed("k", "e"),
            SceneError::NoSubscriber { topic: "t".into() },
            SceneError::WaitedTooLong { topic: "t".into() },
            SceneError::aborted("e"),
            SceneError::BackendLost { reason: "r".into() },
        ];
        let mut labels: Vec<&str> = errors.iter().map(SceneError::as_label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), errors.len());
    }
}
