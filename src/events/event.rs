//! # Events emitted by a scene.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: scene start, ending, end, timeouts, abort requests
//! - **Prop events**: store, fetch, dispose and cleanup failures
//! - **Signal events**: waiter registration and signal delivery
//!
//! The [`Event`] struct carries optional metadata such as key, topic, reason
//! and durations, set depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events of one scene are published by its backend task in processing order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use scenevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_reason("inactivity")
//!     .with_timeout(Duration::from_millis(50));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.reason.as_deref(), Some("inactivity"));
//! assert_eq!(ev.timeout_ms, Some(50));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scene events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber missed one or more events.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: `"full"`, `"closed"` or `"lagged"` (the forwarder fell behind the bus)
    /// - `count`: events dropped for this subscriber so far
    SubscriberOverflow,

    // === Lifecycle events ===
    /// Backend started and armed its deadlines.
    ///
    /// Sets:
    /// - `timeout_ms`: absolute timeout (ms), if any
    /// - `inactivity_ms`: inactivity timeout (ms), if any
    SceneStarted,

    /// A deadline fired; the scene is about to end.
    ///
    /// Sets:
    /// - `reason`: `"inactivity"` or `"absolute"`
    /// - `timeout_ms`: configured duration of that deadline (ms)
    TimeoutHit,

    /// A caller aborted the scene.
    ///
    /// Sets:
    /// - `reason`: abort error message
    AbortRequested,

    /// Backend left the active state and starts teardown.
    ///
    /// Sets:
    /// - `count`: number of props awaiting cleanup
    SceneEnding,

    /// Teardown finished; the terminal result is fixed.
    ///
    /// Sets:
    /// - `count`: number of props cleaned up during teardown
    /// - `reason`: terminal error message (absent on clean stop)
    SceneEnded,

    // === Prop events ===
    /// A prop was stored.
    ///
    /// Sets:
    /// - `key`: prop key
    PropStored,

    /// A prop was fetched.
    ///
    /// Sets:
    /// - `key`: prop key
    PropFetched,

    /// A prop was disposed and its cleanup (if any) succeeded.
    ///
    /// Sets:
    /// - `key`: prop key
    PropDisposed,

    /// A cleanup callback failed, during dispose or teardown.
    ///
    /// Sets:
    /// - `key`: prop key
    /// - `reason`: cleanup error message
    CleanupFailed,

    /// A command was rejected (missing key, collision, no subscriber).
    ///
    /// Sets:
    /// - `key` or `topic`: the subject of the command
    /// - `reason`: error label
    CommandRejected,

    // === Signal events ===
    /// A waiter registered for a topic.
    ///
    /// Sets:
    /// - `topic`: topic name
    WaiterRegistered,

    /// A signal woke the waiters of a topic.
    ///
    /// Sets:
    /// - `topic`: topic name
    /// - `count`: number of woken waiters
    SignalDelivered,
}

/// Scene event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Prop key, if applicable.
    pub key: Option<Arc<str>>,
    /// Signal topic, if applicable.
    pub topic: Option<Arc<str>>,
    /// Subscriber name (subscriber events only).
    pub subscriber: Option<&'static str>,
    /// Human-readable reason (errors, timeout kind, overflow details).
    pub reason: Option<Arc<str>>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Inactivity timeout in milliseconds (compact).
    pub inactivity_ms: Option<u32>,
    /// Number of affected items (woken waiters, cleaned props).
    pub count: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            topic: None,
            subscriber: None,
            reason: None,
            timeout_ms: None,
            inactivity_ms: None,
            count: None,
        }
    }

    /// Attaches a prop key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a signal topic.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches the inactivity timeout (stored as milliseconds).
    #[inline]
    pub fn with_inactivity(mut self, d: Duration) -> Self {
        self.inactivity_ms = Some(millis(d));
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
