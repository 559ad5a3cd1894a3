//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos; implement a custom [`Subscribe`] for structured logging.
//!
//! ## Example output
//! ```text
//! [scene-started] inactivity_ms=Some(50) absolute_ms=None
//! [stored] key="foo"
//! [disposed] key="foo"
//! [cleanup-failed] key="bar" err="ouch"
//! [signal] topic="ready" waiters=2
//! [timeout] kind="inactivity" timeout_ms=50
//! [scene-ended] cleaned=1 err=None
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Renders one event as a log line.
    pub fn format(e: &Event) -> String {
        let key = e.key.as_deref().unwrap_or("?");
        let topic = e.topic.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::SceneStarted => format!(
                "[scene-started] inactivity_ms={:?} absolute_ms={:?}",
                e.inactivity_ms, e.timeout_ms
            ),
            EventKind::TimeoutHit => format!(
                "[timeout] kind={:?} timeout_ms={}",
                e.reason.as_deref().unwrap_or("?"),
                e.timeout_ms.unwrap_or_default()
            ),
            EventKind::AbortRequested => format!("[abort] err={:?}", e.reason),
            EventKind::SceneEnding => "[scene-ending]".to_string(),
            EventKind::SceneEnded => format!(
                "[scene-ended] cleaned={} err={:?}",
                e.count.unwrap_or_default(),
                e.reason
            ),
            EventKind::PropStored => format!("[stored] key={key:?}"),
            EventKind::PropFetched => format!("[fetched] key={key:?}"),
            EventKind::PropDisposed => format!("[disposed] key={key:?}"),
            EventKind::CleanupFailed => {
                format!("[cleanup-failed] key={key:?} err={:?}", e.reason.as_deref().unwrap_or("?"))
            }
            EventKind::CommandRejected => format!(
                "[rejected] key={:?} topic={:?} err={:?}",
                e.key, e.topic, e.reason
            ),
            EventKind::WaiterRegistered => format!("[waiting] topic={topic:?}"),
            EventKind::SignalDelivered => format!(
                "[signal] topic={topic:?} waiters={}",
                e.count.unwrap_or_default()
            ),
            EventKind::SubscriberOverflow => format!(
                "[subscriber-overflow] subscriber={:?} reason={:?} dropped={}",
                e.subscriber,
                e.reason,
                e.count.unwrap_or_default()
            ),
            EventKind::SubscriberPanicked => format!(
                "[subscriber-panicked] subscriber={} info={}",
                e.subscriber.unwrap_or("unknown"),
                e.reason.as_deref().unwrap_or("unknown"),
            ),
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", Self::format(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
