//! # SubscriberSet: delivery of scene events to subscribers.
//!
//! A scene built with subscribers runs one forwarder ([`SubscriberSet::forward`])
//! beside its backend. The forwarder reads the scene bus and hands each event to
//! a bounded queue per subscriber; one worker per subscriber drains its queue
//! into [`Subscribe::on_event`].
//!
//! ```text
//! Bus ──► forward ─┬─► [queue A] ─► worker A ─► on_event()
//!                  └─► [queue B] ─► worker B ─► on_event()
//!
//! backend ended ─► drain the bus ─► close queues ─► join workers
//! ```
//!
//! ## Delivery
//! - Order is kept per subscriber, not across subscribers.
//! - A full or closed queue drops the event for that subscriber only. The set
//!   publishes `SubscriberOverflow` with the subscriber's running drop count.
//! - A forwarder that fell behind the bus reports the gap as `SubscriberOverflow`
//!   with reason `"lagged"` for every subscriber.
//! - A panic in `on_event` is published as `SubscriberPanicked` and the worker
//!   moves on to the next event.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;

use super::Subscribe;
use crate::core::panic_info;
use crate::events::{Bus, Event};

struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: usize,
}

/// Subscribers of one scene, each behind its own queue and worker task.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: JoinSet<()>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber; drops and panics are reported on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut workers = JoinSet::new();
        let queues = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let name = sub.name();
                workers.spawn(deliver(sub, rx, bus.clone()));
                Queue {
                    name,
                    tx,
                    dropped: 0,
                }
            })
            .collect();

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// True if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues `event` for every subscriber without waiting.
    ///
    /// Overflow events are never reported about themselves.
    pub fn emit(&mut self, event: &Event) {
        let report = !event.is_subscriber_overflow();
        let shared = Arc::new(event.clone());

        for q in &mut self.queues {
            let reason = match q.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            q.dropped = q.dropped.saturating_add(1);
            if report {
                self.bus
                    .publish(Event::subscriber_overflow(q.name, reason).with_count(q.dropped));
            }
        }
    }

    /// Feeds `events` to the subscribers until `ended` resolves, then delivers
    /// what the bus still buffers and shuts the workers down.
    pub async fn forward(
        mut self,
        mut events: broadcast::Receiver<Event>,
        ended: impl Future<Output = ()>,
    ) {
        tokio::pin!(ended);
        loop {
            tokio::select! {
                biased;
                ev = events.recv() => match ev {
                    Ok(ev) => self.emit(&ev),
                    Err(RecvError::Lagged(missed)) => self.lagged(missed),
                    Err(RecvError::Closed) => break,
                },
                () = &mut ended => break,
            }
        }
        loop {
            match events.try_recv() {
                Ok(ev) => self.emit(&ev),
                Err(TryRecvError::Lagged(missed)) => self.lagged(missed),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        self.shutdown().await;
    }

    /// Closes every queue and waits until the workers handled what was queued.
    pub async fn shutdown(mut self) {
        self.queues.clear();
        while self.workers.join_next().await.is_some() {}
    }

    fn lagged(&mut self, missed: u64) {
        let missed = usize::try_from(missed).unwrap_or(usize::MAX);
        for q in &mut self.queues {
            q.dropped = q.dropped.saturating_add(missed);
            self.bus
                .publish(Event::subscriber_overflow(q.name, "lagged").with_count(q.dropped));
        }
    }
}

async fn deliver(sub: Arc<dyn Subscribe>, mut queue: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = queue.recv().await {
        let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_info(&*payload)));
        }
    }
}
