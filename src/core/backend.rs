//! # Scene backend: the single owner of props and subscriptions.
//!
//! [`Backend::run`] is the supervised loop behind every [`Scene`](crate::Scene).
//! It is the only code that reads or writes the prop table and the subscription
//! table, so neither needs a lock.
//!
//! ## Loop
//! ```text
//! arm timers ─► publish SceneStarted
//! loop {
//!   rearm inactivity
//!   select (biased) {
//!     stop requested          ─► break (graceful)
//!     deadline fired          ─► publish TimeoutHit, break (Timeout)
//!     next envelope           ─► process, reply, continue
//!     all Scene handles gone  ─► break (graceful)
//!   }
//! }
//! publish SceneEnding ─► close channel ─► teardown props ─► release waiters
//! publish SceneEnded  ─► return terminal result
//! ```
//!
//! ## Rules
//! - A stop request or a fired deadline wins over queued commands; queued
//!   envelopes are dropped unanswered and their callers see the scene ending.
//! - A fired deadline concludes the loop: an abort arriving during teardown no
//!   longer replaces the `Timeout` cause.
//! - Teardown runs every cleanup even after a failure; the first failure only
//!   becomes the result when the scene was stopped gracefully.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::core::envelope::{Command, Envelope, Reply, Response};
use crate::core::props::PropTable;
use crate::core::signals::Subscriptions;
use crate::core::state::{SceneState, StateCell};
use crate::core::supervised::LoopContext;
use crate::core::timers::Timers;
use crate::error::SceneError;
use crate::events::{Bus, Event, EventKind};

pub(crate) struct Backend<V> {
    props: PropTable<V>,
    subscriptions: Subscriptions,
    commands: mpsc::Receiver<Envelope<V>>,
    bus: Bus,
    state: StateCell,
    inactivity: Option<Duration>,
    absolute: Option<Duration>,
}

impl<V> Backend<V>
where
    V: Clone + Send + 'static,
{
    pub fn new(
        commands: mpsc::Receiver<Envelope<V>>,
        bus: Bus,
        state: StateCell,
        inactivity: Option<Duration>,
        absolute: Option<Duration>,
    ) -> Self {
        Self {
            props: PropTable::new(),
            subscriptions: Subscriptions::new(),
            commands,
            bus,
            state,
            inactivity,
            absolute,
        }
    }

    /// Runs until stopped, timed out, or abandoned by every handle.
    pub async fn run(mut self, ctx: LoopContext) -> Result<(), SceneError> {
        let mut timers = Timers::arm(self.inactivity, self.absolute);
        self.publish_started();

        let cause = loop {
            timers.rearm_inactivity();
            tokio::select! {
                biased;
                _ = ctx.stopped() => break None,
                err = timers.fired() => {
                    ctx.conclude();
                    if let SceneError::Timeout { kind, after } = &err {
                        self.bus.publish(
                            Event::new(EventKind::TimeoutHit)
                                .with_reason(kind.as_str())
                                .with_timeout(*after),
                        );
                    }
                    break Some(err);
                }
                next = self.commands.recv() => match next {
                    Some(env) => self.process(env),
                    None => {
                        ctx.conclude();
                        break None;
                    }
                },
            }
        };

        self.state.advance(SceneState::Ending);
        self.bus
            .publish(Event::new(EventKind::SceneEnding).with_count(self.props.len()));
        self.commands.close();

        let report = self.props.teardown();
        for failure in &report.failures {
            self.bus.publish(cleanup_failed_event(failure));
        }
        self.subscriptions.release_all();

        let res = match cause {
            Some(err) => Err(err),
            None => report.first_failure().cloned().map_or(Ok(()), Err),
        };

        self.state.advance(SceneState::Ended);
        let mut ended = Event::new(EventKind::SceneEnded).with_count(report.removed);
        if let Err(e) = &res {
            ended = ended.with_reason(e.to_string());
        }
        self.bus.publish(ended);
        res
    }

    fn publish_started(&self) {
        let mut ev = Event::new(EventKind::SceneStarted);
        if let Some(d) = self.absolute {
            ev = ev.with_timeout(d);
        }
        if let Some(d) = self.inactivity {
            ev = ev.with_inactivity(d);
        }
        self.bus.publish(ev);
    }

    /// Executes one command and answers its caller.
    fn process(&mut self, env: Envelope<V>) {
        let (command, responder) = env.into_parts();
        let response: Response<V> = match command {
            Command::Store {
                key,
                value,
                cleanup,
            } => {
                let ev = Event::new(EventKind::PropStored).with_key(key.as_str());
                self.props.store(key, value, cleanup).map(|()| {
                    self.bus.publish(ev);
                    Reply::Done
                })
            }
            Command::Fetch { key } => self.props.fetch(&key).map(|v| {
                self.bus
                    .publish(Event::new(EventKind::PropFetched).with_key(key));
                Reply::Value(v)
            }),
            Command::Dispose { key } => self.props.dispose(&key).map(|v| {
                self.bus
                    .publish(Event::new(EventKind::PropDisposed).with_key(key));
                Reply::Value(v)
            }),
            Command::Signal { topic } => self.subscriptions.signal(&topic).map(|woken| {
                self.bus.publish(
                    Event::new(EventKind::SignalDelivered)
                        .with_topic(topic)
                        .with_count(woken),
                );
                Reply::Done
            }),
            Command::Subscribe { topic, waiter } => {
                self.bus
                    .publish(Event::new(EventKind::WaiterRegistered).with_topic(topic.as_str()));
                self.subscriptions.subscribe(topic, waiter);
                Ok(Reply::Done)
            }
        };

        if let Err(err) = &response {
            self.bus.publish(rejected_event(err));
        }
        responder.respond(response);
    }
}

fn cleanup_failed_event(err: &SceneError) -> Event {
    match err {
        SceneError::CleanupFailed { key, source } => Event::new(EventKind::CleanupFailed)
            .with_key(key.as_str())
            .with_reason(source.to_string()),
        other => Event::new(EventKind::CleanupFailed).with_reason(other.to_string()),
    }
}

fn rejected_event(err: &SceneError) -> Event {
    match err {
        SceneError::CleanupFailed { .. } => cleanup_failed_event(err),
        SceneError::PropAlreadyExists { key } | SceneError::PropNotFound { key } => {
            Event::new(EventKind::CommandRejected)
                .with_key(key.as_str())
                .with_reason(err.as_label())
        }
        SceneError::NoSubscriber { topic } => Event::new(EventKind::CommandRejected)
            .with_topic(topic.as_str())
            .with_reason(err.as_label()),
        other => Event::new(EventKind::CommandRejected).with_reason(other.as_label()),
    }
}
