//! # Request protocol between scene callers and the backend.
//!
//! Every caller operation travels as an [`Envelope`]: one [`Command`] plus a
//! private one-shot channel for the [`Reply`].
//!
//! ```text
//! Scene::fetch("k") ─► Envelope { Fetch{k}, reply_tx } ─► command channel ─► Backend
//!                                                                              │
//! Scene::fetch("k") ◄──────────── reply_rx ◄── Result<Reply::Value(v), _> ◄───┘
//! ```
//!
//! ## Rules
//! - Exactly one reply per envelope; a dropped envelope drops its reply sender,
//!   which the caller observes as "scene ending".
//! - The caller knows which reply variant its command produces; any other
//!   variant is a protocol bug and panics.

use tokio::sync::oneshot;

use crate::error::{BoxError, SceneError};

/// Cleanup bound to a prop at store time; runs at most once.
pub(crate) type Cleanup<V> = Box<dyn FnOnce(&str, &V) -> Result<(), BoxError> + Send>;

/// Operation executed by the backend.
pub(crate) enum Command<V> {
    Store {
        key: String,
        value: V,
        cleanup: Option<Cleanup<V>>,
    },
    Fetch {
        key: String,
    },
    Dispose {
        key: String,
    },
    Signal {
        topic: String,
    },
    Subscribe {
        topic: String,
        waiter: oneshot::Sender<()>,
    },
}

impl<V> Command<V> {
    /// Short stable name of the command.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Store { .. } => "store",
            Command::Fetch { .. } => "fetch",
            Command::Dispose { .. } => "dispose",
            Command::Signal { .. } => "signal",
            Command::Subscribe { .. } => "subscribe",
        }
    }
}

/// Successful outcome of a command.
#[derive(Debug)]
pub(crate) enum Reply<V> {
    /// Command succeeded without a payload.
    Done,
    /// Command produced a value (fetch, dispose).
    Value(V),
}

impl<V> Reply<V> {
    /// Unwraps the value of a fetch/dispose reply.
    ///
    /// # Panics
    /// Panics on `Reply::Done`: the backend answered a value command with the
    /// wrong reply kind, which is an internal protocol violation.
    pub fn into_value(self, command: &'static str) -> V {
        match self {
            Reply::Value(v) => v,
            Reply::Done => unreachable!("{command} command answered without a value"),
        }
    }
}

/// Result carried back on the reply channel.
pub(crate) type Response<V> = Result<Reply<V>, SceneError>;

/// A command paired with its one-shot reply channel.
pub(crate) struct Envelope<V> {
    command: Command<V>,
    reply: oneshot::Sender<Response<V>>,
}

impl<V> Envelope<V> {
    /// Creates an envelope and the receiver its reply will arrive on.
    pub fn new(command: Command<V>) -> (Self, oneshot::Receiver<Response<V>>) {
        let (reply, rx) = oneshot::channel();
        (Self { command, reply }, rx)
    }

    /// Splits the envelope for processing.
    pub fn into_parts(self) -> (Command<V>, Responder<V>) {
        (self.command, Responder { reply: self.reply })
    }
}

/// Sending half of a reply channel, consumed by answering.
pub(crate) struct Responder<V> {
    reply: oneshot::Sender<Response<V>>,
}

impl<V> Responder<V> {
    /// Sends the response; a caller that stopped listening is ignored.
    pub fn respond(self, response: Response<V>) {
        let _ = self.reply.send(response);
    }
}
