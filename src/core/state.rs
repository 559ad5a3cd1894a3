//! Observable scene state.
//!
//! The backend is the only writer; every [`Scene`](crate::Scene) clone reads the
//! same cell. Transitions only move forward: `Active → Ending → Ended`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SceneState {
    /// Accepting and processing commands.
    Active,
    /// No longer accepting commands; teardown in progress.
    Ending,
    /// Teardown finished; the terminal result is fixed.
    Ended,
}

impl SceneState {
    /// Returns a short stable label (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneState::Active => "active",
            SceneState::Ending => "ending",
            SceneState::Ended => "ended",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SceneState::Active,
            1 => SceneState::Ending,
            _ => SceneState::Ended,
        }
    }
}

impl std::fmt::Display for SceneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn get(&self) -> SceneState {
        SceneState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves forward to `next`; never moves back.
    pub fn advance(&self, next: SceneState) {
        self.0.fetch_max(next as u8, Ordering::AcqRel);
    }
}
