//! # Scene configuration.
//!
//! Provides [`SceneConfig`], the settings a scene is started with.
//!
//! ## Sentinel values
//! - `inactivity = 0s` → no inactivity timeout
//! - `absolute = 0s` → no absolute timeout
//! - `command_capacity = 0` / `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Configuration of one scene.
///
/// ## Field semantics
/// - `inactivity`: maximum idle time between two processed commands (`0s` = unlimited)
/// - `absolute`: maximum lifetime of the scene from start (`0s` = unlimited)
/// - `command_capacity`: slots of the command channel between callers and the backend
/// - `bus_capacity`: event bus ring buffer size
///
/// All fields are public. Prefer the accessors over checking the `0` sentinels by hand.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    /// Inactivity timeout, re-armed after every processed command.
    pub inactivity: Duration,

    /// Absolute timeout, armed once when the backend starts.
    pub absolute: Duration,

    /// Capacity of the command channel.
    ///
    /// Callers submitting while all slots are occupied wait for a free slot
    /// (or for the scene to end).
    pub command_capacity: usize,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events skip the
    /// oldest ones.
    pub bus_capacity: usize,
}

impl SceneConfig {
    /// Config with both timeouts set; `Duration::ZERO` disables either one.
    pub fn limited(inactivity: Duration, absolute: Duration) -> Self {
        Self {
            inactivity,
            absolute,
            ..Self::default()
        }
    }

    /// Returns the inactivity timeout as an `Option` (`None` = disabled).
    #[inline]
    pub fn inactivity_timeout(&self) -> Option<Duration> {
        non_zero(self.inactivity)
    }

    /// Returns the absolute timeout as an `Option` (`None` = disabled).
    #[inline]
    pub fn absolute_timeout(&self) -> Option<Duration> {
        non_zero(self.absolute)
    }

    /// Returns the command channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SceneConfig {
    /// Default configuration:
    ///
    /// - `inactivity = 0s` (disabled)
    /// - `absolute = 0s` (disabled)
    /// - `command_capacity = 1` (one pending command, the rest wait to submit)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            inactivity: Duration::ZERO,
            absolute: Duration::ZERO,
            command_capacity: 1,
            bus_capacity: 1024,
        }
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d == Duration::ZERO { None } else { Some(d) }
}
