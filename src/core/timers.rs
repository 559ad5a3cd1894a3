//! # Scene deadlines.
//!
//! [`Timers`] holds the two independent scene deadlines:
//!
//! - **absolute**: armed once in [`Timers::arm`], never moved;
//! - **inactivity**: moved to `now + inactivity` by [`Timers::rearm_inactivity`],
//!   which the backend calls before every wait step.
//!
//! [`Timers::fired`] resolves with the first deadline that passes and never
//! resolves when both are disabled. If both are due in the same poll the
//! absolute deadline wins.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep_until};

use crate::error::{SceneError, TimeoutKind};

struct Deadline {
    after: Duration,
    sleep: Pin<Box<Sleep>>,
}

impl Deadline {
    fn starting_now(after: Duration) -> Self {
        Self {
            after,
            sleep: Box::pin(sleep_until(deadline_from_now(after))),
        }
    }
}

pub(crate) struct Timers {
    inactivity: Option<Deadline>,
    absolute: Option<Deadline>,
}

impl Timers {
    /// Arms both deadlines from now; `None` disables a deadline.
    pub fn arm(inactivity: Option<Duration>, absolute: Option<Duration>) -> Self {
        Self {
            inactivity: inactivity.map(Deadline::starting_now),
            absolute: absolute.map(Deadline::starting_now),
        }
    }

    /// Pushes the inactivity deadline to `now + inactivity`.
    pub fn rearm_inactivity(&mut self) {
        if let Some(d) = self.inactivity.as_mut() {
            d.sleep.as_mut().reset(deadline_from_now(d.after));
        }
    }

    /// Instant at which the absolute deadline fires, if armed.
    #[cfg(test)]
    pub fn absolute_deadline(&self) -> Option<Instant> {
        self.absolute.as_ref().map(|d| d.sleep.deadline())
    }

    /// Resolves with a `Timeout` error once a deadline passes.
    ///
    /// Cancel safe: dropping the future leaves both deadlines untouched.
    pub async fn fired(&mut self) -> SceneError {
        let Self {
            inactivity,
            absolute,
        } = self;

        let (kind, after) = tokio::select! {
            biased;
            after = expire(absolute) => (TimeoutKind::Absolute, after),
            after = expire(inactivity) => (TimeoutKind::Inactivity, after),
        };
        SceneError::Timeout { kind, after }
    }
}

/// `now + after`, saturating to a far-future instant for huge durations.
fn deadline_from_now(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

async fn expire(deadline: &mut Option<Deadline>) -> Duration {
    match deadline {
        Some(d) => {
            d.sleep.as_mut().await;
            d.after
        }
        None => pending().await,
    }
}
