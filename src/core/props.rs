//! # Prop table owned by the backend.
//!
//! Only the backend task touches a [`PropTable`]; nothing here is synchronized.
//!
//! ## Rules
//! - Keys are unique; [`store`](PropTable::store) never overwrites.
//! - A prop's cleanup is an `FnOnce` consumed on removal, so it runs at most once.
//! - A cleanup that panics is reported as `CleanupFailed`, like one that returns an error.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::core::envelope::Cleanup;
use crate::core::supervised::panic_info;
use crate::error::SceneError;

struct Prop<V> {
    value: V,
    cleanup: Option<Cleanup<V>>,
}

/// Outcome of cleaning up every remaining prop.
#[derive(Debug, Default)]
pub(crate) struct Teardown {
    /// Number of props removed.
    pub removed: usize,
    /// Every cleanup failure, in visitation order.
    pub failures: Vec<SceneError>,
}

impl Teardown {
    /// The first failure in visitation order, if any.
    pub fn first_failure(&self) -> Option<&SceneError> {
        self.failures.first()
    }
}

/// Map from key to prop.
pub(crate) struct PropTable<V> {
    props: HashMap<String, Prop<V>>,
}

impl<V> PropTable<V> {
    pub fn new() -> Self {
        Self {
            props: HashMap::new(),
        }
    }

    /// Inserts a new prop; fails if the key is present.
    pub fn store(
        &mut self,
        key: String,
        value: V,
        cleanup: Option<Cleanup<V>>,
    ) -> Result<(), SceneError> {
        match self.props.entry(key) {
            Entry::Occupied(e) => Err(SceneError::PropAlreadyExists {
                key: e.key().clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(Prop { value, cleanup });
                Ok(())
            }
        }
    }

    /// Returns a copy of the value stored under `key`.
    pub fn fetch(&self, key: &str) -> Result<V, SceneError>
    where
        V: Clone,
    {
        self.props
            .get(key)
            .map(|prop| prop.value.clone())
            .ok_or_else(|| SceneError::PropNotFound {
                key: key.to_string(),
            })
    }

    /// Removes the prop under `key` and runs its cleanup.
    ///
    /// The entry is gone even when the cleanup fails; the value is then dropped
    /// and `CleanupFailed` returned instead.
    pub fn dispose(&mut self, key: &str) -> Result<V, SceneError> {
        let (key, prop) = self
            .props
            .remove_entry(key)
            .ok_or_else(|| SceneError::PropNotFound {
                key: key.to_string(),
            })?;
        run_cleanup(&key, prop)
    }

    /// Removes every prop, running all cleanups even after a failure.
    pub fn teardown(&mut self) -> Teardown {
        let mut report = Teardown::default();
        for (key, prop) in self.props.drain() {
            report.removed += 1;
            if let Err(e) = run_cleanup(&key, prop) {
                report.failures.push(e);
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

fn run_cleanup<V>(key: &str, prop: Prop<V>) -> Result<V, SceneError> {
    let Prop { value, cleanup } = prop;
    let Some(cleanup) = cleanup else {
        return Ok(value);
    };
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cleanup(key, &value)));
    match outcome {
        Ok(Ok(())) => Ok(value),
        Ok(Err(e)) => Err(SceneError::cleanup_failed(key, e)),
        Err(payload) => Err(SceneError::cleanup_failed(
            key,
            format!("cleanup panicked: {}", panic_info(&*payload)),
        )),
    }
}
