use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::error::{FailureBudgetError, Result};

struct State<K> {
    failed: HashSet<K>,
    pct: f64,
    total: u64,
}

impl<K> State<K> {
    fn threshold(&self) -> u64 {
        ((self.total as f64) * self.pct / 100.0).floor() as u64
    }
}

/// Tracks distinct failed keys against a percentage-of-total ceiling and
/// trips a [`CancellationToken`] exactly once when the ceiling is exceeded.
///
/// Re-failing an already-failed key is a no-op: the budget only cares about
/// the number of *distinct* keys that have failed, not the failure count.
pub struct FailureBudget<K> {
    state: Mutex<State<K>>,
    cancel: CancellationToken,
}

impl<K> FailureBudget<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a budget with `pct` percent of `total` items allowed to fail
    /// before `cancel` fires. `pct` must be within `[0, 100]`.
    pub fn new(pct: f64, total: u64, cancel: CancellationToken) -> Result<Self> {
        validate_pct(pct)?;
        Ok(Self {
            state: Mutex::new(State {
                failed: HashSet::new(),
                pct,
                total,
            }),
            cancel,
        })
    }

    /// Marks `key` as failed. A no-op if `key` was already marked. Trips the
    /// cancellation token if the new failed-key count exceeds the ceiling.
    pub fn mark_failed(&self, key: K) {
        let mut state = self.state.lock().unwrap();
        state.failed.insert(key);
        let threshold = state.threshold();
        let count = state.failed.len() as u64;
        drop(state);

        if count > threshold {
            #[cfg(feature = "tracing")]
            if !self.cancel.is_cancelled() {
                tracing::warn!(count, threshold, "failure budget exceeded");
            }
            self.cancel.cancel();
        }
    }

    /// Resets the ceiling. Re-evaluates the already-failed set against the
    /// new ceiling, which may trip cancellation immediately if the existing
    /// failures already exceed it.
    ///
    /// When `validate` is `true`, `pct` outside `[0, 100]` is rejected and
    /// the budget is left unchanged.
    pub fn update_budget(&self, pct: f64, total: u64, validate: bool) -> Result<()> {
        if validate {
            validate_pct(pct)?;
        }
        let mut state = self.state.lock().unwrap();
        state.pct = pct;
        state.total = total;
        let threshold = state.threshold();
        let count = state.failed.len() as u64;
        drop(state);

        if count > threshold {
            self.cancel.cancel();
        }
        Ok(())
    }

    /// The number of distinct keys marked failed so far.
    pub fn failed_count(&self) -> u64 {
        self.state.lock().unwrap().failed.len() as u64
    }

    /// Whether the attached cancellation token has fired.
    pub fn is_tripped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn validate_pct(pct: f64) -> Result<()> {
    if (0.0..=100.0).contains(&pct) {
        Ok(())
    } else {
        Err(FailureBudgetError::InvalidPercentage(pct))
    }
}
