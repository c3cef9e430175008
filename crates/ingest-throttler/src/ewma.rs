//! Exponentially discounted recent-activity tracker.
//!
//! Mirrors the sliding-log style used elsewhere in this toolkit's ancestry:
//! completions are appended to a log and the log is pruned lazily whenever
//! totals are recomputed, rather than maintained as a running accumulator.
//! That keeps the discount math exact (recomputed against the current
//! instant) at the cost of revisiting records whose contribution hasn't yet
//! decayed below the pruning threshold.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Below this, a record's contribution is indistinguishable from zero at
/// `f64` precision and can be dropped instead of carried forever.
const PRUNE_THRESHOLD: f64 = 1e-9;

fn discount(now: Instant, since: Instant, unit_secs: f64) -> f64 {
    let diff_units = now.saturating_duration_since(since).as_secs_f64() / unit_secs;
    2f64.powf(-diff_units.floor())
}

/// Two independently discounted logs: `scheduled` is charged the instant a
/// task is admitted (so a back-to-back burst is gated immediately, not only
/// once tasks start completing), while `completions` records actual
/// wall-clock usage and can only be charged once a task finishes.
#[derive(Debug, Default)]
pub(crate) struct EwmaState {
    scheduled: VecDeque<Instant>,
    completions: VecDeque<(Instant, Duration)>,
}

impl EwmaState {
    /// Charges one admitted task against the count ceiling, effective
    /// immediately.
    pub(crate) fn record_scheduled(&mut self, at: Instant) {
        self.scheduled.push_back(at);
    }

    /// Charges a finished task's wall-clock usage against the usage
    /// ceiling.
    pub(crate) fn record_completion(&mut self, start_time: Instant, usage: Duration) {
        self.completions.push_back((start_time, usage));
    }

    /// Returns `(discounted_count, discounted_usage_fraction)` as of now,
    /// pruning records whose discount has decayed past [`PRUNE_THRESHOLD`].
    ///
    /// `unit` must be non-zero; callers disable rate ceilings entirely when
    /// `unit` is zero rather than calling this.
    pub(crate) fn totals(&mut self, unit: Duration) -> (f64, f64) {
        let now = Instant::now();
        let unit_secs = unit.as_secs_f64();

        while let Some(&since) = self.scheduled.front() {
            if discount(now, since, unit_secs) < PRUNE_THRESHOLD {
                self.scheduled.pop_front();
            } else {
                break;
            }
        }
        while let Some(&(start, _)) = self.completions.front() {
            if discount(now, start, unit_secs) < PRUNE_THRESHOLD {
                self.completions.pop_front();
            } else {
                break;
            }
        }

        let count_total: f64 = self.scheduled.iter().map(|&since| discount(now, since, unit_secs)).sum();
        let usage_total: f64 = self
            .completions
            .iter()
            .map(|&(start, usage)| (usage.as_secs_f64() / unit_secs) * discount(now, start, unit_secs))
            .sum();
        (count_total, usage_total)
    }
}
