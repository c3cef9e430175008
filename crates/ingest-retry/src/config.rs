use std::time::Duration;

/// A capped exponential backoff policy. Immutable after construction.
///
/// `max_attempts` counts the initial attempt, so `max_attempts(3)` means one
/// initial attempt plus up to two retries. `0` means unbounded. `timeout`
/// bounds the total wall-clock time spent retrying (not counting the final
/// attempt itself); `0` means unbounded. `max_delay` caps the backoff
/// growth; `0` means uncapped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub(crate) max_attempts: u64,
    pub(crate) timeout: Duration,
    pub(crate) initial_delay: Duration,
    pub(crate) max_delay: Duration,
}

impl RetryPolicy {
    /// Starts building a policy with the defaults described below.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// The delay before the `n`th retry (`n` is 0-indexed: the first retry
    /// is `n = 0`), following `min(max_delay, initial_delay * 2^min(n, 13))`.
    /// The exponent is capped at 13 so the multiplier never exceeds 8192,
    /// keeping the multiplication from overflowing `Duration`.
    pub fn delay_for_retry(&self, n: u64) -> Duration {
        let exponent = n.min(13) as u32;
        let multiplier = 1u32 << exponent;
        let raw = self.initial_delay.saturating_mul(multiplier);
        if self.max_delay.is_zero() {
            raw
        } else {
            raw.min(self.max_delay)
        }
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder {
    max_attempts: u64,
    timeout: Duration,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicyBuilder {
    /// Defaults: 3 max attempts, no deadline, 100ms initial delay, no delay cap.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::ZERO,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::ZERO,
        }
    }

    /// Total attempts allowed, including the first. `0` is unbounded.
    pub fn max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wall-clock deadline for the whole retry loop. `Duration::ZERO` is unbounded.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay before the first retry.
    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Ceiling on backoff growth. `Duration::ZERO` is uncapped.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Finishes the policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: self.timeout,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
        }
    }
}
