use std::time::Duration;

/// Configuration for a [`crate::Throttler`]. Immutable after construction.
#[derive(Debug, Clone)]
pub struct ThrottlerConfig {
    pub(crate) max_parallel: u64,
    pub(crate) max_per_unit: u64,
    pub(crate) max_usage_per_unit: f64,
    pub(crate) unit: Duration,
    pub(crate) quit_on_failure: bool,
    pub(crate) name: String,
}

impl ThrottlerConfig {
    /// Starts building a config with the defaults described below.
    pub fn builder() -> ThrottlerConfigBuilder {
        ThrottlerConfigBuilder::new()
    }
}

/// Builder for [`ThrottlerConfig`].
pub struct ThrottlerConfigBuilder {
    max_parallel: u64,
    max_per_unit: u64,
    max_usage_per_unit: f64,
    unit: Duration,
    quit_on_failure: bool,
    name: String,
}

impl Default for ThrottlerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ThrottlerConfigBuilder {
    /// Defaults: unbounded parallelism, no rate ceilings, `unit` zero
    /// (which disables both rate ceilings), `quit_on_failure` false.
    pub fn new() -> Self {
        Self {
            max_parallel: 0,
            max_per_unit: 0,
            max_usage_per_unit: 0.0,
            unit: Duration::ZERO,
            quit_on_failure: false,
            name: "<unnamed>".to_string(),
        }
    }

    /// Maximum number of tasks running concurrently. `0` disables the cap.
    pub fn max_parallel(mut self, max_parallel: u64) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Maximum discounted count of completions per `unit`. Only enforced
    /// when `unit` is non-zero.
    pub fn max_per_unit(mut self, max_per_unit: u64) -> Self {
        self.max_per_unit = max_per_unit;
        self
    }

    /// Maximum discounted wall-clock usage fraction per `unit`. Only
    /// enforced when `unit` is non-zero.
    pub fn max_usage_per_unit(mut self, max_usage_per_unit: f64) -> Self {
        self.max_usage_per_unit = max_usage_per_unit;
        self
    }

    /// The averaging unit used by both EWMA ceilings. Zero disables both.
    pub fn unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// When set, the first faulted task stops further scheduling and the
    /// fault is surfaced from [`crate::Throttler::wait_for_completion`].
    pub fn quit_on_failure(mut self, quit_on_failure: bool) -> Self {
        self.quit_on_failure = quit_on_failure;
        self
    }

    /// Name used in tracing spans and metrics labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Finishes the config.
    pub fn build(self) -> ThrottlerConfig {
        ThrottlerConfig {
            max_parallel: self.max_parallel,
            max_per_unit: self.max_per_unit,
            max_usage_per_unit: self.max_usage_per_unit,
            unit: self.unit,
            quit_on_failure: self.quit_on_failure,
            name: self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded() {
        let config = ThrottlerConfig::builder().build();
        assert_eq!(config.max_parallel, 0);
        assert_eq!(config.unit, Duration::ZERO);
        assert!(!config.quit_on_failure);
    }

    #[test]
    fn builder_applies_every_field() {
        let config = ThrottlerConfig::builder()
            .max_parallel(2)
            .max_per_unit(5)
            .max_usage_per_unit(0.5)
            .unit(Duration::from_secs(1))
            .quit_on_failure(true)
            .name("ingest")
            .build();
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.max_per_unit, 5);
        assert_eq!(config.max_usage_per_unit, 0.5);
        assert_eq!(config.unit, Duration::from_secs(1));
        assert!(config.quit_on_failure);
        assert_eq!(config.name, "ingest");
    }
}
