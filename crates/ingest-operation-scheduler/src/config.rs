/// Tuning knobs for [`crate::run`].
#[derive(Debug, Clone, Copy)]
pub struct OperationSchedulerConfig {
    pub(crate) chunk_size: usize,
    pub(crate) max_request: usize,
}

impl Default for OperationSchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 0,
            max_request: 0,
        }
    }
}

impl OperationSchedulerConfig {
    /// Starts building a config with the defaults described below.
    pub fn builder() -> OperationSchedulerConfigBuilder {
        OperationSchedulerConfigBuilder::new()
    }
}

/// Builder for [`OperationSchedulerConfig`].
pub struct OperationSchedulerConfigBuilder {
    chunk_size: usize,
    max_request: usize,
}

impl Default for OperationSchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationSchedulerConfigBuilder {
    /// Defaults: `chunk_size = 0` (unbounded within the granted capacity),
    /// `max_request = 0` (request as much fresh capacity as there is
    /// backlog).
    pub fn new() -> Self {
        Self {
            chunk_size: 0,
            max_request: 0,
        }
    }

    /// Items per chunk submitted to the throttler. `0` means each round's
    /// whole granted batch is a single chunk.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Ceiling on fresh capacity requested per round, regardless of backlog
    /// size. `0` means unbounded (request the whole fresh backlog).
    pub fn max_request(mut self, max_request: usize) -> Self {
        self.max_request = max_request;
        self
    }

    /// Finishes the config.
    pub fn build(self) -> OperationSchedulerConfig {
        OperationSchedulerConfig {
            chunk_size: self.chunk_size,
            max_request: self.max_request,
        }
    }
}
