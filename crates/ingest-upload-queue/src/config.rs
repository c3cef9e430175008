use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration for an [`crate::UploadQueue`].
#[derive(Debug, Clone)]
pub struct UploadQueueConfig {
    pub(crate) max_size: usize,
    pub(crate) interval: Duration,
    pub(crate) buffer_path: Option<PathBuf>,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) name: String,
}

impl Default for UploadQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 0,
            interval: Duration::ZERO,
            buffer_path: None,
            shutdown_timeout: Duration::from_secs(60),
            name: "upload-queue".to_string(),
        }
    }
}

impl UploadQueueConfig {
    /// Starts building a config with the defaults described below.
    pub fn builder() -> UploadQueueConfigBuilder {
        UploadQueueConfigBuilder::new()
    }
}

/// Builder for [`UploadQueueConfig`].
pub struct UploadQueueConfigBuilder {
    inner: UploadQueueConfig,
}

impl Default for UploadQueueConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueueConfigBuilder {
    /// Defaults: no size trigger, no timer trigger, no spill file, a
    /// 60-second shutdown safety timeout.
    pub fn new() -> Self {
        Self {
            inner: UploadQueueConfig::default(),
        }
    }

    /// Flush once the queue reaches this many items. `0` disables the size
    /// trigger.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.inner.max_size = max_size;
        self
    }

    /// Flush on this timer. `Duration::ZERO` disables the timer trigger.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.inner.interval = interval;
        self
    }

    /// Enables disk spillover on transient server-class flush failures.
    pub fn buffer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.buffer_path = Some(path.into());
        self
    }

    /// Caps how long `shutdown` waits for the final flush before logging a
    /// warning and returning anyway.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.inner.shutdown_timeout = timeout;
        self
    }

    /// A name used in log lines and metric labels.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Finishes the config.
    pub fn build(self) -> UploadQueueConfig {
        self.inner
    }
}
