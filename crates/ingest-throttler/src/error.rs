/// Errors surfaced by a [`crate::Throttler`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ThrottlerError {
    /// Surfaced from `enqueue_and_wait` or `wait_for_completion` when
    /// `quit_on_failure` is set and a task faulted.
    #[error("task {index} failed: {message}")]
    TaskFailed {
        /// The monotonic index of the task that faulted.
        index: u64,
        /// The faulted task's error, rendered via `Display`.
        message: String,
    },
}

/// Result type for throttler operations.
pub type Result<T> = std::result::Result<T, ThrottlerError>;
