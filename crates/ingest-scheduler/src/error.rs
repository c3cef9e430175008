//! Error type for the periodic scheduler.

/// Errors a [`crate::PeriodicScheduler`] can surface.
///
/// Child task failures are captured as a message string (via `ToString`) at
/// the moment of failure rather than requiring the task's error type to
/// implement `Clone`, the same convention `ingest-throttler` uses for its
/// `quit_on_failure` fault.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    /// A scheduled task returned an error; the supervisor surfaces only the
    /// first one seen.
    #[error("task {name:?} failed: {message}")]
    TaskFailed { name: String, message: String },

    /// `schedulePeriodic`/`scheduleTask` was called with a name already in
    /// use.
    #[error("duplicate task name: {0:?}")]
    DuplicateName(String),

    /// `pause`/`trigger`/`exitAndWait` referenced a name that isn't
    /// registered.
    #[error("unknown task name: {0:?}")]
    UnknownName(String),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
