//! Shared error kind for the ingest toolkit.
//!
//! Every component in this workspace returns [`IngestError`] rather than a
//! per-crate error type. This eliminates the `From` boilerplate that would
//! otherwise be needed to thread a remote-service error through
//! `RetryDriver`, `UploadQueue`, and `OperationScheduler` at once: each
//! component only needs to know the error *kind*, not its origin.

use std::time::Duration;

/// A single unified error type used across the ingest concurrency core.
///
/// The variants correspond to the error *kinds* the core distinguishes for
/// retry and spill decisions, not to specific downstream exceptions. Any
/// error from an external collaborator (the remote client, a user-supplied
/// closure) is expected to be classified into one of these kinds before it
/// reaches the core, typically via a small `From` impl in the calling crate.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A network-level failure expected to be transient (connection reset,
    /// DNS failure, timeout while connecting).
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The remote service rejected credentials or a token; may be
    /// recoverable after a token refresh.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// The remote service asked the caller to slow down (HTTP 429 or
    /// equivalent).
    #[error("rate limited{}", retry_after_suffix(.0))]
    RateLimited(Option<Duration>),

    /// The request was malformed; retrying without changing it will not
    /// help.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The remote service reports the resource already exists.
    #[error("conflict: item already exists")]
    ConflictDuplicate,

    /// The remote service reports the resource does not exist.
    #[error("not found")]
    NotFound,

    /// A 5xx-class (or equivalent) failure on the remote side.
    #[error("fatal server error: {0}")]
    FatalServer(String),

    /// A 4xx-class (or equivalent) failure that is not one of the other
    /// named client error kinds.
    #[error("fatal client error: {0}")]
    FatalClient(String),

    /// The operation was cancelled via its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// A caller-supplied argument violated a documented precondition
    /// (negative counts, out-of-range percentages, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration value could not be accepted at builder time.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An error from a downstream collaborator that doesn't need to be
    /// classified into one of the kinds above (surfaced as-is).
    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {:?})", d),
        None => String::new(),
    }
}

impl IngestError {
    /// Wraps an arbitrary error as [`IngestError::Other`].
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        IngestError::Other(Box::new(err))
    }

    /// Returns `true` for the kinds `RetryDriver`'s default classifier
    /// considers recoverable (spec.md §7): transient network errors, rate
    /// limiting, and auth rejection (the last is classifier-controlled but
    /// defaults to recoverable here since a token refresh commonly fixes it).
    pub fn is_retryable_class(&self) -> bool {
        matches!(
            self,
            IngestError::TransientNetwork(_)
                | IngestError::RateLimited(_)
                | IngestError::AuthRejected(_)
        )
    }

    /// Returns `true` if this is a 5xx-class (or equivalent) fatal, the
    /// class `UploadQueue` spills to disk instead of dropping.
    pub fn is_fatal_server_class(&self) -> bool {
        matches!(self, IngestError::FatalServer(_))
    }

    /// Returns `true` if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled)
    }
}

/// Convenience alias used throughout the toolkit.
pub type Result<T> = std::result::Result<T, IngestError>;
