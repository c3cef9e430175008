//! Error type for the resource counter.

/// Errors that can occur when operating a [`crate::ResourceCounter`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceCounterError {
    /// `take`, `free`, or `set_capacity` was called with a negative amount.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for resource counter operations.
pub type Result<T> = std::result::Result<T, ResourceCounterError>;
