//! Error type for the failure budget.

/// Errors a [`crate::FailureBudget`] can surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FailureBudgetError {
    /// `update_budget` was called with a percentage outside `[0, 100]`.
    #[error("invalid percentage: {0} (must be within [0, 100])")]
    InvalidPercentage(f64),
}

/// Result type for failure budget operations.
pub type Result<T> = std::result::Result<T, FailureBudgetError>;
