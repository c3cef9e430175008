//! Per-key failure tracking that trips a cancellation token past a
//! configurable ceiling.
//!
//! ```rust
//! use ingest_failure_budget::FailureBudget;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn example() -> ingest_failure_budget::Result<()> {
//! let cancel = CancellationToken::new();
//! let budget = FailureBudget::new(20.0, 10, cancel.clone())?;
//! budget.mark_failed("item-1");
//! assert!(!cancel.is_cancelled());
//! # Ok(())
//! # }
//! ```

mod budget;
pub mod error;

pub use budget::FailureBudget;
pub use error::{FailureBudgetError, Result};
