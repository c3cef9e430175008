//! Capped exponential backoff retry driver.
//!
//! ```rust
//! use ingest_retry::{retry, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ingest_core::Result<()> {
//! let policy = RetryPolicy::builder().max_attempts(5).build();
//! let cancel = CancellationToken::new();
//!
//! retry("fetch-page", || async { Ok(()) }, &policy, &cancel).await
//! # }
//! ```

pub mod config;
mod retry;

pub use config::{RetryPolicy, RetryPolicyBuilder};
pub use retry::{retry, retry_result};
