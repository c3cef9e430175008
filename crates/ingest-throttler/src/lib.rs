//! Bounded-parallel task executor with EWMA-style rate ceilings.
//!
//! ```rust
//! use ingest_throttler::{Throttler, ThrottlerConfig};
//!
//! # async fn example() {
//! let throttler: Throttler<std::convert::Infallible> =
//!     Throttler::new(ThrottlerConfig::builder().max_parallel(4).build());
//!
//! for i in 0..10 {
//!     throttler.enqueue(move || async move {
//!         println!("task {i} running");
//!         Ok(())
//!     });
//! }
//! throttler.wait_for_completion().await.unwrap();
//! # }
//! ```

pub mod config;
pub mod error;
mod ewma;
pub mod events;
pub mod task_result;
mod throttler;

pub use config::{ThrottlerConfig, ThrottlerConfigBuilder};
pub use error::{Result, ThrottlerError};
pub use events::ThrottlerEvent;
pub use task_result::TaskResult;
pub use throttler::Throttler;
