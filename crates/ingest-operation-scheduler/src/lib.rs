//! Single-planner scheduler for recursive, chunked exploration: couples a
//! shared [`ingest_resource_counter::ResourceCounter`] admission budget to a
//! shared [`ingest_throttler::Throttler`] execution pool.
//!
//! ```rust
//! use ingest_operation_scheduler::{run, ChunkOutcome, OperationSchedulerConfig};
//! use ingest_resource_counter::ResourceCounter;
//! use ingest_throttler::{Throttler, ThrottlerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ingest_core::Result<()> {
//! let resource = ResourceCounter::new(4);
//! let throttler = Throttler::new(ThrottlerConfig::builder().build());
//! let config = OperationSchedulerConfig::builder().chunk_size(2).build();
//! let cancel = CancellationToken::new();
//!
//! let summary = run(
//!     &resource,
//!     &throttler,
//!     &config,
//!     vec![1, 2, 3],
//!     |items: Vec<i32>| async move { ChunkOutcome::done(items) },
//!     &cancel,
//! )
//! .await?;
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```

mod chunk;
mod config;
mod scheduler;

pub use chunk::ChunkOutcome;
pub use config::{OperationSchedulerConfig, OperationSchedulerConfigBuilder};
pub use scheduler::{run, OperationSummary};
