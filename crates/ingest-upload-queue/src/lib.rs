//! Batched producer/consumer upload queue.
//!
//! Items enqueue without blocking and are flushed in batches on whichever
//! trigger fires first: a size threshold, an interval timer, an explicit
//! [`UploadQueue::trigger`] call, or [`UploadQueue::shutdown`]. On a
//! fatal-server-class failure, a flushed batch can be spilled to disk and
//! recovered on a later flush once connectivity returns.
//!
//! ```rust,no_run
//! use ingest_upload_queue::{UploadQueue, UploadQueueConfig, UploadResult};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let config = UploadQueueConfig::builder().max_size(100).build();
//! let queue: UploadQueue<String> = UploadQueue::new(
//!     config,
//!     |items, _cancel| Box::pin(async move { UploadResult::uploaded(items.len()) }),
//!     |_result| {},
//!     CancellationToken::new(),
//! );
//!
//! queue.enqueue("datapoint".to_string());
//! queue.shutdown().await;
//! # }
//! ```

pub mod config;
pub mod events;
mod queue;
mod result;
pub mod spill;

pub use config::{UploadQueueConfig, UploadQueueConfigBuilder};
pub use events::UploadQueueEvent;
pub use queue::UploadQueue;
pub use result::UploadResult;
