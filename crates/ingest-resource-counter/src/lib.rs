//! An async-acquirable, dynamically resizable unit counter.
//!
//! `ResourceCounter` is the shared admission primitive other crates in this
//! toolkit block on before starting new work: a scheduler asking how many
//! chunks it may have in flight, an upload queue asking how many bytes it
//! may buffer before spilling to disk. It behaves like a counting semaphore
//! that can grant partial amounts and whose ceiling can change at runtime.
//!
//! ```rust
//! use ingest_resource_counter::ResourceCounter;
//!
//! # async fn example() {
//! let counter = ResourceCounter::new(4);
//! let granted = counter.take(3, true).await.unwrap();
//! assert_eq!(granted, 3);
//! counter.free(granted).unwrap();
//! # }
//! ```

pub mod counter;
pub mod error;

pub use counter::ResourceCounter;
pub use error::{ResourceCounterError, Result};
