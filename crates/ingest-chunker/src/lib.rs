//! Pure combinators for turning heterogeneous key→value streams into
//! size-bounded batches, plus a fixed-parallelism fan-out helper.
//!
//! Nothing here is async except [`throttle::run_throttled`]; [`chunk::chunk_by`]
//! and [`chunk::chunk_by_key`] are ordinary lazy iterators so callers can
//! compose them with the rest of the standard iterator toolbox.

pub mod chunk;
pub mod throttle;

pub use chunk::{chunk_by, chunk_by_key, ChunkBy, ChunkByKey};
pub use throttle::run_throttled;
