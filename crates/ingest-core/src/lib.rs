//! Shared infrastructure for the ingest concurrency toolkit.
//!
//! This crate provides the pieces every other crate in the workspace
//! depends on:
//! - [`error::IngestError`] — the single error kind threaded through retry,
//!   spill, and scheduling decisions.
//! - [`events`] — an observability event system (listener registry with
//!   panic isolation), used the same way by the throttler, scheduler, and
//!   upload queue.
//! - [`time_range::TimeRange`] — the closed interval type used to describe
//!   ingested spans.
//! - [`interval`] — the `IntervalProvider` capability consumed by
//!   `PeriodicScheduler`, plus its plain and cron-backed implementations.

pub mod error;
pub mod events;
pub mod interval;
pub mod time_range;

pub use error::{IngestError, Result};
pub use events::{EventListener, EventListeners, FnListener, IngestEvent};
pub use interval::{CronTimeSpanWrapper, IntervalProvider, TimeSpanWrapper, TimeUnit, INFINITE};
pub use time_range::TimeRange;
