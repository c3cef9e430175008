//! Concurrency and scheduling toolkit for data-ingestion workers.
//!
//! `ingest-toolkit` collects the building blocks a long-running extractor
//! needs to pull data from a source and push it to a sink without falling
//! over under backpressure: bounded concurrency, adaptive throttling,
//! chunked batch splitting, periodic task scheduling, capped retries,
//! failure budgets, chunked operation scheduling against a resource gate,
//! and a batched upload queue with disk spillover. Each piece is available
//! as both an individual crate and as a feature in this meta-crate.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! ingest-toolkit = { version = "0.1", features = ["retry", "scheduler"] }
//! ```
//!
//! # Modules
//!
//! - **[Resource Counter]** - Bounded pool of in-flight units with blocking and non-blocking acquisition
//! - **[Chunker]** - Splits batches by item/byte budgets or by a grouping key
//! - **[Throttler]** - Adaptive EWMA-based concurrency limiting that reacts to latency and failures
//! - **[Scheduler]** - Registry of named periodic and one-shot background tasks with a fail-fast supervisor
//! - **[Retry]** - Capped exponential backoff with a deadline and cooperative cancellation
//! - **[Failure Budget]** - Trips a cancellation token once a distinct-failure ratio is exceeded
//! - **[Operation Scheduler]** - Chunked work driven against a resource gate and a throttler
//! - **[Upload Queue]** - Batched producer/consumer flushing on size, timer, or explicit trigger, with disk spillover
//!
//! [Resource Counter]: #resource-counter
//! [Chunker]: #chunker
//! [Throttler]: #throttler
//! [Scheduler]: #scheduler
//! [Retry]: #retry
//! [Failure Budget]: #failure-budget
//! [Operation Scheduler]: #operation-scheduler
//! [Upload Queue]: #upload-queue
//!
//! ## Resource Counter
//!
//! Gates how many units of work (requests, items, bytes) are in flight at
//! once. Acquisition can block until capacity frees up or fail fast.
//!
//! ### When to Use
//!
//! - **Backpressure on a downstream sink**: cap concurrent uploads
//! - **Memory bounding**: cap in-flight bytes rather than item count
//! - **Coordinating with a throttler**: capacity that shrinks under load
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "resource-counter")]
//! # {
//! use ingest_resource_counter::ResourceCounter;
//!
//! # async fn example() -> ingest_core::Result<()> {
//! let counter = ResourceCounter::new(100);
//! let granted = counter.take(10, true).await?;
//! counter.free(granted)?;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! ## Chunker
//!
//! Splits a batch into chunks bounded by item count, byte size, or a
//! grouping key, without ever splitting a single item.
//!
//! ### When to Use
//!
//! - **Wire size limits**: a sink accepts at most N bytes per request
//! - **Grouped delivery**: batch contiguous same-key items together
//!
//! ## Throttler
//!
//! Runs submitted operations through a bounded worker pool whose size
//! adapts to recent latency and failure rate (EWMA-based AIMD).
//!
//! ### When to Use
//!
//! - **Unknown downstream capacity**: let the throttler find the ceiling
//! - **Protecting a flaky sink**: back off automatically on errors
//!
//! ### Anti-Patterns
//!
//! ❌ **Using it for rate limiting**: it limits concurrency, not throughput
//! ✅ Pair with a fixed-rate limiter upstream if a hard QPS cap is required
//!
//! ## Scheduler
//!
//! A registry of named periodic and one-shot background tasks, with
//! pause/resume/trigger controls and a supervisor that surfaces the first
//! task fault.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "scheduler")]
//! # {
//! use ingest_scheduler::PeriodicScheduler;
//! use ingest_core::{CronTimeSpanWrapper, TimeUnit};
//! use std::sync::Arc;
//!
//! # async fn example() -> ingest_scheduler::Result<()> {
//! let scheduler = PeriodicScheduler::new();
//! let interval = Arc::new(CronTimeSpanWrapper::parse("5m", TimeUnit::Minutes, false));
//! scheduler.schedule_periodic(Some("poll".into()), interval, |_cancel| async { Ok(()) }, true)?;
//! scheduler.wait_for_all().await?;
//! # Ok(())
//! # }
//! # }
//! ```
//!
//! ## Retry
//!
//! Retries a fallible async operation with capped exponential backoff, an
//! optional overall deadline, and a caller-supplied retryable-error
//! classifier.
//!
//! ### Anti-Patterns
//!
//! ❌ **Retrying non-idempotent operations**: duplicate uploads
//! ✅ Only retry operations whose effects are safe to repeat
//!
//! ❌ **Unbounded attempts with no deadline**: can retry forever
//! ✅ Set `max_attempts` or `timeout` (ideally both)
//!
//! ## Failure Budget
//!
//! Tracks distinct failing keys and trips a shared cancellation token once
//! the failure count exceeds a configurable percentage of the total
//! expected work.
//!
//! ## Operation Scheduler
//!
//! Drives a caller-supplied chunk consumer against a [resource counter]
//! and a [throttler], honoring partial completion (an item can report
//! "not done yet" and keep its reserved capacity unit for the next round)
//! and mid-run discovery of new items.
//!
//! [resource counter]: #resource-counter
//! [throttler]: #throttler
//!
//! ## Upload Queue
//!
//! Buffers items and flushes them in batches on a size threshold, an
//! interval timer, or an explicit trigger. On a fatal-server-class flush
//! failure, the batch can be spilled to disk and recovered on a later
//! flush once connectivity returns.
//!
//! # Composition
//!
//! A typical extractor wires these together as:
//!
//! ```text
//! ┌─────────────┐
//! │  Scheduler  │ ← drives periodic polling
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │ Operation Scheduler   │ ← chunks discovered work
//! └──────┬────────────────┘
//!        │
//!        ▼
//! ┌─────────────────┐      ┌──────────────────┐
//! │    Throttler     │ ←──→ │ Resource Counter │
//! └────────┬─────────┘      └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │      Retry       │ ← wraps each request to the sink
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Upload Queue    │ ← batches and spills on failure
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Failure Budget   │ ← trips overall cancellation if too much fails
//! └──────────────────┘
//! ```

// Re-export core (always available)
pub use ingest_core as core;

#[cfg(feature = "chunker")]
pub use ingest_chunker as chunker;

#[cfg(feature = "failure-budget")]
pub use ingest_failure_budget as failure_budget;

#[cfg(feature = "operation-scheduler")]
pub use ingest_operation_scheduler as operation_scheduler;

#[cfg(feature = "resource-counter")]
pub use ingest_resource_counter as resource_counter;

#[cfg(feature = "retry")]
pub use ingest_retry as retry;

#[cfg(feature = "scheduler")]
pub use ingest_scheduler as scheduler;

#[cfg(feature = "throttler")]
pub use ingest_throttler as throttler;

#[cfg(feature = "upload-queue")]
pub use ingest_upload_queue as upload_queue;
