//! Registry of named periodic and one-shot background tasks with pause,
//! trigger, and shutdown controls, plus a supervisor that fails fast on the
//! first child fault.
//!
//! ```rust
//! use ingest_scheduler::PeriodicScheduler;
//! use ingest_core::{CronTimeSpanWrapper, TimeUnit};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = PeriodicScheduler::new();
//! let interval = Arc::new(CronTimeSpanWrapper::parse("5s", TimeUnit::Seconds, false));
//!
//! scheduler.schedule_periodic(
//!     Some("heartbeat".into()),
//!     interval,
//!     |_cancel| async { Ok(()) },
//!     true,
//! )?;
//!
//! scheduler.exit_all_and_wait().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
mod scheduler;

pub use error::{Result, SchedulerError};
pub use events::SchedulerEvent;
pub use scheduler::PeriodicScheduler;
