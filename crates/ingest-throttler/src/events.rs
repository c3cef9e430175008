//! Lifecycle events emitted by [`crate::Throttler`].

use std::time::Instant;

use ingest_core::IngestEvent;

/// Events emitted as tasks move through a throttler's admission gate.
#[derive(Debug, Clone)]
pub enum ThrottlerEvent {
    /// A generator was admitted past `allow_schedule` and handed to
    /// `tokio::spawn`.
    TaskScheduled { name: String, timestamp: Instant, index: u64 },
    /// A task finished, successfully or not.
    TaskCompleted {
        name: String,
        timestamp: Instant,
        index: u64,
        failed: bool,
    },
}

impl IngestEvent for ThrottlerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ThrottlerEvent::TaskScheduled { .. } => "task_scheduled",
            ThrottlerEvent::TaskCompleted { .. } => "task_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ThrottlerEvent::TaskScheduled { timestamp, .. } => *timestamp,
            ThrottlerEvent::TaskCompleted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ThrottlerEvent::TaskScheduled { name, .. } => name,
            ThrottlerEvent::TaskCompleted { name, .. } => name,
        }
    }
}
