//! Lifecycle events emitted by [`crate::PeriodicScheduler`].

use std::time::Instant;

use ingest_core::IngestEvent;

/// Events emitted as a scheduler's registered tasks run.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A task's body was invoked for one iteration (periodic or one-shot).
    TaskStarted { name: String, timestamp: Instant },
    /// A task's body returned `Err`, faulting the scheduler.
    TaskFaulted {
        name: String,
        timestamp: Instant,
        message: String,
    },
}

impl IngestEvent for SchedulerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SchedulerEvent::TaskStarted { .. } => "task_started",
            SchedulerEvent::TaskFaulted { .. } => "task_faulted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SchedulerEvent::TaskStarted { timestamp, .. } => *timestamp,
            SchedulerEvent::TaskFaulted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            SchedulerEvent::TaskStarted { name, .. } => name,
            SchedulerEvent::TaskFaulted { name, .. } => name,
        }
    }
}
