//! Lifecycle events emitted by [`crate::UploadQueue`].

use std::time::Instant;

use ingest_core::IngestEvent;

/// Events emitted as a queue flushes and spills batches.
#[derive(Debug, Clone)]
pub enum UploadQueueEvent {
    /// A flush completed, successfully or not.
    Flushed {
        name: String,
        timestamp: Instant,
        uploaded: usize,
        failed: bool,
    },
    /// A batch was written to the spill file after a fatal-server-class
    /// upload failure.
    Spilled { name: String, timestamp: Instant, bytes: usize },
}

impl IngestEvent for UploadQueueEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UploadQueueEvent::Flushed { .. } => "flushed",
            UploadQueueEvent::Spilled { .. } => "spilled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            UploadQueueEvent::Flushed { timestamp, .. } => *timestamp,
            UploadQueueEvent::Spilled { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            UploadQueueEvent::Flushed { name, .. } => name,
            UploadQueueEvent::Spilled { name, .. } => name,
        }
    }
}
