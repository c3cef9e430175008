use ingest_core::IngestError;

/// The outcome of one flush, passed to the post-flush callback.
#[derive(Debug)]
pub struct UploadResult {
    pub uploaded: usize,
    pub skipped: usize,
    pub error: Option<IngestError>,
}

impl UploadResult {
    /// Every dequeued item was uploaded successfully.
    pub fn uploaded(count: usize) -> Self {
        Self {
            uploaded: count,
            skipped: 0,
            error: None,
        }
    }

    /// The flush failed outright; nothing was uploaded.
    pub fn failed(error: IngestError) -> Self {
        Self {
            uploaded: 0,
            skipped: 0,
            error: Some(error),
        }
    }
}
