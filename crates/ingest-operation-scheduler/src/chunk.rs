use ingest_core::IngestError;

/// The result of consuming one chunk.
///
/// `items` and `completed` are parallel: `completed[i]` tells the scheduler
/// whether `items[i]` is done. An item whose slot is `false` is a
/// *continued* item — it goes back into the active set with its capacity
/// unit still reserved, rather than being freed and re-requested.
pub struct ChunkOutcome<T> {
    pub items: Vec<T>,
    pub completed: Vec<bool>,
    pub discovered: Vec<T>,
    pub error: Option<IngestError>,
}

impl<T> ChunkOutcome<T> {
    /// Every item in `items` is done; nothing new was discovered.
    pub fn done(items: Vec<T>) -> Self {
        let completed = vec![true; items.len()];
        Self {
            items,
            completed,
            discovered: Vec::new(),
            error: None,
        }
    }

    /// Builds an outcome from items paired with their completion flag.
    pub fn from_flags(items_and_flags: Vec<(T, bool)>) -> Self {
        let mut items = Vec::with_capacity(items_and_flags.len());
        let mut completed = Vec::with_capacity(items_and_flags.len());
        for (item, done) in items_and_flags {
            items.push(item);
            completed.push(done);
        }
        Self {
            items,
            completed,
            discovered: Vec::new(),
            error: None,
        }
    }

    /// Attaches newly discovered items, to be folded back into the active
    /// set once this outcome is processed.
    pub fn with_discovered(mut self, discovered: Vec<T>) -> Self {
        self.discovered = discovered;
        self
    }

    /// Attaches the error the consumer hit while processing this chunk.
    /// Riding on the outcome as data rather than a propagated failure, per
    /// this scheduler's error handling policy.
    pub fn with_error(mut self, error: IngestError) -> Self {
        self.error = Some(error);
        self
    }
}
