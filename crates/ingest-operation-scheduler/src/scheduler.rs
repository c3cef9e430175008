use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ingest_chunker::chunk_by;
use ingest_core::{IngestError, Result};
use ingest_resource_counter::ResourceCounter;
use ingest_throttler::Throttler;

use crate::chunk::ChunkOutcome;
use crate::config::OperationSchedulerConfig;

/// Cumulative counters for one `run` invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationSummary {
    pub discovered: u64,
    pub completed: u64,
}

/// Drives a recursive, chunked exploration to completion.
///
/// `resource` and `throttler` are borrowed rather than owned so that
/// multiple concurrent calls to `run` (even across different `T`s) can
/// share one admission budget and one execution pool.
///
/// Each round: request fresh capacity for the backlog (skipped entirely
/// when there are continued items already holding reserved capacity, to
/// guarantee forward progress), chunk the granted batch via `consume`,
/// submit each chunk to `throttler`, and drain at least one completion
/// before looping. An item whose outcome slot is `false` returns to the
/// backlog without releasing its capacity unit; one whose slot is `true`
/// releases its unit back to `resource`.
pub async fn run<T, F, Fut>(
    resource: &ResourceCounter,
    throttler: &Throttler<IngestError>,
    config: &OperationSchedulerConfig,
    initial: Vec<T>,
    consume: F,
    cancel: &CancellationToken,
) -> Result<OperationSummary>
where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ChunkOutcome<T>> + Send + 'static,
{
    let consume = Arc::new(consume);
    let (tx, mut rx) = mpsc::unbounded_channel::<ChunkOutcome<T>>();

    let mut fresh: VecDeque<T> = initial.into();
    let mut continued: VecDeque<T> = VecDeque::new();
    let mut pending: usize = 0;
    let mut summary = OperationSummary::default();

    loop {
        if fresh.is_empty() && continued.is_empty() && pending == 0 {
            return Ok(summary);
        }

        if cancel.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::debug!("operation scheduler cancelled, aborting outstanding work");
            for _ in 0..continued.len() {
                let _ = resource.free(1);
                pending = pending.saturating_sub(1);
            }
            continued.clear();
            fresh.clear();
            drop(consume);

            while pending > 0 {
                match rx.recv().await {
                    Some(outcome) => {
                        for _ in &outcome.items {
                            let _ = resource.free(1);
                            pending = pending.saturating_sub(1);
                        }
                    }
                    None => break,
                }
            }
            return Err(IngestError::Cancelled);
        }

        let mut granted = 0usize;
        if continued.is_empty() {
            let want = fresh.len();
            if want > 0 {
                let to_request = if config.max_request == 0 {
                    want
                } else {
                    want.min(config.max_request)
                };
                let block = pending == 0;
                granted = resource
                    .take(to_request as i64, block)
                    .await
                    .map_err(|e| IngestError::InvalidArgument(e.to_string()))? as usize;
            }
        }

        let mut batch: Vec<T> = Vec::with_capacity(continued.len() + granted);
        batch.extend(continued.drain(..));
        for _ in 0..granted {
            if let Some(item) = fresh.pop_front() {
                batch.push(item);
            }
        }
        pending += granted;

        if !batch.is_empty() {
            let chunks: Vec<Vec<T>> = if config.chunk_size == 0 {
                vec![batch]
            } else {
                chunk_by(batch, config.chunk_size).collect()
            };

            for chunk_items in chunks {
                let consume = Arc::clone(&consume);
                let tx = tx.clone();
                throttler.enqueue(move || async move {
                    let outcome = consume(chunk_items).await;
                    let _ = tx.send(outcome);
                    Ok::<(), IngestError>(())
                });
            }
        }

        if pending > 0 {
            let Some(outcome) = rx.recv().await else {
                return Ok(summary);
            };
            apply_outcome(outcome, resource, &mut fresh, &mut continued, &mut pending, &mut summary)?;

            while let Ok(outcome) = rx.try_recv() {
                apply_outcome(outcome, resource, &mut fresh, &mut continued, &mut pending, &mut summary)?;
            }
        }
    }
}

fn apply_outcome<T>(
    outcome: ChunkOutcome<T>,
    resource: &ResourceCounter,
    fresh: &mut VecDeque<T>,
    continued: &mut VecDeque<T>,
    pending: &mut usize,
    summary: &mut OperationSummary,
) -> Result<()> {
    summary.discovered += outcome.discovered.len() as u64;
    fresh.extend(outcome.discovered);

    #[cfg(feature = "tracing")]
    if let Some(err) = &outcome.error {
        tracing::debug!(error = %err, "chunk completed with an error riding as data");
    }

    for (item, done) in outcome.items.into_iter().zip(outcome.completed) {
        if done {
            summary.completed += 1;
            resource
                .free(1)
                .map_err(|e| IngestError::InvalidArgument(e.to_string()))?;
            *pending = pending.saturating_sub(1);
        } else {
            continued.push_back(item);
        }
    }
    Ok(())
}
