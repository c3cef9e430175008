use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ingest_core::events::{EventListener, EventListeners};
use ingest_core::Result;

use crate::config::UploadQueueConfig;
use crate::events::UploadQueueEvent;
use crate::result::UploadResult;
use crate::spill;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type UploadFn<T> = Arc<dyn Fn(Vec<T>, CancellationToken) -> BoxFuture<UploadResult> + Send + Sync>;
type CallbackFn = Arc<dyn Fn(&UploadResult) + Send + Sync>;
type EncodeFn<T> = Arc<dyn Fn(&[T]) -> Vec<u8> + Send + Sync>;
type DecodeFn<T> = Arc<dyn Fn(&[u8]) -> std::io::Result<Vec<T>> + Send + Sync>;
type ProbeFn = Arc<dyn Fn(CancellationToken) -> BoxFuture<Result<()>> + Send + Sync>;

struct Shared<T> {
    config: UploadQueueConfig,
    inner: StdMutex<VecDeque<T>>,
    upload: UploadFn<T>,
    callback: CallbackFn,
    encode: Option<EncodeFn<T>>,
    decode: Option<DecodeFn<T>>,
    probe: Option<ProbeFn>,
    flush_lock: AsyncMutex<()>,
    external_cancel: CancellationToken,
    internal_cancel: CancellationToken,
    timer_handle: StdMutex<Option<JoinHandle<()>>>,
    events: StdMutex<EventListeners<UploadQueueEvent>>,
}

/// Generic producer/consumer upload queue: items enqueue without blocking,
/// and flush on a size threshold, an interval timer, an explicit trigger,
/// or final shutdown.
///
/// Spillover (enabled by [`UploadQueueConfig::builder`]`.buffer_path`) is
/// generic over the item's own wire format: callers supply `encode`/`decode`
/// closures, and this queue owns only the length-prefixed framing and the
/// read/probe/resubmit/truncate recovery cycle — see [`crate::spill`].
pub struct UploadQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for UploadQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> UploadQueue<T>
where
    T: Send + 'static,
{
    /// Creates a queue with no spillover.
    pub fn new(
        config: UploadQueueConfig,
        upload: impl Fn(Vec<T>, CancellationToken) -> BoxFuture<UploadResult> + Send + Sync + 'static,
        callback: impl Fn(&UploadResult) + Send + Sync + 'static,
        external_cancel: CancellationToken,
    ) -> Self {
        Self::build(config, upload, callback, None, None, None, external_cancel)
    }

    /// Creates a queue with disk spillover enabled. `config` must carry a
    /// `buffer_path`; `encode`/`decode` round-trip one flushed batch to
    /// bytes, and `probe` is a cheap connectivity check consulted before
    /// attempting to drain the spill file.
    pub fn new_with_spill(
        config: UploadQueueConfig,
        upload: impl Fn(Vec<T>, CancellationToken) -> BoxFuture<UploadResult> + Send + Sync + 'static,
        callback: impl Fn(&UploadResult) + Send + Sync + 'static,
        encode: impl Fn(&[T]) -> Vec<u8> + Send + Sync + 'static,
        decode: impl Fn(&[u8]) -> std::io::Result<Vec<T>> + Send + Sync + 'static,
        probe: impl Fn(CancellationToken) -> BoxFuture<Result<()>> + Send + Sync + 'static,
        external_cancel: CancellationToken,
    ) -> Self {
        assert!(
            config.buffer_path.is_some(),
            "new_with_spill requires UploadQueueConfig::builder().buffer_path(..)"
        );
        Self::build(
            config,
            upload,
            callback,
            Some(Arc::new(encode) as EncodeFn<T>),
            Some(Arc::new(decode) as DecodeFn<T>),
            Some(Arc::new(probe) as ProbeFn),
            external_cancel,
        )
    }

    fn build(
        config: UploadQueueConfig,
        upload: impl Fn(Vec<T>, CancellationToken) -> BoxFuture<UploadResult> + Send + Sync + 'static,
        callback: impl Fn(&UploadResult) + Send + Sync + 'static,
        encode: Option<EncodeFn<T>>,
        decode: Option<DecodeFn<T>>,
        probe: Option<ProbeFn>,
        external_cancel: CancellationToken,
    ) -> Self {
        let shared = Arc::new(Shared {
            config,
            inner: StdMutex::new(VecDeque::new()),
            upload: Arc::new(upload),
            callback: Arc::new(callback),
            encode,
            decode,
            probe,
            flush_lock: AsyncMutex::new(()),
            external_cancel,
            internal_cancel: CancellationToken::new(),
            timer_handle: StdMutex::new(None),
            events: StdMutex::new(EventListeners::new()),
        });

        if !shared.config.interval.is_zero() {
            let timer_shared = Arc::clone(&shared);
            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(timer_shared.config.interval) => {}
                        _ = timer_shared.internal_cancel.cancelled() => break,
                        _ = timer_shared.external_cancel.cancelled() => break,
                    }
                    let cancel = timer_shared.external_cancel.clone();
                    let _ = flush_once(&timer_shared, &cancel).await;
                }
            });
            *shared.timer_handle.lock().unwrap() = Some(handle);
        }

        Self { shared }
    }

    /// Appends `item`. Never blocks; may spawn a background flush if the
    /// size threshold is reached.
    pub fn enqueue(&self, item: T) {
        let reached_threshold = {
            let mut queue = self.shared.inner.lock().unwrap();
            queue.push_back(item);
            self.shared.config.max_size > 0 && queue.len() >= self.shared.config.max_size
        };

        if reached_threshold {
            let shared = Arc::clone(&self.shared);
            let cancel = self.shared.external_cancel.clone();
            tokio::spawn(async move {
                let _ = flush_once(&shared, &cancel).await;
            });
        }
    }

    /// Registers a listener notified of every [`UploadQueueEvent`] this
    /// queue emits (flush completed, batch spilled).
    pub fn add_listener<L>(&self, listener: L)
    where
        L: EventListener<UploadQueueEvent> + 'static,
    {
        self.shared.events.lock().unwrap().add(listener);
    }

    /// Number of items currently buffered (not counting anything already
    /// dequeued into an in-flight flush).
    pub fn len(&self) -> usize {
        self.shared.inner.lock().unwrap().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicitly flushes everything currently buffered and returns the
    /// result.
    pub async fn trigger(&self, cancel: &CancellationToken) -> UploadResult {
        flush_once(&self.shared, cancel).await
    }

    /// Stops the timer (if any) and performs one final flush, waiting up to
    /// the configured shutdown timeout. A flush already in progress is
    /// joined, not cancelled; exceeding the timeout only stops *waiting*,
    /// it never aborts the flush itself.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.shared.timer_handle.lock().unwrap().take() {
            handle.abort();
        }
        self.shared.internal_cancel.cancel();

        let cancel = self.shared.external_cancel.clone();
        let shared = Arc::clone(&self.shared);
        let flush = async move { flush_once(&shared, &cancel).await };

        if tokio::time::timeout(self.shared.config.shutdown_timeout, flush)
            .await
            .is_err()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                name = %self.shared.config.name,
                timeout = ?self.shared.config.shutdown_timeout,
                "shutdown flush exceeded safety timeout; it is still running in the background"
            );
        }
    }
}

async fn flush_once<T: Send + 'static>(shared: &Arc<Shared<T>>, cancel: &CancellationToken) -> UploadResult {
    let _guard = shared.flush_lock.lock().await;

    let items: Vec<T> = {
        let mut queue = shared.inner.lock().unwrap();
        queue.drain(..).collect()
    };

    if items.is_empty() {
        let result = maybe_recover_spill(shared, cancel).await.unwrap_or_else(|| UploadResult::uploaded(0));
        emit_flushed(shared, &result);
        (shared.callback)(&result);
        return result;
    }

    let encoded = shared.encode.as_ref().map(|encode| encode(&items));
    let result = (shared.upload)(items, cancel.clone()).await;

    if let Some(err) = &result.error {
        if err.is_fatal_server_class() {
            if let (Some(path), Some(bytes)) = (&shared.config.buffer_path, &encoded) {
                match spill::append_batch(path, bytes).await {
                    Ok(()) => {
                        shared.events.lock().unwrap().emit(&UploadQueueEvent::Spilled {
                            name: shared.config.name.clone(),
                            timestamp: Instant::now(),
                            bytes: bytes.len(),
                        });
                    }
                    Err(io_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %io_err, "failed to spill batch to disk, batch is lost");
                        #[cfg(not(feature = "tracing"))]
                        let _ = io_err;
                    }
                }
            }
        }
    }

    emit_flushed(shared, &result);
    (shared.callback)(&result);
    result
}

fn emit_flushed<T: Send + 'static>(shared: &Arc<Shared<T>>, result: &UploadResult) {
    shared.events.lock().unwrap().emit(&UploadQueueEvent::Flushed {
        name: shared.config.name.clone(),
        timestamp: Instant::now(),
        uploaded: result.uploaded,
        failed: result.error.is_some(),
    });
}

/// Attempts to recover a spilled batch, returning the upload result of the
/// resubmission if one was attempted, or `None` if there was nothing to do
/// (no spill configured, no spill file, or connectivity probe failed). The
/// caller is responsible for invoking the callback exactly once with
/// whichever result ends up describing this flush.
async fn maybe_recover_spill<T: Send + 'static>(shared: &Arc<Shared<T>>, cancel: &CancellationToken) -> Option<UploadResult> {
    let (Some(path), Some(decode), Some(probe)) = (&shared.config.buffer_path, &shared.decode, &shared.probe) else {
        return None;
    };

    if !spill::is_nonempty(path).await {
        return None;
    }

    if probe(cancel.clone()).await.is_err() {
        return None;
    }

    let (frames, consumed) = match spill::read_all_frames(path).await {
        Ok(v) => v,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "failed to read spill file, leaving it in place");
            #[cfg(not(feature = "tracing"))]
            let _ = e;
            return None;
        }
    };

    if frames.is_empty() {
        return None;
    }

    let mut recovered = Vec::new();
    for frame in &frames {
        match decode(frame) {
            Ok(items) => recovered.extend(items),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "failed to decode a spilled batch, leaving the spill file in place");
                #[cfg(not(feature = "tracing"))]
                let _ = e;
                return None;
            }
        }
    }

    if recovered.is_empty() {
        return None;
    }

    let result = (shared.upload)(recovered, cancel.clone()).await;
    if result.error.is_none() {
        let file_len = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(u64::MAX);
        if consumed == file_len {
            let _ = spill::truncate(path).await;
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::IngestError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    fn boxed<T: Send + 'static>(fut: impl Future<Output = T> + Send + 'static) -> BoxFuture<T> {
        Box::pin(fut)
    }

    #[tokio::test]
    async fn size_threshold_triggers_a_flush() {
        let uploaded = Arc::new(AtomicUsize::new(0));
        let uploaded2 = Arc::clone(&uploaded);

        let queue: UploadQueue<i32> = UploadQueue::new(
            UploadQueueConfig::builder().max_size(3).build(),
            move |items, _cancel| {
                let uploaded = Arc::clone(&uploaded2);
                boxed(async move {
                    uploaded.fetch_add(items.len(), Ordering::SeqCst);
                    UploadResult::uploaded(items.len())
                })
            },
            |_result| {},
            CancellationToken::new(),
        );

        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(uploaded.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn explicit_trigger_dequeues_everything_present() {
        let queue: UploadQueue<i32> = UploadQueue::new(
            UploadQueueConfig::builder().build(),
            |items, _cancel| boxed(async move { UploadResult::uploaded(items.len()) }),
            |_result| {},
            CancellationToken::new(),
        );

        queue.enqueue(1);
        queue.enqueue(2);
        let result = queue.trigger(&CancellationToken::new()).await;
        assert_eq!(result.uploaded, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn shutdown_performs_a_final_flush() {
        let flushed = Arc::new(AtomicUsize::new(0));
        let flushed2 = Arc::clone(&flushed);

        let queue: UploadQueue<i32> = UploadQueue::new(
            UploadQueueConfig::builder().build(),
            move |items, _cancel| {
                let flushed = Arc::clone(&flushed2);
                boxed(async move {
                    flushed.fetch_add(items.len(), Ordering::SeqCst);
                    UploadResult::uploaded(items.len())
                })
            },
            |_result| {},
            CancellationToken::new(),
        );

        queue.enqueue(42);
        queue.shutdown().await;
        assert_eq!(flushed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listener_observes_flushed_and_spilled_events() {
        use ingest_core::events::FnListener;

        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.bin");

        let flushed = Arc::new(AtomicUsize::new(0));
        let spilled = Arc::new(AtomicUsize::new(0));
        let flushed2 = Arc::clone(&flushed);
        let spilled2 = Arc::clone(&spilled);

        let queue: UploadQueue<u8> = UploadQueue::new_with_spill(
            UploadQueueConfig::builder().buffer_path(path.clone()).build(),
            |_items, _cancel| boxed(async move { UploadResult::failed(IngestError::FatalServer("503".into())) }),
            |_result| {},
            |items: &[u8]| items.to_vec(),
            |bytes: &[u8]| Ok(bytes.to_vec()),
            |_cancel| boxed(async { Ok(()) }),
            CancellationToken::new(),
        );

        queue.add_listener(FnListener::new(move |event: &UploadQueueEvent| match event {
            UploadQueueEvent::Flushed { .. } => {
                flushed2.fetch_add(1, Ordering::SeqCst);
            }
            UploadQueueEvent::Spilled { .. } => {
                spilled2.fetch_add(1, Ordering::SeqCst);
            }
        }));

        queue.enqueue(1);
        let result = queue.trigger(&CancellationToken::new()).await;
        assert!(result.error.is_some());
        assert_eq!(flushed.load(Ordering::SeqCst), 1);
        assert_eq!(spilled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spill_round_trip_on_fatal_server_error_then_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.bin");

        let should_fail = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let should_fail2 = Arc::clone(&should_fail);
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered2 = Arc::clone(&delivered);

        let queue: UploadQueue<u8> = UploadQueue::new_with_spill(
            UploadQueueConfig::builder().buffer_path(path.clone()).build(),
            move |items, _cancel| {
                let should_fail = Arc::clone(&should_fail2);
                let delivered = Arc::clone(&delivered2);
                boxed(async move {
                    if should_fail.load(Ordering::SeqCst) {
                        UploadResult::failed(IngestError::FatalServer("503".into()))
                    } else {
                        delivered.fetch_add(items.len(), Ordering::SeqCst);
                        UploadResult::uploaded(items.len())
                    }
                })
            },
            |_result| {},
            |items: &[u8]| items.to_vec(),
            |bytes: &[u8]| Ok(bytes.to_vec()),
            |_cancel| boxed(async { Ok(()) }),
            CancellationToken::new(),
        );

        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(3);
        let first = queue.trigger(&CancellationToken::new()).await;
        assert!(first.error.is_some());
        assert!(spill::is_nonempty(&path).await);

        should_fail.store(false, Ordering::SeqCst);
        // Next flush sees an empty live queue, so it probes and recovers.
        let second = queue.trigger(&CancellationToken::new()).await;
        assert!(second.error.is_none());
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
        assert!(!spill::is_nonempty(&path).await);
    }
}
