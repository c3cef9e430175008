use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Notify};

use ingest_core::events::{EventListener, EventListeners};

use crate::config::ThrottlerConfig;
use crate::error::{Result, ThrottlerError};
use crate::events::ThrottlerEvent;
use crate::ewma::EwmaState;
use crate::task_result::TaskResult;

type Generator<E> = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = std::result::Result<(), E>> + Send>> + Send>;

struct QueuedTask<E> {
    index: u64,
    generator: Generator<E>,
    waiter: Option<oneshot::Sender<Arc<TaskResult<E>>>>,
}

struct Shared<E> {
    config: ThrottlerConfig,
    queue: Mutex<VecDeque<QueuedTask<E>>>,
    running: AtomicU64,
    ewma: Mutex<EwmaState>,
    results: Mutex<BTreeMap<u64, Arc<TaskResult<E>>>>,
    next_index: AtomicU64,
    closed: AtomicBool,
    quit_fault: Mutex<Option<(u64, String)>>,
    activity: Notify,
    idle: Notify,
    events: Mutex<EventListeners<ThrottlerEvent>>,
}

use std::sync::atomic::AtomicBool;

impl<E> Shared<E> {
    fn allow_schedule(&self) -> bool {
        if self.config.max_parallel > 0 && self.running.load(Ordering::SeqCst) >= self.config.max_parallel {
            return false;
        }
        if self.config.unit.is_zero() {
            return true;
        }
        let (count_total, usage_total) = self.ewma.lock().expect("ewma mutex poisoned").totals(self.config.unit);
        if count_total >= self.config.max_per_unit as f64 {
            return false;
        }
        if usage_total > self.config.max_usage_per_unit {
            return false;
        }
        true
    }

    fn quit_on_failure_tripped(&self) -> bool {
        self.config.quit_on_failure && self.quit_fault.lock().expect("quit fault mutex poisoned").is_some()
    }
}

/// A bounded-parallel task executor with two optional EWMA-style rate
/// ceilings: scheduled tasks per time unit, and aggregate wall-clock
/// utilization per time unit.
///
/// Generators are plain `FnOnce() -> impl Future<Output = Result<(), E>>`
/// thunks; the throttler doesn't care what they return on success, only
/// whether and when they complete, so it can schedule arbitrarily many of
/// them without retaining their output values beyond a faulted run's error.
///
/// A single supervisor task owns the scheduling loop: it pulls queued
/// generators while `allow_schedule()` permits it, spawns each as its own
/// task, and re-checks after a bounded wait whenever nothing changed. This
/// mirrors `tokio::spawn`'s fire-and-forget model rather than driving every
/// task from one `poll`, so a slow generator can't stall the others.
pub struct Throttler<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for Throttler<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> Throttler<E>
where
    E: std::fmt::Display + Send + 'static,
{
    /// Creates a throttler and starts its supervisor task.
    pub fn new(config: ThrottlerConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            queue: Mutex::new(VecDeque::new()),
            running: AtomicU64::new(0),
            ewma: Mutex::new(EwmaState::default()),
            results: Mutex::new(BTreeMap::new()),
            next_index: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            quit_fault: Mutex::new(None),
            activity: Notify::new(),
            idle: Notify::new(),
            events: Mutex::new(EventListeners::new()),
        });

        tokio::spawn(supervisor_loop(Arc::clone(&shared)));

        Self { shared }
    }

    /// Appends `generator` to the queue; returns immediately.
    pub fn enqueue<G, Fut>(&self, generator: G)
    where
        G: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    {
        self.push(generator, None);
    }

    /// Appends `generator` and blocks until it finishes.
    ///
    /// When `quit_on_failure` is set and this particular generator faults,
    /// the fault is returned as `Err` rather than embedded in the `Ok`
    /// `TaskResult`.
    pub async fn enqueue_and_wait<G, Fut>(&self, generator: G) -> Result<Arc<TaskResult<E>>>
    where
        G: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.push(generator, Some(tx));
        let result = rx.await.expect("supervisor dropped a waiter without replying");

        if self.shared.config.quit_on_failure {
            if let Some(error) = &result.error {
                return Err(ThrottlerError::TaskFailed {
                    index: result.index,
                    message: error.to_string(),
                });
            }
        }
        Ok(result)
    }

    /// Closes the queue and waits for every already-enqueued generator
    /// (including any enqueued concurrently before the close takes effect)
    /// to finish. Surfaces the first fault if `quit_on_failure` is set.
    pub async fn wait_for_completion(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.activity.notify_waiters();

        loop {
            let notified = self.shared.idle.notified();
            if self.is_idle() {
                break;
            }
            notified.await;
        }

        if let Some((index, message)) = self.shared.quit_fault.lock().expect("quit fault mutex poisoned").clone() {
            return Err(ThrottlerError::TaskFailed { index, message });
        }
        Ok(())
    }

    /// Registers a listener notified of every [`ThrottlerEvent`] this
    /// throttler emits (task scheduled, task completed).
    pub fn add_listener<L>(&self, listener: L)
    where
        L: EventListener<ThrottlerEvent> + 'static,
    {
        self.shared.events.lock().expect("events mutex poisoned").add(listener);
    }

    /// Every retained `TaskResult`, in enqueue order.
    pub fn results(&self) -> Vec<Arc<TaskResult<E>>> {
        self.shared
            .results
            .lock()
            .expect("results mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn is_idle(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
            && self.shared.queue.lock().expect("queue mutex poisoned").is_empty()
            && self.shared.running.load(Ordering::SeqCst) == 0
    }

    fn push<G, Fut>(&self, generator: G, waiter: Option<oneshot::Sender<Arc<TaskResult<E>>>>)
    where
        G: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
    {
        let index = self.shared.next_index.fetch_add(1, Ordering::SeqCst);
        let boxed: Generator<E> = Box::new(move || Box::pin(generator()));
        self.shared.queue.lock().expect("queue mutex poisoned").push_back(QueuedTask {
            index,
            generator: boxed,
            waiter,
        });
        self.shared.activity.notify_waiters();
    }
}

async fn supervisor_loop<E>(shared: Arc<Shared<E>>)
where
    E: std::fmt::Display + Send + 'static,
{
    loop {
        loop {
            if shared.quit_on_failure_tripped() {
                shared.queue.lock().expect("queue mutex poisoned").clear();
                break;
            }
            if !shared.allow_schedule() {
                break;
            }
            let next = shared.queue.lock().expect("queue mutex poisoned").pop_front();
            let Some(task) = next else { break };
            shared.running.fetch_add(1, Ordering::SeqCst);
            if !shared.config.unit.is_zero() {
                shared.ewma.lock().expect("ewma mutex poisoned").record_scheduled(Instant::now());
            }
            shared.events.lock().expect("events mutex poisoned").emit(&ThrottlerEvent::TaskScheduled {
                name: shared.config.name.clone(),
                timestamp: Instant::now(),
                index: task.index,
            });
            tokio::spawn(run_one(Arc::clone(&shared), task));
        }

        let closed_and_idle = shared.closed.load(Ordering::SeqCst)
            && shared.queue.lock().expect("queue mutex poisoned").is_empty()
            && shared.running.load(Ordering::SeqCst) == 0;
        if closed_and_idle {
            shared.idle.notify_waiters();
            return;
        }

        let recheck_tick = if shared.config.unit.is_zero() {
            Duration::from_millis(10)
        } else {
            shared.config.unit.min(Duration::from_millis(50)).max(Duration::from_millis(1))
        };
        let activity = shared.activity.notified();
        tokio::select! {
            _ = activity => {}
            _ = tokio::time::sleep(recheck_tick) => {}
        }
    }
}

async fn run_one<E>(shared: Arc<Shared<E>>, task: QueuedTask<E>)
where
    E: std::fmt::Display + Send + 'static,
{
    let start = Instant::now();
    let outcome = (task.generator)().await;
    let end = Instant::now();
    let error_message = outcome.as_ref().err().map(ToString::to_string);
    let error = outcome.err();

    let result = Arc::new(TaskResult {
        index: task.index,
        start_time: start,
        completion_time: Some(end),
        error,
    });

    shared.running.fetch_sub(1, Ordering::SeqCst);
    shared.ewma.lock().expect("ewma mutex poisoned").record_completion(start, end - start);
    shared
        .results
        .lock()
        .expect("results mutex poisoned")
        .insert(task.index, Arc::clone(&result));
    shared.events.lock().expect("events mutex poisoned").emit(&ThrottlerEvent::TaskCompleted {
        name: shared.config.name.clone(),
        timestamp: end,
        index: task.index,
        failed: result.error.is_some(),
    });

    if let Some(message) = error_message {
        if shared.config.quit_on_failure {
            shared
                .quit_fault
                .lock()
                .expect("quit fault mutex poisoned")
                .get_or_insert((task.index, message));
        }
    }

    if let Some(waiter) = task.waiter {
        let _ = waiter.send(Arc::clone(&result));
    }

    shared.activity.notify_waiters();
    shared.idle.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_tasks_and_retains_results_in_order() {
        let throttler: Throttler<String> = Throttler::new(ThrottlerConfig::builder().build());
        for _ in 0..5 {
            throttler.enqueue(|| async { Ok(()) });
        }
        throttler.wait_for_completion().await.unwrap();

        let results = throttler.results();
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert!(pair[0].index < pair[1].index);
        }
        assert!(results.iter().all(|r| r.completed() && !r.is_err()));
    }

    #[tokio::test]
    async fn max_parallel_serializes_excess_tasks() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let throttler: Throttler<String> = Throttler::new(
            ThrottlerConfig::builder().max_parallel(2).build(),
        );

        let start = Instant::now();
        for _ in 0..10 {
            let concurrent = Arc::clone(&concurrent);
            let max_seen = Arc::clone(&max_seen);
            throttler.enqueue(move || async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            });
        }
        throttler.wait_for_completion().await.unwrap();
        let elapsed = start.elapsed();

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
        assert!(elapsed >= Duration::from_millis(450));
    }

    #[tokio::test]
    async fn quit_on_failure_stops_scheduling_and_surfaces_fault() {
        let ran = Arc::new(AtomicUsize::new(0));
        let throttler: Throttler<String> = Throttler::new(
            ThrottlerConfig::builder().max_parallel(1).quit_on_failure(true).build(),
        );

        {
            let ran = Arc::clone(&ran);
            throttler.enqueue(move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            });
        }
        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            throttler.enqueue(move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = throttler.wait_for_completion().await.unwrap_err();
        assert!(matches!(err, ThrottlerError::TaskFailed { index: 0, .. }));
        assert!(ran.load(Ordering::SeqCst) < 6);
    }

    #[tokio::test]
    async fn enqueue_and_wait_surfaces_its_own_fault_when_quit_on_failure() {
        let throttler: Throttler<String> = Throttler::new(ThrottlerConfig::builder().quit_on_failure(true).build());
        let err = throttler
            .enqueue_and_wait(|| async { Err("nope".to_string()) })
            .await
            .unwrap_err();
        assert!(matches!(err, ThrottlerError::TaskFailed { .. }));
    }

    #[tokio::test]
    async fn enqueue_and_wait_returns_ok_result_without_quit_on_failure() {
        let throttler: Throttler<String> = Throttler::new(ThrottlerConfig::builder().build());
        let result = throttler.enqueue_and_wait(|| async { Err("nope".to_string()) }).await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn listener_observes_scheduled_and_completed_events() {
        use ingest_core::events::FnListener;

        let scheduled = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let scheduled2 = Arc::clone(&scheduled);
        let completed2 = Arc::clone(&completed);

        let throttler: Throttler<String> = Throttler::new(ThrottlerConfig::builder().build());
        throttler.add_listener(FnListener::new(move |event: &ThrottlerEvent| match event {
            ThrottlerEvent::TaskScheduled { .. } => {
                scheduled2.fetch_add(1, Ordering::SeqCst);
            }
            ThrottlerEvent::TaskCompleted { .. } => {
                completed2.fetch_add(1, Ordering::SeqCst);
            }
        }));

        throttler.enqueue(|| async { Ok(()) });
        throttler.wait_for_completion().await.unwrap();

        assert_eq!(scheduled.load(Ordering::SeqCst), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ewma_count_ceiling_blocks_until_discount_decays() {
        let completed = Arc::new(AtomicUsize::new(0));
        let throttler: Throttler<String> = Throttler::new(
            ThrottlerConfig::builder()
                .max_per_unit(5)
                .unit(Duration::from_millis(200))
                .build(),
        );

        for _ in 0..20 {
            let completed = Arc::clone(&completed);
            throttler.enqueue(move || async move {
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(completed.load(Ordering::SeqCst) <= 5);

        throttler.wait_for_completion().await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 20);
    }
}
