use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ingest_core::events::{EventListener, EventListeners};
use ingest_core::interval::INFINITE;
use ingest_core::IntervalProvider;

use crate::error::{Result, SchedulerError};
use crate::events::SchedulerEvent;

struct TaskControl {
    should_run: AtomicBool,
    paused: AtomicBool,
    force_run: AtomicBool,
    wake: Notify,
    join: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TaskControl {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            should_run: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            force_run: AtomicBool::new(false),
            wake: Notify::new(),
            join: tokio::sync::Mutex::new(None),
        })
    }
}

struct Shared {
    tasks: Mutex<HashMap<String, Arc<TaskControl>>>,
    anon_counter: AtomicU64,
    active_count: AtomicUsize,
    fault: Mutex<Option<SchedulerError>>,
    supervisor_notify: Notify,
    cancel: CancellationToken,
    events: Mutex<EventListeners<SchedulerEvent>>,
}

impl Shared {
    fn record_fault(&self, name: &str, fault: SchedulerError) {
        let mut guard = self.fault.lock().unwrap();
        if guard.is_none() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %fault, "scheduler task faulted");
            *guard = Some(fault.clone());
        }
        drop(guard);
        self.events.lock().unwrap().emit(&SchedulerEvent::TaskFaulted {
            name: name.to_string(),
            timestamp: Instant::now(),
            message: fault.to_string(),
        });
        self.supervisor_notify.notify_waiters();
    }

    fn task_finished(&self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        self.supervisor_notify.notify_waiters();
    }
}

/// Registry of named background tasks (periodic or one-shot) sharing one
/// fail-fast supervisor.
///
/// Each registered task runs on its own loop; tasks never block each other.
/// `wait_for_all` resolves with the first child's error, or `Ok(())` once
/// every task has exited (or immediately under cancellation).
pub struct PeriodicScheduler {
    shared: Arc<Shared>,
}

impl Default for PeriodicScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicScheduler {
    /// Creates an empty scheduler with its own cancellation token.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tasks: Mutex::new(HashMap::new()),
                anon_counter: AtomicU64::new(0),
                active_count: AtomicUsize::new(0),
                fault: Mutex::new(None),
                supervisor_notify: Notify::new(),
                cancel: CancellationToken::new(),
                events: Mutex::new(EventListeners::new()),
            }),
        }
    }

    /// Registers a listener notified of every [`SchedulerEvent`] this
    /// scheduler emits (task started, task faulted).
    pub fn add_listener<L>(&self, listener: L)
    where
        L: EventListener<SchedulerEvent> + 'static,
    {
        self.shared.events.lock().unwrap().add(listener);
    }

    /// The token threaded into every task body; firing it cuts short every
    /// task's current and future sleeps and causes `wait_for_all` to resolve
    /// cleanly rather than propagating whatever fault raced it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Cancels every task's sleep and prevents new iterations from running.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    fn resolve_name(&self, name: Option<String>) -> String {
        match name {
            Some(n) => n,
            None => {
                let n = self.shared.anon_counter.fetch_add(1, Ordering::SeqCst);
                format!("task-{n}")
            }
        }
    }

    fn register(&self, name: String) -> Result<(String, Arc<TaskControl>)> {
        let mut tasks = self.shared.tasks.lock().unwrap();
        if tasks.contains_key(&name) {
            return Err(SchedulerError::DuplicateName(name));
        }
        let control = TaskControl::new();
        tasks.insert(name.clone(), control.clone());
        Ok((name, control))
    }

    fn control(&self, name: &str) -> Result<Arc<TaskControl>> {
        self.shared
            .tasks
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownName(name.to_string()))
    }

    /// Registers a periodic task. `op` is invoked once per iteration with a
    /// clone of this scheduler's cancellation token; returning `Err` faults
    /// the whole scheduler (surfaced through `wait_for_all`).
    ///
    /// With `run_immediately = false`, the first iteration only sleeps; the
    /// body runs starting from the second iteration. A paused task skips the
    /// body and sleeps for the `infinite` sentinel until `unpause`d or
    /// `trigger`ed.
    pub fn schedule_periodic<F, Fut>(
        &self,
        name: Option<String>,
        interval: Arc<dyn IntervalProvider>,
        op: F,
        run_immediately: bool,
    ) -> Result<String>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ingest_core::Result<()>> + Send + 'static,
    {
        let name = self.resolve_name(name);
        let (name, control) = self.register(name)?;

        let shared = self.shared.clone();
        let cancel = shared.cancel.clone();
        let task_name = name.clone();
        let control_for_task = control.clone();

        shared.active_count.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let mut is_first = true;
            loop {
                if !control_for_task.should_run.load(Ordering::SeqCst) || cancel.is_cancelled() {
                    break;
                }

                let forced = control_for_task.force_run.swap(false, Ordering::SeqCst);
                let paused = control_for_task.paused.load(Ordering::SeqCst);
                let should_invoke = forced || (if is_first { run_immediately } else { true } && !paused);
                is_first = false;

                if should_invoke {
                    shared.events.lock().unwrap().emit(&SchedulerEvent::TaskStarted {
                        name: task_name.clone(),
                        timestamp: Instant::now(),
                    });
                    if let Err(e) = op(cancel.clone()).await {
                        shared.record_fault(
                            &task_name,
                            SchedulerError::TaskFailed {
                                name: task_name.clone(),
                                message: e.to_string(),
                            },
                        );
                        break;
                    }
                }

                if !control_for_task.should_run.load(Ordering::SeqCst) || cancel.is_cancelled() {
                    break;
                }

                let sleep_for = if control_for_task.paused.load(Ordering::SeqCst) {
                    INFINITE
                } else {
                    interval.value()
                };

                let notified = control_for_task.wake.notified();
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep(sleep_for) => {}
                    _ = cancel.cancelled() => break,
                }
            }
            shared.task_finished();
        });

        *control.join.try_lock().expect("uncontended at registration") = Some(handle);
        Ok(name)
    }

    /// Registers and immediately runs a one-shot task.
    pub fn schedule_task<F, Fut>(&self, name: Option<String>, op: F) -> Result<String>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ingest_core::Result<()>> + Send + 'static,
    {
        let name = self.resolve_name(name);
        let (name, control) = self.register(name)?;

        let shared = self.shared.clone();
        let cancel = shared.cancel.clone();
        let task_name = name.clone();

        shared.active_count.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            if !cancel.is_cancelled() {
                shared.events.lock().unwrap().emit(&SchedulerEvent::TaskStarted {
                    name: task_name.clone(),
                    timestamp: Instant::now(),
                });
                if let Err(e) = op(cancel.clone()).await {
                    shared.record_fault(
                        &task_name,
                        SchedulerError::TaskFailed {
                            name: task_name.clone(),
                            message: e.to_string(),
                        },
                    );
                }
            }
            shared.task_finished();
        });

        *control.join.try_lock().expect("uncontended at registration") = Some(handle);
        Ok(name)
    }

    /// Idempotently pauses or unpauses a task. Unpausing wakes it
    /// immediately so it fires on the next tick rather than waiting out
    /// whatever interval was in effect when it was paused.
    pub fn pause(&self, name: &str, paused: bool) -> Result<()> {
        let control = self.control(name)?;
        control.paused.store(paused, Ordering::SeqCst);
        if !paused {
            control.wake.notify_one();
        }
        Ok(())
    }

    /// Forces one extra body invocation on the task's next iteration, even
    /// if it's currently paused. If the task is mid-body when `trigger` is
    /// called, the forced run is simply queued for the following iteration
    /// — it may end up running twice in a row; this is intentional.
    pub fn trigger(&self, name: &str) -> Result<()> {
        let control = self.control(name)?;
        control.force_run.store(true, Ordering::SeqCst);
        control.wake.notify_one();
        Ok(())
    }

    /// Stops a task from running any further iterations and waits for its
    /// current iteration (if any) to finish. Does not cancel an in-flight
    /// body.
    pub async fn exit_and_wait(&self, name: &str) -> Result<()> {
        let control = self.control(name)?;
        control.should_run.store(false, Ordering::SeqCst);
        control.wake.notify_one();
        let handle = control.join.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }

    /// Stops every task and waits for each to finish its current iteration.
    pub async fn exit_all_and_wait(&self) {
        let names: Vec<String> = self.shared.tasks.lock().unwrap().keys().cloned().collect();
        for name in names {
            let _ = self.exit_and_wait(&name).await;
        }
    }

    /// Resolves once every task has exited, or with the first task fault.
    /// Under cancellation, resolves `Ok(())` regardless of a racing fault.
    pub async fn wait_for_all(&self) -> Result<()> {
        loop {
            if self.shared.cancel.is_cancelled() {
                return Ok(());
            }
            if let Some(fault) = self.shared.fault.lock().unwrap().clone() {
                return Err(fault);
            }
            if self.shared.active_count.load(Ordering::SeqCst) == 0 {
                return Ok(());
            }

            let notified = self.shared.supervisor_notify.notified();

            if self.shared.cancel.is_cancelled() {
                return Ok(());
            }
            if let Some(fault) = self.shared.fault.lock().unwrap().clone() {
                return Err(fault);
            }
            if self.shared.active_count.load(Ordering::SeqCst) == 0 {
                return Ok(());
            }

            tokio::select! {
                _ = notified => {}
                _ = self.shared.cancel.cancelled() => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct ConstantInterval(Duration);

    impl IntervalProvider for ConstantInterval {
        fn value(&self) -> Duration {
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_runs_immediately_when_requested() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let runs2 = runs.clone();

        scheduler
            .schedule_periodic(
                Some("t".into()),
                Arc::new(ConstantInterval(Duration::from_secs(3600))),
                move |_cancel| {
                    let runs = runs2.clone();
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                true,
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        scheduler.exit_all_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn without_run_immediately_first_iteration_only_sleeps() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let runs2 = runs.clone();

        scheduler
            .schedule_periodic(
                Some("t".into()),
                Arc::new(ConstantInterval(Duration::from_millis(50))),
                move |_cancel| {
                    let runs = runs2.clone();
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                false,
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        scheduler.exit_all_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_trigger_race_runs_task_exactly_once_each_time() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicU32::new(0));
        let runs2 = runs.clone();

        scheduler
            .schedule_periodic(
                Some("t".into()),
                Arc::new(ConstantInterval(Duration::from_secs(3600))),
                move |_cancel| {
                    let runs = runs2.clone();
                    async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                false,
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        scheduler.pause("t", true).unwrap();
        scheduler.trigger("t").unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Paused again with no further trigger: stays at 1 indefinitely.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        scheduler.pause("t", false).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        scheduler.exit_all_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_task_runs_once_and_completes() {
        let scheduler = PeriodicScheduler::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();

        scheduler
            .schedule_task(Some("once".into()), move |_cancel| {
                let ran = ran2.clone();
                async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        scheduler.wait_for_all().await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_name_is_rejected() {
        let scheduler = PeriodicScheduler::new();
        scheduler
            .schedule_task(Some("dup".into()), |_| async { Ok(()) })
            .unwrap();
        let err = scheduler
            .schedule_task(Some("dup".into()), |_| async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateName(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_surfaces_first_fault() {
        let scheduler = PeriodicScheduler::new();

        scheduler
            .schedule_task(Some("bad".into()), |_| async {
                Err(ingest_core::IngestError::FatalServer("boom".into()))
            })
            .unwrap();

        let err = scheduler.wait_for_all().await.unwrap_err();
        assert!(matches!(err, SchedulerError::TaskFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn exit_and_wait_does_not_cancel_running_body() {
        let scheduler = PeriodicScheduler::new();
        let completed = Arc::new(AtomicBool::new(false));
        let completed2 = completed.clone();

        scheduler
            .schedule_periodic(
                Some("t".into()),
                Arc::new(ConstantInterval(Duration::from_secs(3600))),
                move |_cancel| {
                    let completed = completed2.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        completed.store(true, Ordering::SeqCst);
                        Ok(())
                    }
                },
                true,
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        scheduler.exit_and_wait("t").await.unwrap();
        assert!(completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn listener_observes_started_and_faulted_events() {
        use ingest_core::events::FnListener;

        let scheduler = PeriodicScheduler::new();
        let started = Arc::new(AtomicU32::new(0));
        let faulted = Arc::new(AtomicU32::new(0));
        let started2 = started.clone();
        let faulted2 = faulted.clone();

        scheduler.add_listener(FnListener::new(move |event: &SchedulerEvent| match event {
            SchedulerEvent::TaskStarted { .. } => {
                started2.fetch_add(1, Ordering::SeqCst);
            }
            SchedulerEvent::TaskFaulted { .. } => {
                faulted2.fetch_add(1, Ordering::SeqCst);
            }
        }));

        scheduler
            .schedule_task(Some("bad".into()), |_| async {
                Err(ingest_core::IngestError::FatalServer("boom".into()))
            })
            .unwrap();

        let _ = scheduler.wait_for_all().await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(faulted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_resolves_wait_for_all_cleanly_despite_fault() {
        let scheduler = PeriodicScheduler::new();
        scheduler
            .schedule_task(Some("bad".into()), |_| async {
                Err(ingest_core::IngestError::FatalServer("boom".into()))
            })
            .unwrap();
        scheduler.cancel();
        assert!(scheduler.wait_for_all().await.is_ok());
    }
}
