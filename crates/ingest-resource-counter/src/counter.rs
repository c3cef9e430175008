//! The counter itself.

use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::{ResourceCounterError, Result};

struct State {
    /// Units currently available. May go negative right after a capacity
    /// shrink that undercuts what's already outstanding; it recovers as
    /// outstanding units are freed.
    count: i64,
    capacity: i64,
}

/// An async-acquirable unit-weighted counter with dynamic capacity.
///
/// Unlike a [`tokio::sync::Semaphore`], `ResourceCounter` lets a caller take
/// more than one unit at a time, take fewer units than requested when
/// `block` is `false`, and have its capacity resized at runtime without
/// rebuilding the counter. It's the shared admission budget components in
/// this toolkit block on before starting new work — database connections,
/// in-flight upload bytes, or any other finite resource whose ceiling can
/// move while the process is running.
///
/// All waiters are woken on every `free` or `set_capacity` call; a waiter
/// that finds nothing available re-parks rather than spinning.
pub struct ResourceCounter {
    state: Mutex<State>,
    notify: Notify,
}

impl ResourceCounter {
    /// Creates a counter with the given starting capacity, fully available.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is negative; construction time is not the place
    /// to recover from a caller's programming error.
    pub fn new(capacity: i64) -> Self {
        assert!(capacity >= 0, "resource counter capacity must be >= 0");
        Self {
            state: Mutex::new(State {
                count: capacity,
                capacity,
            }),
            notify: Notify::new(),
        }
    }

    /// Requests up to `requested` units.
    ///
    /// When `block` is `false`, returns immediately with however many units
    /// are available right now, from `0` up to `requested` — it never waits.
    /// When `block` is `true`, it waits until at least one unit is available
    /// and then returns a grant between `1` and `requested`; it never waits
    /// for the *full* amount, since that could starve other callers
    /// indefinitely once capacity is smaller than a single large request.
    ///
    /// `take(0, _)` always returns `0` without touching the lock.
    pub async fn take(&self, requested: i64, block: bool) -> Result<i64> {
        if requested < 0 {
            return Err(ResourceCounterError::InvalidArgument(format!(
                "requested units must be >= 0, got {requested}"
            )));
        }
        if requested == 0 {
            return Ok(0);
        }

        loop {
            let notified = self.notify.notified();

            {
                let mut state = self.state.lock().expect("resource counter mutex poisoned");
                if state.count > 0 {
                    let granted = requested.min(state.count);
                    state.count -= granted;
                    return Ok(granted);
                }
                if !block {
                    return Ok(0);
                }
            }

            notified.await;
        }
    }

    /// Returns `n` units to the pool, waking every waiter.
    pub fn free(&self, n: i64) -> Result<()> {
        if n < 0 {
            return Err(ResourceCounterError::InvalidArgument(format!(
                "freed units must be >= 0, got {n}"
            )));
        }
        if n == 0 {
            return Ok(());
        }
        {
            let mut state = self.state.lock().expect("resource counter mutex poisoned");
            state.count += n;
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Resizes capacity to `capacity`, adjusting `count` by the delta.
    ///
    /// Shrinking capacity below what's currently outstanding is allowed and
    /// drives `count` negative; no further grants happen until enough units
    /// have been freed to bring it back above zero. Growing capacity wakes
    /// every waiter immediately.
    pub fn set_capacity(&self, capacity: i64) -> Result<()> {
        if capacity < 0 {
            return Err(ResourceCounterError::InvalidArgument(format!(
                "capacity must be >= 0, got {capacity}"
            )));
        }
        {
            let mut state = self.state.lock().expect("resource counter mutex poisoned");
            let delta = capacity - state.capacity;
            state.count += delta;
            state.capacity = capacity;
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// The current capacity ceiling.
    pub fn capacity(&self) -> i64 {
        self.state.lock().expect("resource counter mutex poisoned").capacity
    }

    /// The current available count (may be negative after a capacity
    /// shrink; see [`ResourceCounter::set_capacity`]).
    pub fn count(&self) -> i64 {
        self.state.lock().expect("resource counter mutex poisoned").count
    }
}
