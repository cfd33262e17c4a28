//! Scheduler: recurring tasks that choose their own cadence.
//!
//! Every scheduled task gets a dedicated tokio task and a cancellation
//! token. The loop sleeps for the current delay, runs the task, and re-arms
//! with whatever delay the task returned:
//!
//! ```text
//! schedule(task, d)
//!   |
//!   +-- sleep(d) ----------------- cancelled? --> exit
//!   |
//!   +-- task.run().await
//!   |     |
//!   |     +-- Ok(next)       --> d = next
//!   |     +-- Err(e) / panic --> warn, d = max(MIN_ERROR_BACKOFF_MS, d)
//!   |
//!   +-- loop
//! ```
//!
//! Cancellation only interrupts the sleep. A `run()` already in flight is
//! always allowed to finish; the loop exits right after it. Use
//! [`Scheduler::shutdown`] to also wait for those runs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

/// Floor on the re-arm delay after a failed run.
pub const MIN_ERROR_BACKOFF_MS: u64 = 5_000;

/// A unit of recurring work. `run` returns the delay before its next run.
#[async_trait]
pub trait ScheduledTask: Send {
    fn id(&self) -> &str;

    fn name(&self) -> &str {
        self.id()
    }

    async fn run(&mut self) -> anyhow::Result<u64>;
}

struct TaskSlot {
    token: CancellationToken,
    generation: u64,
}

struct SchedulerInner {
    slots: DashMap<String, TaskSlot>,
    accepting: AtomicBool,
    generation: AtomicU64,
    drivers: TaskTracker,
}

/// Cheap to clone; clones share the same timers.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .field("active_tasks", &self.inner.slots.len())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A fresh scheduler accepts `schedule` calls immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                slots: DashMap::new(),
                accepting: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                drivers: TaskTracker::new(),
            }),
        }
    }

    /// Re-enable the scheduler and run every task once, immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, tasks: Vec<Box<dyn ScheduledTask>>) {
        self.inner.accepting.store(true, Ordering::SeqCst);
        for task in tasks {
            self.schedule(task, 0);
        }
    }

    /// Arm the single timer for `task.id()`, replacing any existing one.
    ///
    /// A no-op after [`stop_all`](Self::stop_all) until the next `start`.
    pub fn schedule(&self, task: Box<dyn ScheduledTask>, delay_ms: u64) {
        if !self.is_running() {
            debug!(task = task.id(), "Scheduler is stopped, ignoring schedule request");
            return;
        }

        let id = task.id().to_string();
        let token = CancellationToken::new();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let slot = TaskSlot {
            token: token.clone(),
            generation,
        };
        if let Some(previous) = self.inner.slots.insert(id.clone(), slot) {
            previous.token.cancel();
            debug!(task = %id, "Replaced existing timer");
        }

        // A concurrent stop_all may have swept the slots before our insert
        if !self.is_running() {
            self.inner
                .slots
                .remove_if(&id, |_, slot| slot.generation == generation);
            token.cancel();
            debug!(task = %id, "Scheduler stopped while arming, timer dropped");
            return;
        }

        trace!(task = %id, delay_ms, "Timer armed");
        let inner = Arc::clone(&self.inner);
        self.inner
            .drivers
            .spawn(drive(task, delay_ms, token, inner, generation));
    }

    /// Cancel one task's timer. Returns whether the task was scheduled.
    pub fn stop(&self, id: &str) -> bool {
        match self.inner.slots.remove(id) {
            Some((_, slot)) => {
                slot.token.cancel();
                debug!(task = id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every timer and refuse new ones until [`start`](Self::start).
    pub fn stop_all(&self) {
        self.inner.accepting.store(false, Ordering::SeqCst);
        let ids: Vec<String> = self.inner.slots.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            if let Some((_, slot)) = self.inner.slots.remove(id) {
                slot.token.cancel();
            }
        }
        debug!(cancelled = ids.len(), "All timers cancelled");
    }

    /// [`stop_all`](Self::stop_all), then wait for in-flight runs to finish.
    pub async fn shutdown(&self) {
        self.stop_all();
        self.inner.drivers.close();
        self.inner.drivers.wait().await;
        self.inner.drivers.reopen();
        debug!("All timer tasks exited");
    }

    pub fn is_running(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Ids with a live timer, sorted.
    pub fn active_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.slots.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

async fn drive(
    mut task: Box<dyn ScheduledTask>,
    first_delay_ms: u64,
    token: CancellationToken,
    inner: Arc<SchedulerInner>,
    generation: u64,
) {
    let id = task.id().to_string();
    let mut delay_ms = first_delay_ms;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }

        let outcome = AssertUnwindSafe(task.run()).catch_unwind().await;
        let error = match outcome {
            Ok(Ok(next_ms)) => {
                delay_ms = next_ms;
                trace!(task = %id, delay_ms, "Timer re-armed");
                continue;
            }
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => format!("panicked: {}", panic_message(&*payload)),
        };

        delay_ms = delay_ms.max(MIN_ERROR_BACKOFF_MS);
        warn!(
            task = %id,
            name = task.name(),
            error = %error,
            backoff_ms = delay_ms,
            "Scheduled task failed, backing off"
        );
    }

    // A replacement timer may already own the slot
    inner
        .slots
        .remove_if(&id, |_, slot| slot.generation == generation);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
