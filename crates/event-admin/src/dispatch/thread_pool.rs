//! # Thread Pool
//!
//! A bounded pool of named OS threads sharing one job queue.
//!
//! ```text
//! submit(job) ──► [queue] ──► worker-1 ──► job()   (panics caught)
//!                    │
//!                    └──────► worker-N             (spawned lazily, N <= max_size)
//!
//! execute(job), pool saturated ──► overflow thread ──► job()
//! ```
//!
//! The queue, the idle count and the worker count live under one mutex, so a
//! job is claimed and its worker leaves the idle set in a single step. A
//! worker is spawned whenever no idle worker is left for a new job. Workers
//! exit after `keep_alive` without work. `close` stops intake and waits
//! (bounded by `shutdown_grace`) for the workers to finish.

use super::panic_message;
use crate::error::{EventAdminError, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// What `close` does with work that is still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Run everything already queued, then exit.
    Drain,
    /// Drop queued work; only jobs already running finish.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub live_workers: usize,
    pub idle_workers: usize,
    pub queued_jobs: usize,
    /// Threads started by `execute` beyond `max_size` that are still running.
    pub overflow_threads: usize,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub name: String,
    pub max_size: usize,
    pub keep_alive: Duration,
    pub shutdown_grace: Duration,
}

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    live: usize,
    /// Workers parked waiting for a job. Never counts a worker that has
    /// already claimed one.
    idle: usize,
    overflow: usize,
    spawned: u64,
    closed: bool,
}

impl PoolState {
    /// True if a parked worker is free for one more job.
    fn has_spare_worker(&self) -> bool {
        self.idle > self.queue.len()
    }
}

struct Shared {
    config: PoolConfig,
    state: Mutex<PoolState>,
    work_available: Condvar,
    exited: Condvar,
}

pub struct ThreadPool {
    shared: Arc<Shared>,
}

impl ThreadPool {
    pub fn new(config: PoolConfig) -> Self {
        debug!(
            pool = %config.name,
            max_size = config.max_size,
            keep_alive = ?config.keep_alive,
            "Thread pool created"
        );
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(PoolState::default()),
                work_available: Condvar::new(),
                exited: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn max_size(&self) -> usize {
        self.shared.config.max_size
    }

    /// Queues `job`. It may wait in the queue while all `max_size` workers
    /// are busy.
    ///
    /// # Errors
    /// - `PoolClosed`: `close` was called
    pub fn submit(&self, job: Job) -> Result<()> {
        let mut state = self.open_state()?;
        self.dispatch(&mut state, job);
        Ok(())
    }

    /// Starts `job` without queueing behind busy workers: when the pool is
    /// saturated it runs on a dedicated overflow thread instead.
    ///
    /// # Errors
    /// - `PoolClosed`: `close` was called
    pub fn execute(&self, job: Job) -> Result<()> {
        let mut state = self.open_state()?;
        if state.has_spare_worker() || state.live < self.shared.config.max_size {
            self.dispatch(&mut state, job);
            return Ok(());
        }
        if let Some(job) = Shared::spawn_overflow(&self.shared, &mut state, job) {
            // No thread could be started; the job waits for a worker.
            state.queue.push_back(job);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            live_workers: state.live,
            idle_workers: state.idle,
            queued_jobs: state.queue.len(),
            overflow_threads: state.overflow,
        }
    }

    /// Stops intake and waits up to the shutdown grace for workers to exit.
    /// Returns the number of workers still running afterwards. Calling it
    /// again is a no-op that reports the current count. Overflow threads are
    /// not waited for.
    pub fn close(&self, mode: CloseMode) -> usize {
        let mut state = self.shared.state.lock();
        if state.closed {
            return state.live;
        }
        state.closed = true;
        if mode == CloseMode::Discard {
            let discarded = std::mem::take(&mut state.queue);
            if !discarded.is_empty() {
                debug!(pool = self.name(), discarded = discarded.len(), "Discarded queued jobs");
            }
        }
        self.shared.work_available.notify_all();

        let deadline = Instant::now() + self.shared.config.shutdown_grace;
        while state.live > 0 {
            if self.shared.exited.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        if state.live > 0 {
            warn!(
                pool = self.name(),
                busy = state.live,
                queued = state.queue.len(),
                grace = ?self.shared.config.shutdown_grace,
                "Workers still busy after shutdown grace; abandoning them"
            );
        } else {
            info!(pool = self.name(), ?mode, "Thread pool closed");
        }
        state.live
    }

    fn open_state(&self) -> Result<MutexGuard<'_, PoolState>> {
        let state = self.shared.state.lock();
        if state.closed {
            return Err(EventAdminError::PoolClosed {
                pool: self.shared.config.name.clone(),
            });
        }
        Ok(state)
    }

    fn dispatch(&self, state: &mut PoolState, job: Job) {
        let spare = state.has_spare_worker();
        state.queue.push_back(job);
        if spare {
            self.shared.work_available.notify_one();
        } else if state.live < self.shared.config.max_size {
            Shared::spawn_worker(&self.shared, state);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Workers run what is queued, then exit.
        self.shared.state.lock().closed = true;
        self.shared.work_available.notify_all();
    }
}

impl Shared {
    fn spawn_worker(this: &Arc<Self>, state: &mut PoolState) {
        state.spawned += 1;
        let name = format!("{}-{}", this.config.name, state.spawned);
        let shared = Arc::clone(this);
        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || shared.run_worker())
        {
            Ok(_) => {
                state.live += 1;
                debug!(pool = %this.config.name, worker = %name, live = state.live, "Worker started");
            }
            Err(e) => {
                error!(pool = %this.config.name, error = %e, "Failed to spawn worker");
            }
        }
    }

    /// Returns the job if no thread could be started for it.
    fn spawn_overflow(this: &Arc<Self>, state: &mut PoolState, job: Job) -> Option<Job> {
        state.spawned += 1;
        let name = format!("{}-overflow-{}", this.config.name, state.spawned);
        let slot = Arc::new(Mutex::new(Some(job)));
        let claimed = Arc::clone(&slot);
        let shared = Arc::clone(this);
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            if let Some(job) = claimed.lock().take() {
                shared.run_job(job);
            }
            shared.state.lock().overflow -= 1;
        });
        match spawned {
            Ok(_) => {
                state.overflow += 1;
                debug!(
                    pool = %this.config.name,
                    thread = %name,
                    overflow = state.overflow,
                    "Pool saturated; started overflow thread"
                );
                None
            }
            Err(e) => {
                error!(pool = %this.config.name, error = %e, "Failed to spawn overflow thread");
                slot.lock().take()
            }
        }
    }

    fn run_worker(&self) {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.queue.pop_front() {
                MutexGuard::unlocked(&mut state, || self.run_job(job));
                continue;
            }
            if state.closed {
                break;
            }

            state.idle += 1;
            let deadline = Instant::now() + self.config.keep_alive;
            let timed_out = self.work_available.wait_until(&mut state, deadline).timed_out();
            state.idle -= 1;
            if timed_out && state.queue.is_empty() {
                break;
            }
        }
        state.live -= 1;
        self.exited.notify_all();
    }

    fn run_job(&self, job: Job) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
            error!(
                pool = %self.config.name,
                panic = %panic_message(panic.as_ref()),
                "Job panicked; worker continues"
            );
        }
    }
}
