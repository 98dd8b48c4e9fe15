//! # Synchronous Delivery
//!
//! Delivers a resolved batch on the calling thread, one handler at a time:
//!
//! ```text
//! for task in tasks:
//!     inactive / blacklisted ──────────────► skipped
//!     watchdog off or name ignored ────────► invoke inline
//!     otherwise ── execute on sync pool ─► handler started ─► wait <= timeout
//!                        │                                      ├─ done    ► delivered / failed
//!                        │ (pool closed)                        └─ elapsed ► blacklist, abandon worker
//!                        └──────────────────────► invoke inline
//! ```
//!
//! The deadline counts from the moment the handler starts running, so time
//! spent waiting for a thread never counts against it. A saturated pool
//! starts an overflow thread rather than queueing the invocation.
//!
//! A timed-out worker is never interrupted; it finishes (or hangs) on its
//! own and the handler is never called again.

use super::ignore::IgnoreTimeout;
use super::panic_message;
use super::thread_pool::ThreadPool;
use crate::domain::{DispatchSettings, HandlerTask};
use crate::error::EventAdminError;
use crate::handler::Blacklist;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-batch delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed + self.timed_out
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::TimedOut => self.timed_out += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered,
    Failed,
    TimedOut,
    Skipped,
}

pub struct SyncDeliverTasks {
    pool: Arc<ThreadPool>,
    blacklist: Arc<Blacklist>,
    timeout: Option<Duration>,
    ignore: IgnoreTimeout,
}

impl SyncDeliverTasks {
    pub fn new(pool: Arc<ThreadPool>, blacklist: Arc<Blacklist>, settings: &DispatchSettings) -> Self {
        Self {
            pool,
            blacklist,
            timeout: settings.timeout,
            ignore: IgnoreTimeout::new(&settings.ignore_timeout),
        }
    }

    /// Blocks until every task completed or timed out.
    pub fn deliver(&self, tasks: &[HandlerTask]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for task in tasks {
            report.record(self.deliver_one(task));
        }
        if report.timed_out > 0 || report.failed > 0 {
            debug!(?report, "Delivered batch with failures");
        }
        report
    }

    fn deliver_one(&self, task: &HandlerTask) -> Outcome {
        if !task.registration().is_active() {
            debug!(
                handler = task.handler_name(),
                handler_id = %task.handler_id(),
                "Handler unregistered before delivery; skipping"
            );
            return Outcome::Skipped;
        }
        if self.blacklist.is_blacklisted(&task.handler_id()) {
            return Outcome::Skipped;
        }

        match self.timeout {
            Some(timeout) if !self.ignore.is_ignored(task.handler_name()) => {
                self.invoke_with_deadline(task, timeout)
            }
            _ => invoke(task),
        }
    }

    fn invoke_with_deadline(&self, task: &HandlerTask, timeout: Duration) -> Outcome {
        let (started_tx, started_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);
        let helper = task.clone();
        let submitted = self.pool.execute(Box::new(move || {
            let _ = started_tx.send(());
            let _ = done_tx.send(invoke(&helper));
        }));
        if let Err(e) = submitted {
            debug!(handler = task.handler_name(), error = %e, "Invoking handler inline");
            return invoke(task);
        }

        // The pool dropped the helper without running it.
        if started_rx.recv().is_err() {
            return Outcome::Skipped;
        }

        match done_rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.blacklist.add(task.shared_registration());
                let err = EventAdminError::HandlerTimeout {
                    handler: task.handler_name().to_string(),
                    id: task.handler_id(),
                    timeout,
                };
                warn!(
                    label = err.as_label(),
                    handler = task.handler_name(),
                    handler_id = %task.handler_id(),
                    topic = task.event().topic(),
                    error = %err,
                    "Handler blacklisted"
                );
                Outcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => Outcome::Skipped,
        }
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }
}

fn invoke(task: &HandlerTask) -> Outcome {
    let handler = task.registration().handler();
    let reason = match catch_unwind(AssertUnwindSafe(|| handler.handle_event(task.event()))) {
        Ok(Ok(())) => return Outcome::Delivered,
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
    };

    let err = EventAdminError::HandlerFailure {
        handler: task.handler_name().to_string(),
        id: task.handler_id(),
        reason,
    };
    warn!(
        label = err.as_label(),
        handler = task.handler_name(),
        handler_id = %task.handler_id(),
        topic = task.event().topic(),
        error = %err,
        "Handler failed"
    );
    Outcome::Failed
}
