//! # Asynchronous Delivery
//!
//! `deliver` hands a resolved batch to the async pool and returns at once.
//! Batches posted by the same producer thread are delivered in posting order:
//!
//! ```text
//! producer thread T ── deliver(b1) ──► pending[T] = [b1] ──► submit drain(T)
//!                  └── deliver(b2) ──► pending[T] = [b1, b2]   (drain(T) already queued)
//!
//! drain(T): pop front ─► sync.deliver(batch) ─► repeat; remove pending[T] when empty
//! ```
//!
//! Different producer threads drain independently.

use super::sync_deliver::SyncDeliverTasks;
use super::thread_pool::ThreadPool;
use crate::domain::HandlerTask;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::warn;

type PendingBatches = Mutex<HashMap<ThreadId, VecDeque<Vec<HandlerTask>>>>;

pub struct AsyncDeliverTasks {
    pool: Arc<ThreadPool>,
    sync: Arc<SyncDeliverTasks>,
    pending: Arc<PendingBatches>,
}

impl AsyncDeliverTasks {
    pub fn new(pool: Arc<ThreadPool>, sync: Arc<SyncDeliverTasks>) -> Self {
        Self {
            pool,
            sync,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Queues `tasks` for delivery. Never blocks on handlers and never fails;
    /// a refused submission is logged and the batch dropped.
    pub fn deliver(&self, tasks: Vec<HandlerTask>) {
        if tasks.is_empty() {
            return;
        }
        let producer = thread::current().id();
        {
            let mut pending = self.pending.lock();
            if let Some(queue) = pending.get_mut(&producer) {
                queue.push_back(tasks);
                return;
            }
            pending.insert(producer, VecDeque::from([tasks]));
        }

        let pending = Arc::clone(&self.pending);
        let sync = Arc::clone(&self.sync);
        let submitted = self
            .pool
            .submit(Box::new(move || drain(&pending, &sync, producer)));
        if let Err(e) = submitted {
            let dropped = self
                .pending
                .lock()
                .remove(&producer)
                .map_or(0, |queue| queue.iter().map(Vec::len).sum::<usize>());
            warn!(
                label = e.as_label(),
                pool = self.pool.name(),
                dropped,
                error = %e,
                "Async delivery rejected"
            );
        }
    }

    /// Batches accepted but not yet handed to the sync strategy.
    pub fn pending_batches(&self) -> usize {
        self.pending.lock().values().map(VecDeque::len).sum()
    }
}

fn drain(pending: &PendingBatches, sync: &SyncDeliverTasks, producer: ThreadId) {
    loop {
        let batch = {
            let mut pending = pending.lock();
            match pending.get_mut(&producer).and_then(VecDeque::pop_front) {
                Some(batch) => batch,
                None => {
                    pending.remove(&producer);
                    return;
                }
            }
        };
        sync.deliver(&batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::thread_pool::{CloseMode, PoolConfig};
    use crate::domain::{handler_fn, DispatchSettings, Event, HandlerRegistration, Properties};
    use crate::handler::Blacklist;
    use std::time::Duration;

    fn pool(name: &str) -> Arc<ThreadPool> {
        Arc::new(ThreadPool::new(PoolConfig {
            name: name.to_string(),
            max_size: 4,
            keep_alive: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
        }))
    }

    fn strategy() -> AsyncDeliverTasks {
        let sync = SyncDeliverTasks::new(
            pool("sync"),
            Arc::new(Blacklist::new()),
            &DispatchSettings::default(),
        );
        AsyncDeliverTasks::new(pool("async"), Arc::new(sync))
    }

    #[test]
    fn test_batches_from_one_thread_keep_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registration = Arc::new(
            HandlerRegistration::builder(
                "order",
                handler_fn(move |event| {
                    if let Some(seq) = event.property("seq") {
                        sink.lock().push(seq.as_text());
                    }
                    Ok(())
                }),
            )
            .topic("x")
            .build(),
        );

        let strategy = strategy();
        for seq in 0..50 {
            let event = Event::new("x", Properties::new().with("seq", seq)).unwrap();
            strategy.deliver(vec![HandlerTask::new(Arc::new(event), Arc::clone(&registration))]);
        }
        strategy.pool.close(CloseMode::Drain);

        let expected: Vec<String> = (0..50).map(|seq: i32| seq.to_string()).collect();
        assert_eq!(*seen.lock(), expected);
        assert_eq!(strategy.pending_batches(), 0);
    }

    #[test]
    fn test_closed_pool_drops_batch_quietly() {
        let strategy = strategy();
        strategy.pool.close(CloseMode::Drain);
        let registration = Arc::new(
            HandlerRegistration::builder("late", handler_fn(|_| Ok(())))
                .topic("x")
                .build(),
        );
        let event = Arc::new(Event::with_topic("x").unwrap());
        strategy.deliver(vec![HandlerTask::new(event, registration)]);
        assert_eq!(strategy.pending_batches(), 0);
    }
}
