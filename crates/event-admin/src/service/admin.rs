//! The [`EventAdmin`] facade and its builder.

use crate::adapters::{AllowAllAuthority, InMemoryHandlerRegistry};
use crate::dispatch::{
    AsyncDeliverTasks, CloseMode, DeliveryReport, PoolConfig, PoolStats, SyncDeliverTasks,
    ThreadPool,
};
use crate::domain::{DispatchSettings, Event, EventAdminConfig, Identity};
use crate::error::{EventAdminError, Result};
use crate::handler::{Blacklist, HandlerResolver};
use crate::ports::{EventAdminApi, HandlerRegistry, TopicAuthority};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SYNC_POOL: &str = "eventadmin-sync";
const ASYNC_POOL: &str = "eventadmin-async";

/// Lifecycle of the bus. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdminState {
    Running = 0,
    Stopped = 1,
}

struct Core {
    registry: Arc<dyn HandlerRegistry>,
    resolver: HandlerResolver,
    sync: Arc<SyncDeliverTasks>,
    asynchronous: AsyncDeliverTasks,
    sync_pool: Arc<ThreadPool>,
    async_pool: Arc<ThreadPool>,
    settings: DispatchSettings,
    state: AtomicU8,
}

impl Core {
    fn ensure_running(&self, operation: &'static str) -> Result<()> {
        if self.state.load(Ordering::Acquire) == AdminState::Stopped as u8 {
            return Err(EventAdminError::IllegalState { operation });
        }
        Ok(())
    }

    fn publish(&self, producer: &Identity, event: Event) -> Result<()> {
        self.ensure_running("publish")?;
        let event = Arc::new(event);
        let tasks = self
            .resolver
            .resolve(producer, &event, &self.registry.lookup_handlers());
        if !tasks.is_empty() {
            self.asynchronous.deliver(tasks);
        }
        Ok(())
    }

    fn send(&self, producer: &Identity, event: Event) -> Result<DeliveryReport> {
        self.ensure_running("send")?;
        let event = Arc::new(event);
        let tasks = self
            .resolver
            .resolve(producer, &event, &self.registry.lookup_handlers());
        if tasks.is_empty() {
            return Ok(DeliveryReport::default());
        }
        Ok(self.sync.deliver(&tasks))
    }

    fn stop(&self) {
        let first = self
            .state
            .compare_exchange(
                AdminState::Running as u8,
                AdminState::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !first {
            return;
        }
        info!("Stopping event admin");
        let async_busy = self.async_pool.close(CloseMode::Drain);
        let sync_busy = self.sync_pool.close(CloseMode::Drain);
        info!(async_busy, sync_busy, blacklisted = self.resolver.blacklist().len(), "Event admin stopped");
    }

    fn state(&self) -> AdminState {
        if self.state.load(Ordering::Acquire) == AdminState::Stopped as u8 {
            AdminState::Stopped
        } else {
            AdminState::Running
        }
    }
}

/// In-process event bus.
///
/// Cloning is cheap and every clone drives the same bus.
#[derive(Clone)]
pub struct EventAdmin {
    core: Arc<Core>,
}

impl EventAdmin {
    pub fn builder(config: &EventAdminConfig) -> EventAdminBuilder {
        EventAdminBuilder {
            settings: config.normalized(),
            registry: None,
            authority: Arc::new(AllowAllAuthority),
        }
    }

    /// Default configuration, allow-all authorization.
    pub fn with_defaults(registry: Arc<dyn HandlerRegistry>) -> Self {
        Self::builder(&EventAdminConfig::default())
            .registry(registry)
            .build()
    }

    /// A handle that publishes as `identity` instead of the system identity.
    pub fn for_producer(&self, identity: Identity) -> Producer {
        Producer {
            core: Arc::clone(&self.core),
            identity,
        }
    }

    /// Queues `event` for asynchronous delivery.
    ///
    /// # Errors
    /// - `IllegalState`: the bus was stopped
    pub fn publish(&self, event: Event) -> Result<()> {
        self.core.publish(&Identity::system(), event)
    }

    /// Delivers `event` and waits for every matched handler.
    ///
    /// # Errors
    /// - `IllegalState`: the bus was stopped
    pub fn send(&self, event: Event) -> Result<()> {
        self.core.send(&Identity::system(), event).map(|_| ())
    }

    /// Like [`send`](Self::send), returning the per-handler tally.
    pub fn send_with_report(&self, event: Event) -> Result<DeliveryReport> {
        self.core.send(&Identity::system(), event)
    }

    /// Stops the bus. The first call drains the async pool, then the sync
    /// pool; later calls return immediately.
    ///
    /// Calling this from inside a handler blocks for up to the shutdown
    /// grace, since the calling worker counts as busy.
    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == AdminState::Stopped
    }

    pub fn state(&self) -> AdminState {
        self.core.state()
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.core.settings
    }

    pub fn blacklist(&self) -> &Arc<Blacklist> {
        self.core.resolver.blacklist()
    }

    pub fn sync_pool_stats(&self) -> PoolStats {
        self.core.sync_pool.stats()
    }

    pub fn async_pool_stats(&self) -> PoolStats {
        self.core.async_pool.stats()
    }
}

impl EventAdminApi for EventAdmin {
    fn publish(&self, event: Event) -> Result<()> {
        EventAdmin::publish(self, event)
    }

    fn send(&self, event: Event) -> Result<()> {
        EventAdmin::send(self, event)
    }

    fn stop(&self) {
        EventAdmin::stop(self);
    }

    fn is_stopped(&self) -> bool {
        EventAdmin::is_stopped(self)
    }
}

/// An [`EventAdmin`] bound to one producer identity.
#[derive(Clone)]
pub struct Producer {
    core: Arc<Core>,
    identity: Identity,
}

impl Producer {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn publish(&self, event: Event) -> Result<()> {
        self.core.publish(&self.identity, event)
    }

    pub fn send(&self, event: Event) -> Result<()> {
        self.core.send(&self.identity, event).map(|_| ())
    }
}

impl EventAdminApi for Producer {
    fn publish(&self, event: Event) -> Result<()> {
        Producer::publish(self, event)
    }

    fn send(&self, event: Event) -> Result<()> {
        Producer::send(self, event)
    }

    fn stop(&self) {
        self.core.stop();
    }

    fn is_stopped(&self) -> bool {
        self.core.state() == AdminState::Stopped
    }
}

/// Wires an [`EventAdmin`].
pub struct EventAdminBuilder {
    settings: DispatchSettings,
    registry: Option<Arc<dyn HandlerRegistry>>,
    authority: Arc<dyn TopicAuthority>,
}

impl EventAdminBuilder {
    /// Defaults to an empty [`InMemoryHandlerRegistry`].
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn authority(mut self, authority: Arc<dyn TopicAuthority>) -> Self {
        self.authority = authority;
        self
    }

    /// Overrides the per-handler deadline without the configuration floor.
    /// `None` disables the watchdog.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.timeout = timeout;
        self
    }

    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.settings.shutdown_grace = grace;
        self
    }

    pub fn build(self) -> EventAdmin {
        let settings = self.settings;
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryHandlerRegistry::new()) as Arc<dyn HandlerRegistry>);
        let blacklist = Arc::new(Blacklist::new());

        let sync_pool = Arc::new(ThreadPool::new(PoolConfig {
            name: SYNC_POOL.to_string(),
            max_size: settings.sync_pool_size,
            keep_alive: settings.keep_alive,
            shutdown_grace: settings.shutdown_grace,
        }));
        let async_pool = Arc::new(ThreadPool::new(PoolConfig {
            name: ASYNC_POOL.to_string(),
            max_size: settings.async_pool_size,
            keep_alive: settings.keep_alive,
            shutdown_grace: settings.shutdown_grace,
        }));

        let sync = Arc::new(SyncDeliverTasks::new(
            Arc::clone(&sync_pool),
            Arc::clone(&blacklist),
            &settings,
        ));
        let asynchronous = AsyncDeliverTasks::new(Arc::clone(&async_pool), Arc::clone(&sync));
        let resolver = HandlerResolver::new(&settings, self.authority, blacklist);

        debug!(
            sync_pool = settings.sync_pool_size,
            async_pool = settings.async_pool_size,
            timeout = ?settings.timeout,
            "Event admin started"
        );

        EventAdmin {
            core: Arc::new(Core {
                registry,
                resolver,
                sync,
                asynchronous,
                sync_pool,
                async_pool,
                settings,
                state: AtomicU8::new(AdminState::Running as u8),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{handler_fn, HandlerRegistration};
    use std::sync::atomic::AtomicUsize;

    fn counting_admin(topic: &str) -> (EventAdmin, Arc<AtomicUsize>) {
        let registry = Arc::new(InMemoryHandlerRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        registry.register(
            HandlerRegistration::builder(
                "counter",
                handler_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .topic(topic)
            .build(),
        );
        (EventAdmin::with_defaults(registry), calls)
    }

    #[test]
    fn test_send_delivers_before_returning() {
        let (admin, calls) = counting_admin("x");
        admin.send(Event::with_topic("x").unwrap()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        admin.stop();
    }

    #[test]
    fn test_unmatched_event_does_not_start_workers() {
        let (admin, calls) = counting_admin("x");
        admin.publish(Event::with_topic("y").unwrap()).unwrap();
        admin.send(Event::with_topic("y").unwrap()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(admin.sync_pool_stats().live_workers, 0);
        assert_eq!(admin.async_pool_stats().live_workers, 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_terminal() {
        let (admin, calls) = counting_admin("x");
        admin.stop();
        admin.stop();
        assert_eq!(admin.state(), AdminState::Stopped);

        let err = admin.publish(Event::with_topic("x").unwrap()).unwrap_err();
        assert_eq!(err.as_label(), "illegal_state");
        let err = admin.send(Event::with_topic("x").unwrap()).unwrap_err();
        assert_eq!(err.as_label(), "illegal_state");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_drains_published_events() {
        let (admin, calls) = counting_admin("x");
        for _ in 0..10 {
            admin.publish(Event::with_topic("x").unwrap()).unwrap();
        }
        admin.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_builder_timeout_bypasses_floor() {
        let admin = EventAdmin::builder(&EventAdminConfig::default())
            .timeout(Some(Duration::from_millis(50)))
            .build();
        assert_eq!(admin.settings().timeout, Some(Duration::from_millis(50)));

        let floored = EventAdmin::builder(&EventAdminConfig {
            timeout_ms: 50,
            ..EventAdminConfig::default()
        })
        .build();
        assert_eq!(floored.settings().timeout, None);
    }
}
