//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use event_admin::{handler_fn, Event, EventHandler, HandlerRegistration, InMemoryHandlerRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

/// Records the names of the handlers that ran, in order.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self, name: &'static str) -> Arc<dyn EventHandler> {
        let calls = Arc::clone(&self.calls);
        handler_fn(move |_| {
            calls.lock().push(name.to_string());
            Ok(())
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }
}

/// A handler that forwards every event it receives.
pub fn forwarding() -> (Arc<dyn EventHandler>, Receiver<Event>) {
    let (tx, rx): (Sender<Event>, Receiver<Event>) = unbounded();
    let handler = handler_fn(move |event| {
        let _ = tx.send(event.clone());
        Ok(())
    });
    (handler, rx)
}

pub fn sleeper(ms: u64) -> Arc<dyn EventHandler> {
    handler_fn(move |_| {
        thread::sleep(Duration::from_millis(ms));
        Ok(())
    })
}

pub fn register(
    registry: &InMemoryHandlerRegistry,
    name: &str,
    topic: &str,
    handler: Arc<dyn EventHandler>,
) -> Arc<HandlerRegistration> {
    registry.register(HandlerRegistration::builder(name, handler).topic(topic).build())
}

pub fn event(topic: &str) -> Event {
    Event::with_topic(topic).unwrap()
}
