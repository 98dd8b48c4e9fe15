//! In-memory [`HandlerRegistry`].

use crate::domain::{HandlerId, HandlerRegistration};
use crate::ports::HandlerRegistry;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Registration order is preserved and is the order handlers are delivered in.
#[derive(Debug, Default)]
pub struct InMemoryHandlerRegistry {
    registrations: RwLock<Vec<Arc<HandlerRegistration>>>,
}

impl InMemoryHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration and returns the shared handle.
    pub fn register(&self, registration: HandlerRegistration) -> Arc<HandlerRegistration> {
        let registration = Arc::new(registration);
        debug!(
            handler = registration.name(),
            handler_id = %registration.id(),
            topics = ?registration.topics().cache_key(),
            "Handler registered"
        );
        self.registrations.write().push(Arc::clone(&registration));
        registration
    }

    /// Removes and deactivates a registration. In-flight deliveries that
    /// already resolved it will skip it.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut registrations = self.registrations.write();
        let Some(pos) = registrations.iter().position(|r| r.id() == id) else {
            return false;
        };
        let removed = registrations.remove(pos);
        removed.deactivate();
        info!(handler = removed.name(), handler_id = %id, "Handler unregistered");
        true
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }
}

impl HandlerRegistry for InMemoryHandlerRegistry {
    fn lookup_handlers(&self) -> Vec<Arc<HandlerRegistration>> {
        self.registrations.read().clone()
    }
}
