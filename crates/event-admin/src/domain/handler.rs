//! # Handler registrations
//!
//! A [`HandlerRegistration`] is owned by the registry. The core only reads it
//! while resolving and delivering one event, and tolerates it being
//! unregistered at any point in between (see [`HandlerRegistration::is_active`]).

use super::event::Event;
use super::filter::{FilterSource, PropertyFilter};
use super::topic::TopicPatterns;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Unique, stable identifier of a handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandlerId(Uuid);

impl HandlerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandlerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The party on whose behalf an event is published or received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub const SYSTEM: &'static str = "system";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity used by the facade's own `publish`/`send`.
    #[must_use]
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscriber callback.
///
/// Implementations should return quickly. A handler that does not return
/// within the configured timeout is blacklisted for the lifetime of the bus.
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn handle_event(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

/// Wraps a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A handler as seen by the delivery engine.
pub struct HandlerRegistration {
    id: HandlerId,
    name: String,
    owner: Identity,
    topics: TopicPatterns,
    filter: Option<FilterSource>,
    handler: Arc<dyn EventHandler>,
    active: AtomicBool,
}

impl HandlerRegistration {
    /// Starts a registration for `handler`, identified by a dotted `name`
    /// (e.g. `org.example.audit.AuditHandler`).
    pub fn builder(name: impl Into<String>, handler: Arc<dyn EventHandler>) -> RegistrationBuilder {
        RegistrationBuilder {
            name: name.into(),
            handler,
            owner: Identity::system(),
            topics: None,
            filter: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    #[must_use]
    pub fn topics(&self) -> &TopicPatterns {
        &self.topics
    }

    #[must_use]
    pub fn filter(&self) -> Option<&FilterSource> {
        self.filter.as_ref()
    }

    /// False once the owning registry has unregistered this handler.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the registration as gone. Called by registries on removal.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("topics", &self.topics)
            .field("filter", &self.filter)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Builder for [`HandlerRegistration`].
pub struct RegistrationBuilder {
    name: String,
    handler: Arc<dyn EventHandler>,
    owner: Identity,
    topics: Option<Vec<String>>,
    filter: Option<FilterSource>,
}

impl RegistrationBuilder {
    #[must_use]
    pub fn owner(mut self, owner: Identity) -> Self {
        self.owner = owner;
        self
    }

    /// Adds one topic pattern. Calling this at least once makes the topic
    /// set "declared".
    #[must_use]
    pub fn topic(mut self, pattern: impl Into<String>) -> Self {
        self.topics.get_or_insert_with(Vec::new).push(pattern.into());
        self
    }

    #[must_use]
    pub fn topics<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics
            .get_or_insert_with(Vec::new)
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// LDAP-style filter expression, parsed lazily by the resolver.
    #[must_use]
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(FilterSource::Expression(expression.into()));
        self
    }

    #[must_use]
    pub fn custom_filter(mut self, filter: Arc<dyn PropertyFilter>) -> Self {
        self.filter = Some(FilterSource::Custom(filter));
        self
    }

    #[must_use]
    pub fn build(self) -> HandlerRegistration {
        let topics = match self.topics {
            Some(raw) => TopicPatterns::declared(raw),
            None => TopicPatterns::Undeclared,
        };
        HandlerRegistration {
            id: HandlerId::new(),
            name: self.name,
            owner: self.owner,
            topics,
            filter: self.filter,
            handler: self.handler,
            active: AtomicBool::new(true),
        }
    }
}

/// One `(event, registration)` pair awaiting delivery.
#[derive(Clone)]
pub struct HandlerTask {
    event: Arc<Event>,
    registration: Arc<HandlerRegistration>,
}

impl HandlerTask {
    pub fn new(event: Arc<Event>, registration: Arc<HandlerRegistration>) -> Self {
        Self {
            event,
            registration,
        }
    }

    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn registration(&self) -> &HandlerRegistration {
        &self.registration
    }

    #[must_use]
    pub fn shared_registration(&self) -> &Arc<HandlerRegistration> {
        &self.registration
    }

    #[must_use]
    pub fn handler_id(&self) -> HandlerId {
        self.registration.id()
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.registration.name()
    }
}

impl fmt::Debug for HandlerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTask")
            .field("topic", &self.event.topic())
            .field("handler", &self.registration.name())
            .field("handler_id", &self.registration.id())
            .finish()
    }
}
