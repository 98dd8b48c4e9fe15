//! Outbound (Driven) ports for the event admin.
//!
//! These traits define the collaborators the engine needs but does not own:
//! where handler registrations come from, and who may publish or subscribe
//! to which topic.

use crate::domain::{HandlerRegistration, Identity};
use std::fmt;
use std::sync::Arc;

/// Source of the currently registered handlers.
///
/// Implementations return a snapshot; the engine never mutates it. A
/// registration removed after the snapshot was taken must be deactivated
/// (see [`HandlerRegistration::deactivate`]) so delivery can skip it.
pub trait HandlerRegistry: Send + Sync {
    fn lookup_handlers(&self) -> Vec<Arc<HandlerRegistration>>;
}

/// What an identity wants to do with a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicAction {
    Publish,
    Subscribe,
}

impl fmt::Display for TopicAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Subscribe => f.write_str("subscribe"),
        }
    }
}

/// Yes/no authorization oracle. Results are cached per `(identity, topic)`,
/// so answers must be stable for the lifetime of the bus.
pub trait TopicAuthority: Send + Sync {
    fn is_authorized(&self, identity: &Identity, topic: &str, action: TopicAction) -> bool;
}

impl<T: HandlerRegistry + ?Sized> HandlerRegistry for Arc<T> {
    fn lookup_handlers(&self) -> Vec<Arc<HandlerRegistration>> {
        (**self).lookup_handlers()
    }
}

impl<T: TopicAuthority + ?Sized> TopicAuthority for Arc<T> {
    fn is_authorized(&self, identity: &Identity, topic: &str, action: TopicAction) -> bool {
        (**self).is_authorized(identity, topic, action)
    }
}
