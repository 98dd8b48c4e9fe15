//! # Handler Resolver
//!
//! Turns one event plus a registry snapshot into the ordered list of
//! deliveries. Each registration passes through, in order:
//!
//! ```text
//! blacklist -> topic match -> filter -> producer may publish? -> owner may subscribe?
//! ```
//!
//! The publish check depends only on the producer and topic, so it runs at
//! most once per call, and only if some registration got that far.

use super::blacklist::Blacklist;
use crate::cache::{CachedFilters, CachedTopicMatcher, CachedTopicPermissions};
use crate::domain::{DispatchSettings, Event, HandlerRegistration, HandlerTask, Identity};
use crate::ports::{TopicAction, TopicAuthority};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct HandlerResolver {
    blacklist: Arc<Blacklist>,
    topics: CachedTopicMatcher,
    filters: CachedFilters,
    publish: CachedTopicPermissions,
    subscribe: CachedTopicPermissions,
}

impl HandlerResolver {
    pub fn new(
        settings: &DispatchSettings,
        authority: Arc<dyn TopicAuthority>,
        blacklist: Arc<Blacklist>,
    ) -> Self {
        Self {
            blacklist,
            topics: CachedTopicMatcher::new(settings.require_topic, settings.cache_size),
            filters: CachedFilters::new(settings.cache_size),
            publish: CachedTopicPermissions::new(
                Arc::clone(&authority),
                TopicAction::Publish,
                settings.cache_size,
            ),
            subscribe: CachedTopicPermissions::new(
                authority,
                TopicAction::Subscribe,
                settings.cache_size,
            ),
        }
    }

    /// Resolves the handlers that should receive `event` when published by
    /// `producer`. Order follows `registrations`.
    pub fn resolve(
        &self,
        producer: &Identity,
        event: &Arc<Event>,
        registrations: &[Arc<HandlerRegistration>],
    ) -> Vec<HandlerTask> {
        if !self.blacklist.is_empty() {
            self.blacklist.prune_retired();
        }

        let topic = event.topic();
        let mut fingerprint = None;
        let mut may_publish = None;
        let mut tasks = Vec::new();

        for registration in registrations {
            if !registration.is_active() || self.blacklist.is_blacklisted(&registration.id()) {
                continue;
            }
            if !self.topics.matches(registration.topics(), topic) {
                continue;
            }
            if let Some(filter) = registration.filter() {
                let fingerprint = *fingerprint.get_or_insert_with(|| event.properties().fingerprint());
                if !self.filters.matches(filter, event.properties(), fingerprint) {
                    continue;
                }
            }

            let allowed = *may_publish.get_or_insert_with(|| {
                let allowed = self.publish.is_authorized(producer, topic);
                if !allowed {
                    warn!(producer = %producer, topic, "Producer may not publish to topic");
                }
                allowed
            });
            if !allowed {
                return Vec::new();
            }

            if !self.subscribe.is_authorized(registration.owner(), topic) {
                debug!(
                    handler = registration.name(),
                    owner = %registration.owner(),
                    topic,
                    "Handler owner may not subscribe to topic"
                );
                continue;
            }

            tasks.push(HandlerTask::new(Arc::clone(event), Arc::clone(registration)));
        }

        debug!(topic, matched = tasks.len(), "Resolved handlers");
        tasks
    }

    pub fn blacklist(&self) -> &Arc<Blacklist> {
        &self.blacklist
    }
}
