//! Cached topic authorization.
//!
//! One instance per [`TopicAction`]; answers are memoized per
//! `(identity, topic)`.

use super::lru::LruCacheMap;
use crate::domain::Identity;
use crate::ports::{TopicAction, TopicAuthority};
use std::sync::Arc;

pub struct CachedTopicPermissions {
    authority: Arc<dyn TopicAuthority>,
    action: TopicAction,
    cache: LruCacheMap<(Identity, String), bool>,
}

impl CachedTopicPermissions {
    pub fn new(authority: Arc<dyn TopicAuthority>, action: TopicAction, capacity: usize) -> Self {
        let name = match action {
            TopicAction::Publish => "publish-permissions",
            TopicAction::Subscribe => "subscribe-permissions",
        };
        Self {
            authority,
            action,
            cache: LruCacheMap::new(name, capacity),
        }
    }

    pub fn is_authorized(&self, identity: &Identity, topic: &str) -> bool {
        self.cache
            .get_or_insert_with((identity.clone(), topic.to_string()), || {
                self.authority.is_authorized(identity, topic, self.action)
            })
    }

    pub fn action(&self) -> TopicAction {
        self.action
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAuthority {
        calls: AtomicUsize,
    }

    impl TopicAuthority for CountingAuthority {
        fn is_authorized(&self, identity: &Identity, topic: &str, action: TopicAction) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            action == TopicAction::Publish && identity.as_str() == "alice" && topic.starts_with("a/")
        }
    }

    #[test]
    fn test_oracle_consulted_once_per_pair() {
        let authority = Arc::new(CountingAuthority {
            calls: AtomicUsize::new(0),
        });
        let perms = CachedTopicPermissions::new(authority.clone(), TopicAction::Publish, 10);
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");

        for _ in 0..5 {
            assert!(perms.is_authorized(&alice, "a/b"));
            assert!(!perms.is_authorized(&bob, "a/b"));
        }
        assert_eq!(authority.calls.load(Ordering::SeqCst), 2);
        assert_eq!(perms.cached_entries(), 2);
    }

    #[test]
    fn test_action_is_forwarded() {
        let authority = Arc::new(CountingAuthority {
            calls: AtomicUsize::new(0),
        });
        let perms = CachedTopicPermissions::new(authority, TopicAction::Subscribe, 10);
        assert_eq!(perms.action(), TopicAction::Subscribe);
        assert!(!perms.is_authorized(&Identity::new("alice"), "a/b"));
    }
}
