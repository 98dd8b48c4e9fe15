//! Cached topic matching.
//!
//! Memoizes `(pattern set, topic) -> bool`. Undeclared pattern sets are
//! answered from the `require_topic` flag directly and never cached.

use super::lru::LruCacheMap;
use crate::domain::TopicPatterns;

pub struct CachedTopicMatcher {
    require_topic: bool,
    cache: LruCacheMap<(String, String), bool>,
}

impl CachedTopicMatcher {
    pub fn new(require_topic: bool, capacity: usize) -> Self {
        Self {
            require_topic,
            cache: LruCacheMap::new("topic-matches", capacity),
        }
    }

    pub fn matches(&self, patterns: &TopicPatterns, topic: &str) -> bool {
        match patterns.cache_key() {
            None => patterns.matches(topic, self.require_topic),
            Some(key) => self
                .cache
                .get_or_insert_with((key.to_string(), topic.to_string()), || {
                    patterns.matches(topic, self.require_topic)
                }),
        }
    }

    pub fn require_topic(&self) -> bool {
        self.require_topic
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
