//! # Bounded LRU map
//!
//! Thread-safe memoization table used on the resolve hot path.
//!
//! ## Algorithm
//!
//! - Hit: promote the entry to most-recently-used and return a clone
//! - Miss: compute the value *without* holding the lock, then insert
//! - Full: the least-recently-used entry is evicted by the insert
//!
//! Two threads missing on the same key may both compute it; the later
//! insert wins. Values are cloned out under the lock, so a reader never
//! observes a partially written value.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tracing::warn;

/// Smallest capacity accepted before falling back to the default.
pub const MIN_CAPACITY: usize = 10;
/// Capacity used when the requested one is below [`MIN_CAPACITY`].
pub const DEFAULT_CAPACITY: usize = 30;

/// Bounded least-recently-used cache.
pub struct LruCacheMap<K: Hash + Eq, V: Clone> {
    name: &'static str,
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> LruCacheMap<K, V> {
    /// Create a cache, substituting [`DEFAULT_CAPACITY`] for anything below
    /// [`MIN_CAPACITY`].
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = if capacity < MIN_CAPACITY {
            warn!(
                cache = name,
                requested = capacity,
                fallback = DEFAULT_CAPACITY,
                "Cache capacity below minimum, using default"
            );
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Returns the cached value for `key`, computing and inserting it on a
    /// miss.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.inner.lock().get(&key) {
            return value.clone();
        }
        let value = compute();
        self.inner.lock().put(key, value.clone());
        value
    }

    /// Returns a cached value and promotes it, without computing.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    /// Checks for `key` without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
