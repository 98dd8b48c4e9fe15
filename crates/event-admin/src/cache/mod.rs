//! # Cache Layer
//!
//! Bounded LRU memoization for the three hot-path questions the resolver
//! asks for every `(registration, event)` pair, plus filter parsing:
//!
//! | Cache | Key | Value |
//! |-------|-----|-------|
//! | `CachedTopicPermissions` (x2) | `(identity, topic)` | authorized? |
//! | `CachedTopicMatcher` | `(pattern set, topic)` | matches? |
//! | `CachedFilters` | `(filter key, properties fingerprint)` | matches? |
//! | `CachedFilters` (parse) | expression | parsed filter or `None` |
//!
//! All tables share the configured capacity (floor 10, default 30).

pub mod filters;
pub mod lru;
pub mod permissions;
pub mod topics;

pub use filters::CachedFilters;
pub use lru::LruCacheMap;
pub use permissions::CachedTopicPermissions;
pub use topics::CachedTopicMatcher;
