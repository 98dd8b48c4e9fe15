//! Cached property-filter evaluation.
//!
//! Two LRU tables back this:
//!
//! - `parsed`: expression string -> parsed [`LdapFilter`], or `None` when the
//!   expression is malformed
//! - `results`: `(filter key, properties fingerprint)` -> match result
//!
//! A malformed expression is reported once per distinct string, even if its
//! parse entry is later evicted and recomputed.

use super::lru::LruCacheMap;
use crate::domain::{FilterSource, LdapFilter, Properties, PropertyFilter};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::warn;

pub struct CachedFilters {
    parsed: LruCacheMap<String, Option<Arc<LdapFilter>>>,
    results: LruCacheMap<(String, u64), bool>,
    reported: DashSet<String>,
}

impl CachedFilters {
    pub fn new(capacity: usize) -> Self {
        Self {
            parsed: LruCacheMap::new("filter-parse", capacity),
            results: LruCacheMap::new("filter-results", capacity),
            reported: DashSet::new(),
        }
    }

    /// Evaluates `source` against `properties`. `fingerprint` must be
    /// `properties.fingerprint()`; it is passed in so callers hash once per
    /// event rather than once per handler.
    pub fn matches(&self, source: &FilterSource, properties: &Properties, fingerprint: u64) -> bool {
        match source {
            FilterSource::Custom(filter) => self.evaluate(filter.as_ref(), properties, fingerprint),
            FilterSource::Expression(expr) => match self.parse(expr) {
                Some(filter) => self.evaluate(filter.as_ref(), properties, fingerprint),
                None => false,
            },
        }
    }

    /// Parses through the cache; `None` for malformed expressions.
    pub fn parse(&self, expression: &str) -> Option<Arc<LdapFilter>> {
        self.parsed
            .get_or_insert_with(expression.to_string(), || match LdapFilter::parse(expression) {
                Ok(filter) => Some(Arc::new(filter)),
                Err(e) => {
                    if self.reported.insert(expression.to_string()) {
                        warn!(
                            filter = expression,
                            error = %e,
                            "Malformed handler filter; handler will never match"
                        );
                    }
                    None
                }
            })
    }

    fn evaluate(&self, filter: &dyn PropertyFilter, properties: &Properties, fingerprint: u64) -> bool {
        self.results
            .get_or_insert_with((filter.key().to_string(), fingerprint), || {
                filter.matches(properties)
            })
    }

    /// Number of distinct malformed expressions seen so far.
    pub fn malformed_count(&self) -> usize {
        self.reported.len()
    }
}
