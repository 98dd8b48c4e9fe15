//! Event admin configuration.
//!
//! Values are parsed leniently: anything malformed or out of range logs a
//! warning and falls back to the documented default. Configuration is never
//! fatal.

use crate::error::EventAdminError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// Property key for the size of each LRU cache.
pub const PROP_CACHE_SIZE: &str = "org.apache.felix.eventadmin.CacheSize";
/// Property key for the handler-invocation pool size.
pub const PROP_THREAD_POOL_SIZE: &str = "org.apache.felix.eventadmin.ThreadPoolSize";
/// Property key for the per-handler timeout in milliseconds.
pub const PROP_TIMEOUT: &str = "org.apache.felix.eventadmin.Timeout";
/// Property key for the require-topic flag.
pub const PROP_REQUIRE_TOPIC: &str = "org.apache.felix.eventadmin.RequireTopic";
/// Property key for the comma-separated ignore-timeout list.
pub const PROP_IGNORE_TIMEOUT: &str = "org.apache.felix.eventadmin.IgnoreTimeout";

pub const DEFAULT_CACHE_SIZE: i64 = 30;
pub const MIN_CACHE_SIZE: i64 = 10;
pub const DEFAULT_THREAD_POOL_SIZE: i64 = 20;
pub const MIN_THREAD_POOL_SIZE: i64 = 2;
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;
/// Timeouts at or below this value disable the watchdog.
pub const MIN_TIMEOUT_MS: i64 = 100;
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 60_000;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Raw, user-facing configuration.
///
/// Numeric fields are signed so out-of-range input survives deserialization
/// and can be reported by [`EventAdminConfig::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAdminConfig {
    /// Capacity of each LRU cache (>= 10).
    pub cache_size: i64,
    /// Max workers of the handler-invocation pool (>= 2).
    pub thread_pool_size: i64,
    /// Per-handler deadline in milliseconds; below 100 disables timeouts.
    pub timeout_ms: i64,
    /// When false, handlers that declare no topic receive every event.
    pub require_topic: bool,
    /// Handler names exempt from the timeout watchdog.
    pub ignore_timeout: Vec<String>,
    /// How long an idle pool worker lingers before exiting.
    pub keep_alive_ms: u64,
    /// How long `stop` waits for pool workers to finish.
    pub shutdown_grace_ms: u64,
}

impl Default for EventAdminConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            thread_pool_size: DEFAULT_THREAD_POOL_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            require_topic: true,
            ignore_timeout: Vec::new(),
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl EventAdminConfig {
    /// Reads configuration from a string property map using the
    /// `org.apache.felix.eventadmin.*` keys. Missing keys use defaults.
    pub fn from_properties(props: &HashMap<String, String>) -> Self {
        let get = |key: &str| props.get(key).map(String::as_str);
        let defaults = Self::default();
        Self {
            cache_size: parse_int(
                PROP_CACHE_SIZE,
                get(PROP_CACHE_SIZE),
                DEFAULT_CACHE_SIZE,
                MIN_CACHE_SIZE,
            ),
            thread_pool_size: parse_int(
                PROP_THREAD_POOL_SIZE,
                get(PROP_THREAD_POOL_SIZE),
                DEFAULT_THREAD_POOL_SIZE,
                MIN_THREAD_POOL_SIZE,
            ),
            timeout_ms: parse_int(PROP_TIMEOUT, get(PROP_TIMEOUT), DEFAULT_TIMEOUT_MS, i64::MIN),
            require_topic: parse_bool(PROP_REQUIRE_TOPIC, get(PROP_REQUIRE_TOPIC), true),
            ignore_timeout: get(PROP_IGNORE_TIMEOUT)
                .map(parse_list)
                .unwrap_or_default(),
            ..defaults
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EVENTADMIN_CACHE_SIZE`: LRU cache capacity (default: 30)
    /// - `EVENTADMIN_THREAD_POOL_SIZE`: handler pool size (default: 20)
    /// - `EVENTADMIN_TIMEOUT`: handler timeout in ms (default: 5000)
    /// - `EVENTADMIN_REQUIRE_TOPIC`: require topic declarations (default: true)
    /// - `EVENTADMIN_IGNORE_TIMEOUT`: comma-separated handler names
    pub fn from_env() -> Self {
        let mut props = HashMap::new();
        for (var, key) in [
            ("EVENTADMIN_CACHE_SIZE", PROP_CACHE_SIZE),
            ("EVENTADMIN_THREAD_POOL_SIZE", PROP_THREAD_POOL_SIZE),
            ("EVENTADMIN_TIMEOUT", PROP_TIMEOUT),
            ("EVENTADMIN_REQUIRE_TOPIC", PROP_REQUIRE_TOPIC),
            ("EVENTADMIN_IGNORE_TIMEOUT", PROP_IGNORE_TIMEOUT),
        ] {
            if let Ok(value) = env::var(var) {
                props.insert(key.to_string(), value);
            }
        }
        Self::from_properties(&props)
    }

    /// Applies floors and derives the effective dispatch settings.
    pub fn normalized(&self) -> DispatchSettings {
        let cache_size = floor_or_default(
            PROP_CACHE_SIZE,
            self.cache_size,
            MIN_CACHE_SIZE,
            DEFAULT_CACHE_SIZE,
        );
        let sync_pool_size = floor_or_default(
            PROP_THREAD_POOL_SIZE,
            self.thread_pool_size,
            MIN_THREAD_POOL_SIZE,
            DEFAULT_THREAD_POOL_SIZE,
        );
        let timeout = (self.timeout_ms > MIN_TIMEOUT_MS)
            .then(|| Duration::from_millis(self.timeout_ms.unsigned_abs()));

        let settings = DispatchSettings {
            cache_size,
            sync_pool_size,
            async_pool_size: (sync_pool_size / 2).max(2),
            timeout,
            require_topic: self.require_topic,
            ignore_timeout: self
                .ignore_timeout
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            keep_alive: Duration::from_millis(self.keep_alive_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        };
        debug!(
            cache_size = settings.cache_size,
            sync_pool_size = settings.sync_pool_size,
            async_pool_size = settings.async_pool_size,
            timeout = ?settings.timeout,
            require_topic = settings.require_topic,
            "Event admin settings resolved"
        );
        settings
    }
}

/// Effective settings consumed by the dispatch machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub cache_size: usize,
    pub sync_pool_size: usize,
    pub async_pool_size: usize,
    /// `None` disables the watchdog.
    pub timeout: Option<Duration>,
    pub require_topic: bool,
    pub ignore_timeout: Vec<String>,
    pub keep_alive: Duration,
    pub shutdown_grace: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        EventAdminConfig::default().normalized()
    }
}

fn report(key: &str, value: &str, reason: &str) {
    let err = EventAdminError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    warn!(label = err.as_label(), error = %err, "Using default");
}

fn parse_int(key: &str, raw: Option<&str>, default: i64, min: i64) -> i64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= min => value,
        Ok(_) => {
            report(key, raw, "value is too low");
            default
        }
        Err(e) => {
            report(key, raw, &e.to_string());
            default
        }
    }
}

fn parse_bool(key: &str, raw: Option<&str>, default: bool) -> bool {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => {
            report(key, raw, "expected one of 1/true/yes or 0/false/no");
            default
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn floor_or_default(key: &str, value: i64, min: i64, default: i64) -> usize {
    let effective = if value < min {
        report(key, &value.to_string(), "below minimum");
        default
    } else {
        value
    };
    usize::try_from(effective).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = EventAdminConfig::default().normalized();
        assert_eq!(settings.cache_size, 30);
        assert_eq!(settings.sync_pool_size, 20);
        assert_eq!(settings.async_pool_size, 10);
        assert_eq!(settings.timeout, Some(Duration::from_millis(5000)));
        assert!(settings.require_topic);
        assert!(settings.ignore_timeout.is_empty());
    }

    #[test]
    fn test_from_properties() {
        let config = EventAdminConfig::from_properties(&props(&[
            (PROP_CACHE_SIZE, "50"),
            (PROP_THREAD_POOL_SIZE, "4"),
            (PROP_TIMEOUT, "250"),
            (PROP_REQUIRE_TOPIC, "no"),
            (PROP_IGNORE_TIMEOUT, "org.a.Slow, org.b., org.c.*"),
        ]));
        assert_eq!(config.cache_size, 50);
        assert_eq!(config.thread_pool_size, 4);
        assert_eq!(config.timeout_ms, 250);
        assert!(!config.require_topic);
        assert_eq!(config.ignore_timeout, vec!["org.a.Slow", "org.b.", "org.c.*"]);

        let settings = config.normalized();
        assert_eq!(settings.async_pool_size, 2);
        assert_eq!(settings.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EventAdminConfig::from_properties(&props(&[
            (PROP_CACHE_SIZE, "5"),
            (PROP_THREAD_POOL_SIZE, "many"),
            (PROP_TIMEOUT, "soon"),
            (PROP_REQUIRE_TOPIC, "maybe"),
        ]));
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(config.thread_pool_size, DEFAULT_THREAD_POOL_SIZE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.require_topic);
    }

    #[test]
    fn test_small_timeout_disables_watchdog() {
        let config = EventAdminConfig {
            timeout_ms: 99,
            ..Default::default()
        };
        assert_eq!(config.normalized().timeout, None);

        let negative = EventAdminConfig {
            timeout_ms: -1,
            ..Default::default()
        };
        assert_eq!(negative.normalized().timeout, None);
    }

    #[test]
    fn test_watchdog_floor_is_exclusive() {
        let at_floor = EventAdminConfig {
            timeout_ms: MIN_TIMEOUT_MS,
            ..Default::default()
        };
        assert_eq!(at_floor.normalized().timeout, None);

        let above = EventAdminConfig {
            timeout_ms: MIN_TIMEOUT_MS + 1,
            ..Default::default()
        };
        assert_eq!(above.normalized().timeout, Some(Duration::from_millis(101)));
    }

    #[test]
    fn test_normalized_applies_floors() {
        let config = EventAdminConfig {
            cache_size: 0,
            thread_pool_size: -3,
            ..Default::default()
        };
        let settings = config.normalized();
        assert_eq!(settings.cache_size, 30);
        assert_eq!(settings.sync_pool_size, 20);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EventAdminConfig =
            serde_json::from_str(r#"{"cache_size": 12, "ignore_timeout": ["a.B"]}"#).unwrap();
        assert_eq!(config.cache_size, 12);
        assert_eq!(config.thread_pool_size, DEFAULT_THREAD_POOL_SIZE);
        assert_eq!(config.ignore_timeout, vec!["a.B"]);
    }
}
