//! # Topic patterns
//!
//! A handler declares the topics it is interested in as a set of patterns:
//!
//! | Pattern  | Matches                                      |
//! |----------|----------------------------------------------|
//! | `*`      | every topic                                  |
//! | `a/b/*`  | `a/b` itself and any topic starting `a/b/`   |
//! | `a/b`    | exactly `a/b`                                |

use super::event::validate_topic;
use tracing::warn;

/// One validated topic pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    /// Universal wildcard `*`.
    Any,
    /// `prefix/*`; stores `prefix`.
    Prefix(String),
    /// A literal topic.
    Exact(String),
}

impl TopicPattern {
    /// Parses a pattern, returning `None` when it is not a valid topic,
    /// `*`, or `topic/*`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "*" {
            return Some(Self::Any);
        }
        if let Some(prefix) = raw.strip_suffix("/*") {
            return validate_topic(prefix)
                .ok()
                .map(|()| Self::Prefix(prefix.to_string()));
        }
        validate_topic(raw)
            .ok()
            .map(|()| Self::Exact(raw.to_string()))
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(literal) => literal == topic,
            Self::Prefix(prefix) => match topic.strip_prefix(prefix.as_str()) {
                Some("") => true,
                Some(rest) => rest.starts_with('/'),
                None => false,
            },
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::Prefix(prefix) => format!("{prefix}/*"),
            Self::Exact(literal) => literal.clone(),
        }
    }
}

/// The topic declaration of a handler registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPatterns {
    /// No `event.topics` declared at all. Whether this matches anything is
    /// decided by the `require_topic` setting.
    Undeclared,
    /// An explicit declaration. Empty when every declared pattern was invalid.
    Declared {
        patterns: Vec<TopicPattern>,
        /// Canonical form used as a cache key.
        key: String,
    },
}

impl TopicPatterns {
    /// Builds a declaration from raw pattern strings, dropping invalid ones
    /// with a warning.
    pub fn declared<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<TopicPattern> = Vec::new();
        for item in raw {
            let item = item.as_ref();
            match TopicPattern::parse(item) {
                Some(pattern) => {
                    if !patterns.contains(&pattern) {
                        patterns.push(pattern);
                    }
                }
                None => warn!(pattern = item, "Ignoring invalid topic pattern"),
            }
        }

        let mut rendered: Vec<String> = patterns.iter().map(TopicPattern::render).collect();
        rendered.sort_unstable();
        Self::Declared {
            patterns,
            key: rendered.join(","),
        }
    }

    /// Cache key for this declaration; `None` for an undeclared set.
    pub fn cache_key(&self) -> Option<&str> {
        match self {
            Self::Undeclared => None,
            Self::Declared { key, .. } => Some(key),
        }
    }

    /// Matches without caching.
    pub fn matches(&self, topic: &str, require_topic: bool) -> bool {
        match self {
            Self::Undeclared => !require_topic,
            Self::Declared { patterns, .. } => patterns.iter().any(|p| p.matches(topic)),
        }
    }
}
