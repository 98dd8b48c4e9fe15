//! Error types for the event admin.
//!
//! Only [`EventAdminError::IllegalState`] ever reaches a producer. Handler
//! failures and timeouts are built so they can be logged with a stable label,
//! then swallowed at the delivery boundary.

use crate::domain::HandlerId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the event admin.
#[derive(Debug, Error)]
pub enum EventAdminError {
    /// The bus was stopped; no further events are accepted.
    #[error("event admin is stopped; {operation} rejected")]
    IllegalState { operation: &'static str },

    /// Work was submitted to a thread pool after it was closed.
    #[error("thread pool '{pool}' is closed")]
    PoolClosed { pool: String },

    /// A handler returned an error or panicked.
    #[error("handler '{handler}' ({id}) failed: {reason}")]
    HandlerFailure {
        handler: String,
        id: HandlerId,
        reason: String,
    },

    /// A handler did not return within its deadline and was blacklisted.
    #[error("handler '{handler}' ({id}) exceeded timeout of {timeout:?}")]
    HandlerTimeout {
        handler: String,
        id: HandlerId,
        timeout: Duration,
    },

    /// A configuration value could not be used; the default applies.
    #[error("invalid value {value:?} for '{key}': {reason}")]
    ConfigInvalid {
        key: String,
        value: String,
        reason: String,
    },

    /// The topic does not follow the `token(/token)*` grammar.
    #[error("invalid topic {topic:?}: {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    /// A filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),
}

impl EventAdminError {
    /// Returns a short stable label (snake_case) for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::IllegalState { .. } => "illegal_state",
            Self::PoolClosed { .. } => "pool_closed",
            Self::HandlerFailure { .. } => "handler_failure",
            Self::HandlerTimeout { .. } => "handler_timeout",
            Self::ConfigInvalid { .. } => "config_invalid",
            Self::InvalidTopic { .. } => "invalid_topic",
            Self::InvalidFilter(_) => "invalid_filter",
        }
    }
}

/// Errors from parsing an LDAP-style filter expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("unexpected end of filter {expression:?}")]
    UnexpectedEnd { expression: String },

    #[error("unexpected character {found:?} at offset {offset} in {expression:?}")]
    UnexpectedChar {
        expression: String,
        offset: usize,
        found: char,
    },

    #[error("empty attribute name at offset {offset} in {expression:?}")]
    EmptyAttribute { expression: String, offset: usize },

    #[error("trailing input at offset {offset} in {expression:?}")]
    TrailingInput { expression: String, offset: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EventAdminError>;
