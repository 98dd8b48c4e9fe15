//! # Domain Layer
//!
//! Pure value types: events, topic patterns, property filters, handler
//! registrations and configuration. Nothing here spawns threads or holds
//! shared mutable state apart from a registration's `active` flag.
//!
//! ## Components
//!
//! - `event`: Event, Properties, PropertyValue, topic validation
//! - `topic`: TopicPattern, TopicPatterns (`*`, `a/b/*`, literal)
//! - `filter`: PropertyFilter trait, LdapFilter parser, PredicateFilter
//! - `handler`: HandlerRegistration, HandlerTask, HandlerId, Identity
//! - `config`: EventAdminConfig, DispatchSettings

pub mod config;
pub mod event;
pub mod filter;
pub mod handler;
pub mod topic;

pub use config::*;
pub use event::*;
pub use filter::*;
pub use handler::*;
pub use topic::*;
