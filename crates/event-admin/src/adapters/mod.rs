//! Adapters layer for the event admin.
//!
//! Ready-made implementations of the outbound ports:
//! - `InMemoryHandlerRegistry`: a `HandlerRegistry` backed by a vector
//! - `AllowAllAuthority`, `RuleBasedAuthority`: `TopicAuthority` oracles

pub mod authority;
pub mod registry;

pub use authority::{AllowAllAuthority, RuleBasedAuthority};
pub use registry::InMemoryHandlerRegistry;
