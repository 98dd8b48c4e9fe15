//! # Handler Layer
//!
//! Selection of the handlers an event goes to, and the blacklist of
//! handlers that are no longer eligible.

pub mod blacklist;
pub mod resolver;

pub use blacklist::Blacklist;
pub use resolver::HandlerResolver;
