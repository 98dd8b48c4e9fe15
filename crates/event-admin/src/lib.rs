//! # Event Admin
//!
//! An in-process publish/subscribe event bus. Producers post [`Event`]s on
//! hierarchical topics (`org/example/ITEM_ADDED`); registered handlers
//! receive the events whose topic and properties they match.
//!
//! ## Delivery Modes
//!
//! | Method | Returns | Ordering |
//! |--------|---------|----------|
//! | `send` | after every matched handler completed or timed out | registry order |
//! | `publish` | once the batch is queued | FIFO per producer thread |
//!
//! ## Handler Selection
//!
//! ```text
//! registry snapshot
//!     │
//!     ├─ blacklisted?            ─► skip
//!     ├─ topic pattern match?    (`*`, `a/b/*`, literal)
//!     ├─ property filter match?  (LDAP-style, cached per properties fingerprint)
//!     ├─ producer may publish?   (checked once per event)
//!     └─ owner may subscribe?
//! ```
//!
//! ## Timeouts and Blacklisting
//!
//! With a timeout configured (default 5s), each handler runs on a pool
//! worker under a watchdog. A handler that misses its deadline is abandoned
//! and blacklisted for the lifetime of the bus. Handlers named on the
//! ignore-timeout list run inline without a watchdog.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/   - EventAdmin facade, builder, Producer handles      │
//! │  adapters/  - InMemoryHandlerRegistry, authorities              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - EventAdminApi                              │
//! │  ports/outbound.rs - HandlerRegistry, TopicAuthority            │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  handler/   - HandlerResolver, Blacklist                        │
//! │  dispatch/  - ThreadPool, sync and async delivery               │
//! │  cache/     - LRU caches for topics, filters, permissions       │
//! │  domain/    - Event, TopicPatterns, LdapFilter, config          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use event_admin::{handler_fn, Event, EventAdmin, HandlerRegistration, InMemoryHandlerRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(InMemoryHandlerRegistry::new());
//! registry.register(
//!     HandlerRegistration::builder("org.example.Audit", handler_fn(|event| {
//!         println!("{event}");
//!         Ok(())
//!     }))
//!     .topic("org/example/*")
//!     .filter("(severity>=3)")
//!     .build(),
//! );
//!
//! let admin = EventAdmin::with_defaults(registry);
//! admin.send(Event::with_topic("org/example/ITEM_ADDED")?)?;
//! admin.stop();
//! ```

pub mod adapters;
pub mod cache;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod handler;
pub mod logging;
pub mod ports;
pub mod service;

pub use adapters::{AllowAllAuthority, InMemoryHandlerRegistry, RuleBasedAuthority};
pub use dispatch::DeliveryReport;
pub use domain::*;
pub use error::{EventAdminError, FilterError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use ports::{EventAdminApi, HandlerRegistry, TopicAction, TopicAuthority};
pub use service::{AdminState, EventAdmin, EventAdminBuilder, Producer};
