//! # Service Layer
//!
//! The bus facade wiring the registry, resolver, caches and delivery
//! strategies together.
//!
//! ```text
//! publish(event) ─┐                                   ┌─► AsyncDeliverTasks ─► async pool ─┐
//!                 ├─► registry snapshot ─► resolver ──┤                                     ├─► SyncDeliverTasks
//! send(event) ────┘                                   └─────────────────────────────────────┘
//! ```

pub mod admin;

pub use admin::{AdminState, EventAdmin, EventAdminBuilder, Producer};
