//! Ports layer for the event admin.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: the API producers call
//! - Outbound (Driven) ports: the registry and authorization oracle the
//!   engine depends on

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
