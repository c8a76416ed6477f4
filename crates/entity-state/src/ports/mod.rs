//! Ports layer for the entity-state engine.
//!
//! - Inbound (driving) port: the store API hosts dispatch through
//! - Outbound (driven) ports: clock, transport, metrics

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
