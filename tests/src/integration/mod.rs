//! # Integration Flows
//!
//! Cross-crate checks: requests go through the store onto the bus, the
//! effects loop answers them through a transport, and the answers are
//! reduced back into the store.

pub mod harness;

mod flows;
mod telemetry;
