//! Adapters layer for the entity-state engine.
//!
//! Wires the reducer to the shared event bus and to a transport.

pub mod effects;
pub mod store;

pub use effects::EntityEffects;
pub use store::EntityStore;
