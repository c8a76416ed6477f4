//! # Entity State
//!
//! **Crate:** `entity-state`
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Keeps normalized, keyed collections of records for any number of
//! registered entity types, and changes them only through a uniform event
//! vocabulary: load, save, delete, clear, selection and edit events, each
//! with begin/success/failure (and, for loads, conditional) variants.
//!
//! ## Collection Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | `ids` holds no duplicates | `domain/collection.rs` - `merge_append()` / `remove_keys()` |
//! | `entities` key set equals `ids` value set | `domain/collection.rs` - every mutation touches both |
//! | Untouched slices keep their identity | `domain/locator.rs` - `write()` clones only along the path |
//! | Configuration problems never abort a dispatch | `reducer/mod.rs` - `apply()` |
//!
//! ## Event Lifecycle
//!
//! ```text
//! LoadAllIfNecessary ──fresh──→ (nothing)
//!        │
//!        └── stale/absent ──→ LoadAll ──transport──→ LoadAllSuccess
//!                                              └───→ LoadAllFailure
//! ```
//!
//! | Phase | Produced by | Reduced as |
//! |-------|-------------|------------|
//! | Begin | `EntityActions` | set `isLoading`/`isSaving`/`isDeleting` |
//! | IfNecessary | `EntityActions` | passed through; `ReloadDecider` escalates |
//! | Success | `EntityEffects` | merge/remove records, stamp times, clear flag |
//! | Failure | `EntityEffects` | clear flag |
//! | Immediate | `EntityActions` | clear, selection, edit |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/store.rs   - EntityStore (state + bus)                │
//! │  adapters/effects.rs - EntityEffects (transport round trips)    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - EntityStateApi trait                       │
//! │  ports/outbound.rs - TimeSource, EntityTransport, MetricsRecorder│
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/metadata.rs  - EntityMetadata, EntityRegistry           │
//! │  domain/key.rs       - key resolution                           │
//! │  domain/tree.rs      - RootState, StateNode                     │
//! │  domain/locator.rs   - StateAddress, locate/write               │
//! │  domain/slice.rs     - EntitySlice and its tracking fields      │
//! │  reducer/            - EntityReducer and its families           │
//! │  reload.rs           - ReloadDecider                            │
//! │  selectors/          - EntitySelectors, Memo                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use entity_state::{EntityActions, EntityMetadata, EntityReducer, EntityRegistry};
//! use shared_types::{Entity, EventPayload};
//! use std::sync::Arc;
//!
//! let registry = EntityRegistry::new()
//!     .with(EntityMetadata::builder("Customer").model_name("Customer").key_field("id").build()?)?;
//! let reducer = EntityReducer::new(Arc::new(registry));
//! let customers = EntityActions::new("Customer");
//!
//! let request = customers.load_all();
//! let mut state = reducer.registry().initial_state();
//! state = reducer.reduce(state, &request)?;
//!
//! let records = vec![Entity::from_fields([("id", serde_json::json!(1))])];
//! let success = EntityActions::success(&request, EventPayload::Entities(records)).unwrap();
//! state = reducer.reduce(state, &success)?;
//! # Ok::<(), entity_state::EngineError>(())
//! ```

pub mod actions;
pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod reducer;
pub mod reload;
pub mod selectors;

pub use actions::EntityActions;
pub use adapters::{EntityEffects, EntityStore};
pub use config::EngineConfig;
pub use domain::*;
pub use metrics::{EngineMetrics, EngineMetricsSnapshot, NoOpMetrics};
pub use ports::*;
pub use reducer::{EntityReducer, ReduceOutcome};
pub use reload::{ReloadDecider, ReloadDecision, ReloadRequest, SuppressReason};
pub use selectors::{EntityList, EntitySelectors, Memo, MemoMap, TrackedTime};
