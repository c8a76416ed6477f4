//! # Inbound Port - EntityStateApi
//!
//! Driving port exposing the store to hosts and effects.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `dispatch` | host code, effects loop |
//! | `state` / `slice` | selectors, views |
//! | `registry` | effects, action builders |

use crate::domain::{ConfigurationError, EngineError, EntityRegistry, EntitySlice, RootState};
use crate::reducer::ReduceOutcome;
use shared_types::{EntityEvent, EntityTypeId};
use std::sync::Arc;

/// Primary API of an entity store.
///
/// # Example
///
/// ```rust,ignore
/// use entity_state::ports::EntityStateApi;
///
/// fn refresh(store: &impl EntityStateApi) {
///     let event = EntityEvent::new("Customer", EventKind::LoadAll, EventPayload::Empty);
///     store.dispatch(event)?;
///     let customers = store.slice(&"Customer".into())?;
/// }
/// ```
pub trait EntityStateApi: Send + Sync {
    /// Reduce one event into the held state and announce it to subscribers.
    ///
    /// # Errors
    /// - `PayloadMismatch`: the payload shape does not fit the event kind
    /// - `InvalidKeyValue`: a key field holds a non-scalar value
    ///
    /// Configuration errors are not returned; they surface as
    /// `ReduceOutcome::Skipped`.
    fn dispatch(&self, event: EntityEvent) -> Result<ReduceOutcome, EngineError>;

    /// Snapshot of the current root. Cheap: the tree is shared.
    fn state(&self) -> RootState;

    /// Snapshot of one type's slice.
    fn slice(&self, entity_type: &EntityTypeId) -> Result<Arc<EntitySlice>, ConfigurationError>;

    /// The registry the store was built from.
    fn registry(&self) -> &Arc<EntityRegistry>;
}
