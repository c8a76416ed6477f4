//! Delete families: by entity, by entities, by key, by keys.
//!
//! `ids` is recomputed as its intersection with the remaining keys, so
//! overlapping or repeated deletes can never leave a dangling id.

use super::{toggle, Flag, ReduceContext, Reduction};
use crate::domain::{resolve_key, resolve_keys, EngineError, EntitySlice};
use shared_types::{EventPayload, EventPhase};

pub(super) fn reduce(ctx: &ReduceContext<'_>, slice: &EntitySlice) -> Result<Reduction, EngineError> {
    match ctx.event.kind.phase() {
        phase @ (EventPhase::Begin | EventPhase::Failure) => Ok(toggle(phase, Flag::Deleting, slice)),
        EventPhase::Success => success(ctx),
        EventPhase::IfNecessary | EventPhase::Immediate => Ok(Reduction::Unchanged),
    }
}

fn success(ctx: &ReduceContext<'_>) -> Result<Reduction, EngineError> {
    let keys = match &ctx.event.payload {
        EventPayload::Entity(entity) => vec![resolve_key(ctx.metadata, entity)?],
        EventPayload::Entities(entities) => resolve_keys(ctx.metadata, entities)?,
        EventPayload::Key(key) => vec![key.clone()],
        EventPayload::Keys(keys) => keys.clone(),
        _ => return Err(ctx.mismatch()),
    };

    let now = ctx.now;
    Ok(Reduction::edit(move |slice| {
        slice.collection.remove_keys(&keys);
        slice.tracking.is_deleting = false;
        slice.tracking.deleted_at = Some(now);
    }))
}
