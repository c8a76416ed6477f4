//! Selection family: single and multi selection bookkeeping.
//!
//! | Kind | Effect |
//! |------|--------|
//! | `Select`, `SelectByKey` | set the single key; empty value is a no-op |
//! | `SelectMany`, `SelectManyByKeys` | replace the list (empty selects none) |
//! | `SelectMore`, `SelectMoreByKeys` | union, first-seen order |
//! | `Deselect` | clear the single key |
//! | `DeselectMany`, `DeselectManyByKeys` | set difference |
//! | `DeselectAll` | clear the list |
//!
//! Selected keys are not checked against the collection; selectors skip
//! keys that resolve to nothing.

use super::{dedupe, ReduceContext, Reduction};
use crate::domain::{resolve_key, resolve_keys, EngineError, EntitySlice};
use shared_types::{EntityKey, EventKind, EventPayload};
use std::collections::HashSet;

pub(super) fn reduce(ctx: &ReduceContext<'_>, slice: &EntitySlice) -> Result<Reduction, EngineError> {
    let current = &slice.selections;

    match (ctx.event.kind, &ctx.event.payload) {
        (EventKind::Select, EventPayload::Entity(entity)) => {
            if entity.is_empty() {
                return Ok(Reduction::Unchanged);
            }
            let key = resolve_key(ctx.metadata, entity)?;
            Ok(select_one(slice, key))
        }
        (EventKind::SelectByKey, EventPayload::Key(key)) => {
            if key.is_empty() {
                return Ok(Reduction::Unchanged);
            }
            Ok(select_one(slice, key.clone()))
        }
        (EventKind::SelectMany, EventPayload::Entities(entities)) => {
            Ok(select_many(slice, dedupe(resolve_keys(ctx.metadata, entities)?)))
        }
        (EventKind::SelectManyByKeys, EventPayload::Keys(keys)) => {
            Ok(select_many(slice, dedupe(keys.iter().cloned())))
        }
        (EventKind::SelectMore, EventPayload::Entities(entities)) => {
            let added = resolve_keys(ctx.metadata, entities)?;
            Ok(select_many(
                slice,
                dedupe(current.current_entities_keys.iter().cloned().chain(added)),
            ))
        }
        (EventKind::SelectMoreByKeys, EventPayload::Keys(keys)) => Ok(select_many(
            slice,
            dedupe(current.current_entities_keys.iter().chain(keys).cloned()),
        )),
        (EventKind::Deselect, EventPayload::Empty) => {
            if current.current_entity_key.is_none() {
                return Ok(Reduction::Unchanged);
            }
            Ok(Reduction::edit(|slice| slice.selections.current_entity_key = None))
        }
        (EventKind::DeselectMany, EventPayload::Entities(entities)) => {
            let removed = resolve_keys(ctx.metadata, entities)?;
            Ok(deselect(slice, removed.iter().collect()))
        }
        (EventKind::DeselectManyByKeys, EventPayload::Keys(keys)) => {
            Ok(deselect(slice, keys.iter().collect()))
        }
        (EventKind::DeselectAll, EventPayload::Empty) => {
            if current.current_entities_keys.is_empty() {
                return Ok(Reduction::Unchanged);
            }
            Ok(Reduction::edit(|slice| slice.selections.current_entities_keys.clear()))
        }
        _ => Err(ctx.mismatch()),
    }
}

fn select_one(slice: &EntitySlice, key: EntityKey) -> Reduction {
    if slice.selections.current_entity_key.as_ref() == Some(&key) {
        return Reduction::Unchanged;
    }
    Reduction::edit(move |slice| slice.selections.current_entity_key = Some(key))
}

fn select_many(slice: &EntitySlice, keys: Vec<EntityKey>) -> Reduction {
    if slice.selections.current_entities_keys == keys {
        return Reduction::Unchanged;
    }
    Reduction::edit(move |slice| slice.selections.current_entities_keys = keys)
}

fn deselect(slice: &EntitySlice, removed: HashSet<&EntityKey>) -> Reduction {
    let remaining: Vec<EntityKey> = slice
        .selections
        .current_entities_keys
        .iter()
        .filter(|key| !removed.contains(key))
        .cloned()
        .collect();
    select_many(slice, remaining)
}
