//! Edit family: a single edit session per slice.
//!
//! The buffer and its dirty flag live together in `EntitySlice::edit`, so
//! they are either both present or both absent.

use super::{ReduceContext, Reduction};
use crate::domain::{try_resolve_key, EditBuffer, EngineError, EntityMetadata, EntitySlice};
use shared_types::{Entity, EntityKey, EventKind, EventPayload};

pub(super) fn reduce(ctx: &ReduceContext<'_>, slice: &EntitySlice) -> Result<Reduction, EngineError> {
    match (ctx.event.kind, &ctx.event.payload) {
        (EventKind::EditNew, EventPayload::Empty) => Ok(seed(slice, Entity::new())),
        (EventKind::EditNew, EventPayload::Entity(entity)) => Ok(seed(slice, entity.clone())),
        (EventKind::Edit, EventPayload::Entity(entity)) => {
            let key = try_resolve_key(ctx.metadata, entity);
            if key.is_some() && editing_key(ctx.metadata, slice) == key {
                return Ok(Reduction::Unchanged);
            }
            Ok(seed(slice, entity.clone()))
        }
        (EventKind::EditByKey, EventPayload::Key(key)) => {
            if editing_key(ctx.metadata, slice).as_ref() == Some(key) {
                return Ok(Reduction::Unchanged);
            }
            match slice.collection.get(key) {
                Some(entity) => Ok(seed(slice, entity.clone())),
                None => Ok(Reduction::Unchanged),
            }
        }
        (EventKind::Change, EventPayload::Entity(entity)) => {
            let Some(current) = &slice.edit else {
                return Ok(Reduction::Unchanged);
            };
            if current.is_dirty && current.edited_entity == *entity {
                return Ok(Reduction::Unchanged);
            }
            let edited_entity = entity.clone();
            Ok(Reduction::edit(move |slice| {
                slice.edit = Some(EditBuffer {
                    edited_entity,
                    is_dirty: true,
                });
            }))
        }
        (EventKind::EndEdit, EventPayload::Empty) => {
            if slice.edit.is_none() {
                return Ok(Reduction::Unchanged);
            }
            Ok(Reduction::edit(|slice| slice.edit = None))
        }
        _ => Err(ctx.mismatch()),
    }
}

/// Key of the entity currently in the buffer, if it has one.
fn editing_key(metadata: &EntityMetadata, slice: &EntitySlice) -> Option<EntityKey> {
    slice
        .edit
        .as_ref()
        .and_then(|buffer| try_resolve_key(metadata, &buffer.edited_entity))
}

fn seed(slice: &EntitySlice, edited_entity: Entity) -> Reduction {
    let buffer = EditBuffer {
        edited_entity,
        is_dirty: false,
    };
    if slice.edit.as_ref() == Some(&buffer) {
        return Reduction::Unchanged;
    }
    Reduction::edit(move |slice| slice.edit = Some(buffer))
}
