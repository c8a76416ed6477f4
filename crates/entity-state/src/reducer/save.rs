//! Save families: create, update, upsert, replace (single and batch).
//!
//! Create and upsert merge-append. Update and replace only overwrite keys
//! already in the collection; an unknown key is skipped (and logged) so
//! `entities` never gains a record without a matching id.

use super::{toggle, Flag, ReduceContext, Reduction};
use crate::domain::{resolve_key, resolve_keyed, EngineError, EntityCollection, EntitySlice, Tracking};
use shared_types::{Entity, EntityKey, EventFamily, EventPayload, EventPhase, Timestamp};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Write {
    MergeAppend,
    OverwriteExisting,
}

/// Timestamp a successful save sets.
#[derive(Debug, Clone, Copy)]
enum Stamp {
    Created,
    Saved,
    Updated,
    Replaced,
}

impl Stamp {
    fn apply(self, tracking: &mut Tracking, now: Timestamp) {
        let slot = match self {
            Self::Created => &mut tracking.created_at,
            Self::Saved => &mut tracking.saved_at,
            Self::Updated => &mut tracking.updated_at,
            Self::Replaced => &mut tracking.replaced_at,
        };
        *slot = Some(now);
    }
}

pub(super) fn reduce(ctx: &ReduceContext<'_>, slice: &EntitySlice) -> Result<Reduction, EngineError> {
    match ctx.event.kind.phase() {
        phase @ (EventPhase::Begin | EventPhase::Failure) => Ok(toggle(phase, Flag::Saving, slice)),
        EventPhase::Success => success(ctx),
        EventPhase::IfNecessary | EventPhase::Immediate => Ok(Reduction::Unchanged),
    }
}

fn success(ctx: &ReduceContext<'_>) -> Result<Reduction, EngineError> {
    let keyed = match &ctx.event.payload {
        EventPayload::Entity(entity) => vec![(resolve_key(ctx.metadata, entity)?, entity.clone())],
        EventPayload::Entities(entities) => resolve_keyed(ctx.metadata, entities)?,
        _ => return Err(ctx.mismatch()),
    };

    let (write, stamp) = match ctx.event.kind.family() {
        EventFamily::Create | EventFamily::CreateMany => (Write::MergeAppend, Stamp::Created),
        EventFamily::Upsert | EventFamily::UpsertMany => (Write::MergeAppend, Stamp::Saved),
        EventFamily::Update | EventFamily::UpdateMany => (Write::OverwriteExisting, Stamp::Updated),
        EventFamily::Replace | EventFamily::ReplaceMany => {
            (Write::OverwriteExisting, Stamp::Replaced)
        }
        _ => return Err(ctx.mismatch()),
    };

    let now = ctx.now;
    let entity_type = ctx.event.entity_type.clone();
    let kind = ctx.event.kind;

    Ok(Reduction::edit(move |slice| {
        match write {
            Write::MergeAppend => slice.collection.merge_append(keyed),
            Write::OverwriteExisting => {
                let unknown = unknown_keys(&keyed, &slice.collection);
                slice.collection.overwrite_existing(keyed);
                if !unknown.is_empty() {
                    debug!(
                        entity_type = %entity_type,
                        event_kind = %kind,
                        skipped = ?unknown,
                        "Skipped records with keys not in the collection"
                    );
                }
            }
        }
        slice.tracking.is_saving = false;
        stamp.apply(&mut slice.tracking, now);
    }))
}

fn unknown_keys(keyed: &[(EntityKey, Entity)], collection: &EntityCollection) -> Vec<EntityKey> {
    keyed
        .iter()
        .filter(|(key, _)| !collection.contains(key))
        .map(|(key, _)| key.clone())
        .collect()
}
