//! Load families: `Load`, `LoadMany`, `LoadAll`, `LoadPage`, `LoadRange`.
//!
//! | Success | Collection | Paging |
//! |---------|------------|--------|
//! | `LoadSuccess`, `LoadManySuccess` | merge-append | untouched |
//! | `LoadAllSuccess` | replace | untouched |
//! | `LoadPageSuccess` | replace | page + total |
//! | `LoadRangeSuccess` | merge-append | range + total (the tracked range is replaced, not unioned) |

use super::{toggle, Flag, ReduceContext, Reduction};
use crate::domain::{resolve_key, resolve_keyed, EngineError, EntitySlice};
use shared_types::{Entity, EventKind, EventPayload, EventPhase, PageInfo, RangeInfo};
use tracing::warn;

pub(super) fn reduce(ctx: &ReduceContext<'_>, slice: &EntitySlice) -> Result<Reduction, EngineError> {
    match ctx.event.kind.phase() {
        phase @ (EventPhase::Begin | EventPhase::Failure) => Ok(toggle(phase, Flag::Loading, slice)),
        EventPhase::Success => success(ctx),
        EventPhase::IfNecessary | EventPhase::Immediate => Ok(Reduction::Unchanged),
    }
}

fn success(ctx: &ReduceContext<'_>) -> Result<Reduction, EngineError> {
    let now = ctx.now;
    let event = ctx.event;

    match (event.kind, &event.payload) {
        (EventKind::LoadSuccess, EventPayload::Entity(entity)) => {
            let keyed = vec![(resolve_key(ctx.metadata, entity)?, entity.clone())];
            Ok(Reduction::edit(move |slice| {
                slice.collection.merge_append(keyed);
                loaded(slice, now);
            }))
        }
        (EventKind::LoadManySuccess, EventPayload::Entities(entities)) => {
            let keyed = resolve_keyed(ctx.metadata, entities)?;
            Ok(Reduction::edit(move |slice| {
                slice.collection.merge_append(keyed);
                loaded(slice, now);
            }))
        }
        (EventKind::LoadAllSuccess, EventPayload::Entities(entities)) => {
            let keyed = resolve_keyed(ctx.metadata, entities)?;
            Ok(Reduction::edit(move |slice| {
                slice.collection.replace_all(keyed);
                loaded(slice, now);
            }))
        }
        (EventKind::LoadPageSuccess, payload) => {
            let (entities, page_info) = paged(ctx, payload)?;
            let keyed = resolve_keyed(ctx.metadata, entities)?;
            if page_info.is_none() {
                missing_info(ctx, "page");
            }
            Ok(Reduction::edit(move |slice| {
                slice.collection.replace_all(keyed);
                slice.paging.current_page = page_info.map(|info| info.page);
                slice.paging.total_pageable_count = page_info.map(|info| info.total_count);
                loaded(slice, now);
            }))
        }
        (EventKind::LoadRangeSuccess, payload) => {
            let (entities, range_info) = ranged(ctx, payload)?;
            let keyed = resolve_keyed(ctx.metadata, entities)?;
            if range_info.is_none() {
                missing_info(ctx, "range");
            }
            Ok(Reduction::edit(move |slice| {
                slice.collection.merge_append(keyed);
                match range_info {
                    Some(info) => {
                        slice.paging.current_range = Some(info.range);
                        slice.paging.total_pageable_count = Some(info.total_count);
                    }
                    None => {
                        slice.paging.current_range = None;
                        slice.paging.total_pageable_count = None;
                    }
                }
                loaded(slice, now);
            }))
        }
        _ => Err(ctx.mismatch()),
    }
}

fn loaded(slice: &mut EntitySlice, now: u64) {
    slice.tracking.is_loading = false;
    slice.tracking.loaded_at = Some(now);
}

fn paged<'p>(
    ctx: &ReduceContext<'_>,
    payload: &'p EventPayload,
) -> Result<(&'p [Entity], Option<PageInfo>), EngineError> {
    match payload {
        EventPayload::PagedEntities {
            entities,
            page_info,
        } => Ok((entities.as_slice(), *page_info)),
        EventPayload::Entities(entities) => Ok((entities.as_slice(), None)),
        _ => Err(ctx.mismatch()),
    }
}

fn ranged<'p>(
    ctx: &ReduceContext<'_>,
    payload: &'p EventPayload,
) -> Result<(&'p [Entity], Option<RangeInfo>), EngineError> {
    match payload {
        EventPayload::RangedEntities {
            entities,
            range_info,
        } => Ok((entities.as_slice(), range_info.clone())),
        EventPayload::Entities(entities) => Ok((entities.as_slice(), None)),
        _ => Err(ctx.mismatch()),
    }
}

fn missing_info(ctx: &ReduceContext<'_>, what: &'static str) {
    if ctx.config.warn_on_missing_paging {
        warn!(
            entity_type = %ctx.event.entity_type,
            event_kind = %ctx.event.kind,
            correlation_id = %ctx.event.correlation_id,
            missing = what,
            "Success event carries no {what} info, tracking reset to defaults"
        );
    }
    ctx.metrics
        .record_data_warning(&ctx.event.entity_type, ctx.event.kind);
}
