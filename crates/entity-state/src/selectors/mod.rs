//! # Selectors
//!
//! Read-only projections over one type's slice. Array-valued projections
//! are memoized on slice identity; the rest are cheap field reads.
//!
//! | Selector | Memoized | Output |
//! |----------|----------|--------|
//! | `all` | yes | records in `ids` order, dangling ids skipped |
//! | `sorted` / `sorted_by` | yes | stable sort by the default / a named comparer |
//! | `current_entities` | yes | multi selection resolved to records |
//! | `entities`, `ids` | shared | O(1) clones of the slice's persistent maps |
//! | everything else | no | counts, flags, keys, timestamps, paging |

pub mod memo;

pub use memo::{Memo, MemoMap};

use crate::domain::{
    locate, ConfigurationError, EntityMap, EntityMetadata, EntitySlice, KeyList, RootState,
};
use chrono::{DateTime, TimeZone, Utc};
use shared_types::{Entity, EntityKey, Page, Range, Timestamp};
use std::sync::Arc;

/// Shared, immutable record list.
pub type EntityList = Arc<[Entity]>;

/// Completion timestamps tracked per slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedTime {
    Loaded,
    Saved,
    Created,
    Updated,
    Replaced,
    Deleted,
}

/// Memoized selectors for one entity type.
///
/// Create one per type and keep it; the caches live inside.
#[derive(Debug)]
pub struct EntitySelectors {
    metadata: Arc<EntityMetadata>,
    all: Memo<EntityList>,
    sorted: Memo<EntityList>,
    sorted_by: MemoMap<EntityList>,
    current_entities: Memo<EntityList>,
}

impl EntitySelectors {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self {
            metadata,
            all: Memo::new(),
            sorted: Memo::new(),
            sorted_by: MemoMap::new(),
            current_entities: Memo::new(),
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// The slice these selectors read, as a shared handle.
    pub fn slice(&self, state: &RootState) -> Result<Arc<EntitySlice>, ConfigurationError> {
        locate(state, &self.metadata).cloned()
    }

    // -------------------------------------------------------------------------
    // Collection
    // -------------------------------------------------------------------------

    /// Records in `ids` order.
    pub fn all(&self, slice: &Arc<EntitySlice>) -> EntityList {
        self.all
            .get_or_compute(slice, |slice| slice.collection.iter_ordered().cloned().collect())
    }

    /// Records sorted by the default comparer, or in `ids` order if the type
    /// declares none.
    pub fn sorted(&self, slice: &Arc<EntitySlice>) -> EntityList {
        match self.metadata.default_comparer() {
            Some((_, compare)) => self.sorted.get_or_compute(slice, |slice| {
                let mut records: Vec<Entity> = slice.collection.iter_ordered().cloned().collect();
                records.sort_by(|a, b| compare(a, b));
                records.into()
            }),
            None => self.all(slice),
        }
    }

    /// Records sorted by a named comparer.
    pub fn sorted_by(&self, slice: &Arc<EntitySlice>, name: &str) -> Result<EntityList, ConfigurationError> {
        let compare = self
            .metadata
            .comparer(name)
            .ok_or_else(|| ConfigurationError::UnknownComparer {
                entity_type: self.metadata.entity_type().clone(),
                name: name.to_string(),
            })?;
        Ok(self.sorted_by.cell(name).get_or_compute(slice, |slice| {
            let mut records: Vec<Entity> = slice.collection.iter_ordered().cloned().collect();
            records.sort_by(|a, b| compare(a, b));
            records.into()
        }))
    }

    /// The key to record map, sharing storage with the slice.
    pub fn entities(&self, slice: &EntitySlice) -> EntityMap {
        slice.collection.entities().clone()
    }

    /// Ordered keys, sharing storage with the slice.
    pub fn ids(&self, slice: &EntitySlice) -> KeyList {
        slice.collection.ids().clone()
    }

    pub fn total(&self, slice: &EntitySlice) -> usize {
        slice.collection.len()
    }

    pub fn has_entities(&self, slice: &EntitySlice) -> bool {
        !slice.collection.is_empty()
    }

    pub fn has_no_entities(&self, slice: &EntitySlice) -> bool {
        slice.collection.is_empty()
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn current_entity_key(&self, slice: &EntitySlice) -> Option<EntityKey> {
        slice.selections.current_entity_key.clone()
    }

    /// The selected record, if the key still resolves.
    pub fn current_entity(&self, slice: &EntitySlice) -> Option<Entity> {
        let key = slice.selections.current_entity_key.as_ref()?;
        slice.collection.get(key).cloned()
    }

    pub fn current_entities_keys(&self, slice: &EntitySlice) -> Vec<EntityKey> {
        slice.selections.current_entities_keys.clone()
    }

    /// Selected records in selection order; keys without a record are
    /// skipped.
    pub fn current_entities(&self, slice: &Arc<EntitySlice>) -> EntityList {
        self.current_entities.get_or_compute(slice, |slice| {
            slice
                .selections
                .current_entities_keys
                .iter()
                .filter_map(|key| slice.collection.get(key))
                .cloned()
                .collect()
        })
    }

    // -------------------------------------------------------------------------
    // Edit buffer
    // -------------------------------------------------------------------------

    pub fn edited_entity(&self, slice: &EntitySlice) -> Option<Entity> {
        slice.edit.as_ref().map(|buffer| buffer.edited_entity.clone())
    }

    pub fn is_dirty(&self, slice: &EntitySlice) -> bool {
        slice.edit.as_ref().is_some_and(|buffer| buffer.is_dirty)
    }

    // -------------------------------------------------------------------------
    // Tracking
    // -------------------------------------------------------------------------

    pub fn is_loading(&self, slice: &EntitySlice) -> bool {
        slice.tracking.is_loading
    }

    pub fn is_saving(&self, slice: &EntitySlice) -> bool {
        slice.tracking.is_saving
    }

    pub fn is_deleting(&self, slice: &EntitySlice) -> bool {
        slice.tracking.is_deleting
    }

    /// Raw epoch-millisecond timestamp.
    pub fn timestamp(&self, slice: &EntitySlice, which: TrackedTime) -> Option<Timestamp> {
        let tracking = &slice.tracking;
        match which {
            TrackedTime::Loaded => tracking.loaded_at,
            TrackedTime::Saved => tracking.saved_at,
            TrackedTime::Created => tracking.created_at,
            TrackedTime::Updated => tracking.updated_at,
            TrackedTime::Replaced => tracking.replaced_at,
            TrackedTime::Deleted => tracking.deleted_at,
        }
    }

    /// Timestamp as a UTC date. `None` if unset or out of range.
    pub fn date(&self, slice: &EntitySlice, which: TrackedTime) -> Option<DateTime<Utc>> {
        let millis = i64::try_from(self.timestamp(slice, which)?).ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    // -------------------------------------------------------------------------
    // Paging
    // -------------------------------------------------------------------------

    pub fn current_page(&self, slice: &EntitySlice) -> Option<Page> {
        slice.paging.current_page
    }

    pub fn current_range(&self, slice: &EntitySlice) -> Option<Range> {
        slice.paging.current_range.clone()
    }

    pub fn total_pageable_count(&self, slice: &EntitySlice) -> Option<u64> {
        slice.paging.total_pageable_count
    }
}
