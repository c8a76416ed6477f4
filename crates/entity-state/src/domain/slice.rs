//! The per-type state slice.
//!
//! The engine owns a fixed set of fields (collection, tracking, selections,
//! edit buffer, paging). Anything the host adds lives in `extra` and is
//! never read or written by a reducer.

use super::collection::EntityCollection;
use serde::Serialize;
use serde_json::{Map, Value};
use shared_types::{Entity, EntityKey, Page, Range, Timestamp};

/// Request flags and completion timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub is_loading: bool,
    pub is_saving: bool,
    pub is_deleting: bool,
    pub loaded_at: Option<Timestamp>,
    pub saved_at: Option<Timestamp>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub replaced_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

/// Current single and multi selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    pub current_entity_key: Option<EntityKey>,
    /// Ordered, no duplicates.
    pub current_entities_keys: Vec<EntityKey>,
}

/// An edit session: the partial snapshot being edited and its dirty flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBuffer {
    pub edited_entity: Entity,
    pub is_dirty: bool,
}

/// Tracked page or range plus the total pageable count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub current_page: Option<Page>,
    pub current_range: Option<Range>,
    pub total_pageable_count: Option<u64>,
}

/// State of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySlice {
    #[serde(flatten)]
    pub collection: EntityCollection,
    #[serde(flatten)]
    pub tracking: Tracking,
    #[serde(flatten)]
    pub selections: Selections,
    pub edit: Option<EditBuffer>,
    #[serde(flatten)]
    pub paging: Paging,
    /// Host-defined fields, preserved by every engine transition.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntitySlice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty slice carrying one host-defined field.
    #[must_use]
    pub fn with_extra(mut self, field: impl Into<String>, value: Value) -> Self {
        self.extra.insert(field.into(), value);
        self
    }

    /// Returns true if every engine-owned field is at its default.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.collection.is_empty()
            && self.tracking == Tracking::default()
            && self.selections == Selections::default()
            && self.edit.is_none()
            && self.paging == Paging::default()
    }

    /// Reset every engine-owned field, keeping `extra`.
    pub fn reset(&mut self) {
        let extra = std::mem::take(&mut self.extra);
        *self = Self {
            extra,
            ..Self::default()
        };
    }
}
