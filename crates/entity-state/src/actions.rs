//! Typed event constructors bound to one entity type.
//!
//! ```
//! use entity_state::EntityActions;
//! use shared_types::{EntityKey, EventKind};
//!
//! let customers = EntityActions::new("Customer");
//! let load = customers.load(EntityKey::Number(7));
//! assert_eq!(load.kind, EventKind::Load);
//! ```

use crate::domain::EntityMetadata;
use serde_json::Value;
use shared_types::{
    Entity, EntityEvent, EntityKey, EntityTypeId, EventKind, EventPayload, Page, Range,
    TransportError,
};
use std::time::Duration;

/// Event factory for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityActions {
    entity_type: EntityTypeId,
}

impl EntityActions {
    pub fn new(entity_type: impl Into<EntityTypeId>) -> Self {
        Self {
            entity_type: entity_type.into(),
        }
    }

    pub fn for_metadata(metadata: &EntityMetadata) -> Self {
        Self::new(metadata.entity_type().clone())
    }

    #[must_use]
    pub fn entity_type(&self) -> &EntityTypeId {
        &self.entity_type
    }

    fn event(&self, kind: EventKind, payload: EventPayload) -> EntityEvent {
        EntityEvent::new(self.entity_type.clone(), kind, payload)
    }

    // =========================================================================
    // LOADS
    // =========================================================================

    pub fn load(&self, key: EntityKey) -> EntityEvent {
        self.event(EventKind::Load, EventPayload::Key(key))
    }

    pub fn load_all(&self) -> EntityEvent {
        self.event(EventKind::LoadAll, EventPayload::Empty)
    }

    pub fn load_many(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityEvent {
        self.event(EventKind::LoadMany, EventPayload::Keys(keys.into_iter().collect()))
    }

    /// `LoadMany` with no keys; the transport selects by `criteria`.
    pub fn load_many_matching(&self, criteria: Value) -> EntityEvent {
        self.event(EventKind::LoadMany, EventPayload::Empty)
            .with_criteria(criteria)
    }

    pub fn load_page(&self, page: Page) -> EntityEvent {
        self.event(EventKind::LoadPage, EventPayload::Page(page))
    }

    pub fn load_range(&self, range: Range) -> EntityEvent {
        self.event(EventKind::LoadRange, EventPayload::Range(range))
    }

    // =========================================================================
    // CONDITIONAL LOADS
    // =========================================================================

    pub fn load_if_necessary(&self, key: EntityKey, max_age: Option<Duration>) -> EntityEvent {
        conditional(self.event(EventKind::LoadIfNecessary, EventPayload::Key(key)), max_age)
    }

    pub fn load_all_if_necessary(&self, max_age: Option<Duration>) -> EntityEvent {
        conditional(self.event(EventKind::LoadAllIfNecessary, EventPayload::Empty), max_age)
    }

    pub fn load_many_if_necessary(
        &self,
        keys: impl IntoIterator<Item = EntityKey>,
        max_age: Option<Duration>,
    ) -> EntityEvent {
        conditional(
            self.event(
                EventKind::LoadManyIfNecessary,
                EventPayload::Keys(keys.into_iter().collect()),
            ),
            max_age,
        )
    }

    pub fn load_page_if_necessary(&self, page: Page, max_age: Option<Duration>) -> EntityEvent {
        conditional(self.event(EventKind::LoadPageIfNecessary, EventPayload::Page(page)), max_age)
    }

    pub fn load_range_if_necessary(&self, range: Range, max_age: Option<Duration>) -> EntityEvent {
        conditional(
            self.event(EventKind::LoadRangeIfNecessary, EventPayload::Range(range)),
            max_age,
        )
    }

    // =========================================================================
    // SAVES AND DELETES
    // =========================================================================

    pub fn create(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Create, EventPayload::Entity(entity))
    }

    pub fn create_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::CreateMany, EventPayload::Entities(entities))
    }

    pub fn update(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Update, EventPayload::Entity(entity))
    }

    pub fn update_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::UpdateMany, EventPayload::Entities(entities))
    }

    pub fn upsert(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Upsert, EventPayload::Entity(entity))
    }

    pub fn upsert_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::UpsertMany, EventPayload::Entities(entities))
    }

    pub fn replace(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Replace, EventPayload::Entity(entity))
    }

    pub fn replace_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::ReplaceMany, EventPayload::Entities(entities))
    }

    pub fn delete(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Delete, EventPayload::Entity(entity))
    }

    pub fn delete_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::DeleteMany, EventPayload::Entities(entities))
    }

    pub fn delete_by_key(&self, key: EntityKey) -> EntityEvent {
        self.event(EventKind::DeleteByKey, EventPayload::Key(key))
    }

    pub fn delete_many_by_keys(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityEvent {
        self.event(
            EventKind::DeleteManyByKeys,
            EventPayload::Keys(keys.into_iter().collect()),
        )
    }

    // =========================================================================
    // CLEAR, SELECTION, EDIT
    // =========================================================================

    pub fn clear(&self) -> EntityEvent {
        self.event(EventKind::Clear, EventPayload::Empty)
    }

    pub fn select(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Select, EventPayload::Entity(entity))
    }

    pub fn select_by_key(&self, key: EntityKey) -> EntityEvent {
        self.event(EventKind::SelectByKey, EventPayload::Key(key))
    }

    pub fn select_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::SelectMany, EventPayload::Entities(entities))
    }

    pub fn select_many_by_keys(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityEvent {
        self.event(
            EventKind::SelectManyByKeys,
            EventPayload::Keys(keys.into_iter().collect()),
        )
    }

    pub fn select_more(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::SelectMore, EventPayload::Entities(entities))
    }

    pub fn select_more_by_keys(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityEvent {
        self.event(
            EventKind::SelectMoreByKeys,
            EventPayload::Keys(keys.into_iter().collect()),
        )
    }

    pub fn deselect(&self) -> EntityEvent {
        self.event(EventKind::Deselect, EventPayload::Empty)
    }

    pub fn deselect_many(&self, entities: Vec<Entity>) -> EntityEvent {
        self.event(EventKind::DeselectMany, EventPayload::Entities(entities))
    }

    pub fn deselect_many_by_keys(&self, keys: impl IntoIterator<Item = EntityKey>) -> EntityEvent {
        self.event(
            EventKind::DeselectManyByKeys,
            EventPayload::Keys(keys.into_iter().collect()),
        )
    }

    pub fn deselect_all(&self) -> EntityEvent {
        self.event(EventKind::DeselectAll, EventPayload::Empty)
    }

    /// Start editing a new record, optionally seeded with a partial.
    pub fn edit_new(&self, partial: Option<Entity>) -> EntityEvent {
        let payload = partial.map_or(EventPayload::Empty, EventPayload::Entity);
        self.event(EventKind::EditNew, payload)
    }

    pub fn edit(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Edit, EventPayload::Entity(entity))
    }

    pub fn edit_by_key(&self, key: EntityKey) -> EntityEvent {
        self.event(EventKind::EditByKey, EventPayload::Key(key))
    }

    pub fn change(&self, entity: Entity) -> EntityEvent {
        self.event(EventKind::Change, EventPayload::Entity(entity))
    }

    pub fn end_edit(&self) -> EntityEvent {
        self.event(EventKind::EndEdit, EventPayload::Empty)
    }

    // =========================================================================
    // RESULTS
    // =========================================================================

    /// The success event answering `request`, or `None` if the request kind
    /// has no success counterpart.
    pub fn success(request: &EntityEvent, payload: EventPayload) -> Option<EntityEvent> {
        let kind = request.kind.success()?;
        Some(request.follow_up(kind, payload))
    }

    /// The failure event answering `request`.
    pub fn failure(request: &EntityEvent, error: TransportError) -> Option<EntityEvent> {
        let kind = request.kind.failure()?;
        Some(request.follow_up(kind, EventPayload::Error(error)))
    }
}

fn conditional(event: EntityEvent, max_age: Option<Duration>) -> EntityEvent {
    match max_age {
        Some(max_age) => event.with_max_age(max_age),
        None => event,
    }
}
