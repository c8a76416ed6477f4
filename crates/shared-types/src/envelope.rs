//! # `EntityEvent` Envelope
//!
//! The universal wrapper for every state-transition event.
//!
//! ## Wire Contract
//!
//! `{ entityType, eventKind, payload, correlationId }` plus the optional
//! `criteria` (opaque, handed to transports) and `maxAge` (seconds, only
//! meaningful on `*IfNecessary` kinds).
//!
//! - **Correlation**: a request event and its eventual success/failure
//!   share one `correlation_id`. A missing id deserializes to a fresh one.
//! - **Closed taxonomy**: `EventKind` enumerates all 72 canonical kinds;
//!   `EventKind::family` and `EventKind::phase` are exhaustive matches, so
//!   adding a kind without deciding how it reduces does not compile.

use crate::entities::{Entity, EntityKey, EntityTypeId};
use crate::errors::TransportError;
use crate::paging::{Page, PageInfo, Range, RangeInfo};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// EVENT KIND
// =============================================================================

/// All canonical event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    // =========================================================================
    // LOAD FAMILIES
    // =========================================================================
    Load,
    LoadIfNecessary,
    LoadSuccess,
    LoadFailure,

    LoadAll,
    LoadAllIfNecessary,
    LoadAllSuccess,
    LoadAllFailure,

    LoadMany,
    LoadManyIfNecessary,
    LoadManySuccess,
    LoadManyFailure,

    LoadPage,
    LoadPageIfNecessary,
    LoadPageSuccess,
    LoadPageFailure,

    LoadRange,
    LoadRangeIfNecessary,
    LoadRangeSuccess,
    LoadRangeFailure,

    // =========================================================================
    // SAVE FAMILIES
    // =========================================================================
    Create,
    CreateSuccess,
    CreateFailure,
    CreateMany,
    CreateManySuccess,
    CreateManyFailure,

    Update,
    UpdateSuccess,
    UpdateFailure,
    UpdateMany,
    UpdateManySuccess,
    UpdateManyFailure,

    Upsert,
    UpsertSuccess,
    UpsertFailure,
    UpsertMany,
    UpsertManySuccess,
    UpsertManyFailure,

    Replace,
    ReplaceSuccess,
    ReplaceFailure,
    ReplaceMany,
    ReplaceManySuccess,
    ReplaceManyFailure,

    // =========================================================================
    // DELETE FAMILIES
    // =========================================================================
    Delete,
    DeleteSuccess,
    DeleteFailure,
    DeleteMany,
    DeleteManySuccess,
    DeleteManyFailure,
    DeleteByKey,
    DeleteByKeySuccess,
    DeleteByKeyFailure,
    DeleteManyByKeys,
    DeleteManyByKeysSuccess,
    DeleteManyByKeysFailure,

    // =========================================================================
    // BOOKKEEPING
    // =========================================================================
    Clear,

    Select,
    SelectByKey,
    SelectMany,
    SelectManyByKeys,
    SelectMore,
    SelectMoreByKeys,
    Deselect,
    DeselectMany,
    DeselectManyByKeys,
    DeselectAll,

    EditNew,
    Edit,
    EditByKey,
    Change,
    EndEdit,
}

/// Operation family an event kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventFamily {
    Load,
    LoadAll,
    LoadMany,
    LoadPage,
    LoadRange,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Upsert,
    UpsertMany,
    Replace,
    ReplaceMany,
    Delete,
    DeleteMany,
    DeleteByKey,
    DeleteManyByKeys,
    Clear,
    Selection,
    Edit,
}

/// Position of an event within its request/response lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPhase {
    /// A request was issued (transport call pending).
    Begin,
    /// A conditional request; never reduced, only decided upon.
    IfNecessary,
    /// The transport call succeeded.
    Success,
    /// The transport call failed.
    Failure,
    /// A synchronous bookkeeping event (selection, edit, clear).
    Immediate,
}

/// Shape of a payload, used for validation and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadShape {
    Empty,
    Entity,
    Entities,
    Key,
    Keys,
    Page,
    Range,
    PagedEntities,
    RangedEntities,
    Error,
}

impl EventKind {
    /// Every canonical kind, in declaration order.
    pub const ALL: [EventKind; 72] = [
        Self::Load,
        Self::LoadIfNecessary,
        Self::LoadSuccess,
        Self::LoadFailure,
        Self::LoadAll,
        Self::LoadAllIfNecessary,
        Self::LoadAllSuccess,
        Self::LoadAllFailure,
        Self::LoadMany,
        Self::LoadManyIfNecessary,
        Self::LoadManySuccess,
        Self::LoadManyFailure,
        Self::LoadPage,
        Self::LoadPageIfNecessary,
        Self::LoadPageSuccess,
        Self::LoadPageFailure,
        Self::LoadRange,
        Self::LoadRangeIfNecessary,
        Self::LoadRangeSuccess,
        Self::LoadRangeFailure,
        Self::Create,
        Self::CreateSuccess,
        Self::CreateFailure,
        Self::CreateMany,
        Self::CreateManySuccess,
        Self::CreateManyFailure,
        Self::Update,
        Self::UpdateSuccess,
        Self::UpdateFailure,
        Self::UpdateMany,
        Self::UpdateManySuccess,
        Self::UpdateManyFailure,
        Self::Upsert,
        Self::UpsertSuccess,
        Self::UpsertFailure,
        Self::UpsertMany,
        Self::UpsertManySuccess,
        Self::UpsertManyFailure,
        Self::Replace,
        Self::ReplaceSuccess,
        Self::ReplaceFailure,
        Self::ReplaceMany,
        Self::ReplaceManySuccess,
        Self::ReplaceManyFailure,
        Self::Delete,
        Self::DeleteSuccess,
        Self::DeleteFailure,
        Self::DeleteMany,
        Self::DeleteManySuccess,
        Self::DeleteManyFailure,
        Self::DeleteByKey,
        Self::DeleteByKeySuccess,
        Self::DeleteByKeyFailure,
        Self::DeleteManyByKeys,
        Self::DeleteManyByKeysSuccess,
        Self::DeleteManyByKeysFailure,
        Self::Clear,
        Self::Select,
        Self::SelectByKey,
        Self::SelectMany,
        Self::SelectManyByKeys,
        Self::SelectMore,
        Self::SelectMoreByKeys,
        Self::Deselect,
        Self::DeselectMany,
        Self::DeselectManyByKeys,
        Self::DeselectAll,
        Self::EditNew,
        Self::Edit,
        Self::EditByKey,
        Self::Change,
        Self::EndEdit,
    ];

    /// The operation family of this kind.
    #[must_use]
    pub fn family(self) -> EventFamily {
        use EventKind::*;
        match self {
            Load | LoadIfNecessary | LoadSuccess | LoadFailure => EventFamily::Load,
            LoadAll | LoadAllIfNecessary | LoadAllSuccess | LoadAllFailure => EventFamily::LoadAll,
            LoadMany | LoadManyIfNecessary | LoadManySuccess | LoadManyFailure => {
                EventFamily::LoadMany
            }
            LoadPage | LoadPageIfNecessary | LoadPageSuccess | LoadPageFailure => {
                EventFamily::LoadPage
            }
            LoadRange | LoadRangeIfNecessary | LoadRangeSuccess | LoadRangeFailure => {
                EventFamily::LoadRange
            }
            Create | CreateSuccess | CreateFailure => EventFamily::Create,
            CreateMany | CreateManySuccess | CreateManyFailure => EventFamily::CreateMany,
            Update | UpdateSuccess | UpdateFailure => EventFamily::Update,
            UpdateMany | UpdateManySuccess | UpdateManyFailure => EventFamily::UpdateMany,
            Upsert | UpsertSuccess | UpsertFailure => EventFamily::Upsert,
            UpsertMany | UpsertManySuccess | UpsertManyFailure => EventFamily::UpsertMany,
            Replace | ReplaceSuccess | ReplaceFailure => EventFamily::Replace,
            ReplaceMany | ReplaceManySuccess | ReplaceManyFailure => EventFamily::ReplaceMany,
            Delete | DeleteSuccess | DeleteFailure => EventFamily::Delete,
            DeleteMany | DeleteManySuccess | DeleteManyFailure => EventFamily::DeleteMany,
            DeleteByKey | DeleteByKeySuccess | DeleteByKeyFailure => EventFamily::DeleteByKey,
            DeleteManyByKeys | DeleteManyByKeysSuccess | DeleteManyByKeysFailure => {
                EventFamily::DeleteManyByKeys
            }
            Clear => EventFamily::Clear,
            Select | SelectByKey | SelectMany | SelectManyByKeys | SelectMore
            | SelectMoreByKeys | Deselect | DeselectMany | DeselectManyByKeys | DeselectAll => {
                EventFamily::Selection
            }
            EditNew | Edit | EditByKey | Change | EndEdit => EventFamily::Edit,
        }
    }

    /// The lifecycle phase of this kind.
    #[must_use]
    pub fn phase(self) -> EventPhase {
        use EventKind::*;
        match self {
            Load | LoadAll | LoadMany | LoadPage | LoadRange | Create | CreateMany | Update
            | UpdateMany | Upsert | UpsertMany | Replace | ReplaceMany | Delete | DeleteMany
            | DeleteByKey | DeleteManyByKeys => EventPhase::Begin,
            LoadIfNecessary | LoadAllIfNecessary | LoadManyIfNecessary | LoadPageIfNecessary
            | LoadRangeIfNecessary => EventPhase::IfNecessary,
            LoadSuccess | LoadAllSuccess | LoadManySuccess | LoadPageSuccess
            | LoadRangeSuccess | CreateSuccess | CreateManySuccess | UpdateSuccess
            | UpdateManySuccess | UpsertSuccess | UpsertManySuccess | ReplaceSuccess
            | ReplaceManySuccess | DeleteSuccess | DeleteManySuccess | DeleteByKeySuccess
            | DeleteManyByKeysSuccess => EventPhase::Success,
            LoadFailure | LoadAllFailure | LoadManyFailure | LoadPageFailure
            | LoadRangeFailure | CreateFailure | CreateManyFailure | UpdateFailure
            | UpdateManyFailure | UpsertFailure | UpsertManyFailure | ReplaceFailure
            | ReplaceManyFailure | DeleteFailure | DeleteManyFailure | DeleteByKeyFailure
            | DeleteManyByKeysFailure => EventPhase::Failure,
            Clear | Select | SelectByKey | SelectMany | SelectManyByKeys | SelectMore
            | SelectMoreByKeys | Deselect | DeselectMany | DeselectManyByKeys | DeselectAll
            | EditNew | Edit | EditByKey | Change | EndEdit => EventPhase::Immediate,
        }
    }

    /// Payload shapes this kind accepts.
    #[must_use]
    pub fn accepted_payloads(self) -> &'static [PayloadShape] {
        use EventKind::*;
        use PayloadShape as P;
        match self {
            Load | LoadIfNecessary => &[P::Key],
            LoadAll | LoadAllIfNecessary => &[P::Empty],
            LoadMany | LoadManyIfNecessary => &[P::Empty, P::Keys],
            LoadPage | LoadPageIfNecessary => &[P::Page],
            LoadRange | LoadRangeIfNecessary => &[P::Range],
            LoadSuccess => &[P::Entity],
            LoadAllSuccess | LoadManySuccess => &[P::Entities],
            LoadPageSuccess => &[P::PagedEntities, P::Entities],
            LoadRangeSuccess => &[P::RangedEntities, P::Entities],
            Create | CreateSuccess | Update | UpdateSuccess | Upsert | UpsertSuccess
            | Replace | ReplaceSuccess | Delete | DeleteSuccess => &[P::Entity],
            CreateMany | CreateManySuccess | UpdateMany | UpdateManySuccess | UpsertMany
            | UpsertManySuccess | ReplaceMany | ReplaceManySuccess | DeleteMany
            | DeleteManySuccess => &[P::Entities],
            DeleteByKey | DeleteByKeySuccess => &[P::Key],
            DeleteManyByKeys | DeleteManyByKeysSuccess => &[P::Keys],
            Clear | Deselect | DeselectAll | EndEdit => &[P::Empty],
            Select | Edit | Change => &[P::Entity],
            SelectByKey | EditByKey => &[P::Key],
            SelectMany | SelectMore | DeselectMany => &[P::Entities],
            SelectManyByKeys | SelectMoreByKeys | DeselectManyByKeys => &[P::Keys],
            EditNew => &[P::Empty, P::Entity],
            LoadFailure | LoadAllFailure | LoadManyFailure | LoadPageFailure
            | LoadRangeFailure | CreateFailure | CreateManyFailure | UpdateFailure
            | UpdateManyFailure | UpsertFailure | UpsertManyFailure | ReplaceFailure
            | ReplaceManyFailure | DeleteFailure | DeleteManyFailure | DeleteByKeyFailure
            | DeleteManyByKeysFailure => &[P::Error],
        }
    }

    /// The success kind answering this begin kind.
    #[must_use]
    pub fn success(self) -> Option<EventKind> {
        self.response(EventPhase::Success)
    }

    /// The failure kind answering this begin kind.
    #[must_use]
    pub fn failure(self) -> Option<EventKind> {
        self.response(EventPhase::Failure)
    }

    fn response(self, phase: EventPhase) -> Option<EventKind> {
        if self.phase() != EventPhase::Begin {
            return None;
        }
        let family = self.family();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.family() == family && kind.phase() == phase)
    }

    /// The unconditional kind a `*IfNecessary` kind escalates to.
    #[must_use]
    pub fn escalation(self) -> Option<EventKind> {
        match self {
            Self::LoadIfNecessary => Some(Self::Load),
            Self::LoadAllIfNecessary => Some(Self::LoadAll),
            Self::LoadManyIfNecessary => Some(Self::LoadMany),
            Self::LoadPageIfNecessary => Some(Self::LoadPage),
            Self::LoadRangeIfNecessary => Some(Self::LoadRange),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Event payload; the accepted shape depends on the event kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum EventPayload {
    #[default]
    Empty,
    Entity(Entity),
    Entities(Vec<Entity>),
    Key(EntityKey),
    Keys(Vec<EntityKey>),
    Page(Page),
    Range(Range),
    #[serde(rename_all = "camelCase")]
    PagedEntities {
        entities: Vec<Entity>,
        page_info: Option<PageInfo>,
    },
    #[serde(rename_all = "camelCase")]
    RangedEntities {
        entities: Vec<Entity>,
        range_info: Option<RangeInfo>,
    },
    Error(TransportError),
}

impl EventPayload {
    /// The shape of this payload.
    #[must_use]
    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::Empty => PayloadShape::Empty,
            Self::Entity(_) => PayloadShape::Entity,
            Self::Entities(_) => PayloadShape::Entities,
            Self::Key(_) => PayloadShape::Key,
            Self::Keys(_) => PayloadShape::Keys,
            Self::Page(_) => PayloadShape::Page,
            Self::Range(_) => PayloadShape::Range,
            Self::PagedEntities { .. } => PayloadShape::PagedEntities,
            Self::RangedEntities { .. } => PayloadShape::RangedEntities,
            Self::Error(_) => PayloadShape::Error,
        }
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// The universal event envelope.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent {
    /// Token of the entity type this event targets.
    pub entity_type: EntityTypeId,

    /// Canonical event kind.
    #[serde(rename = "eventKind")]
    pub kind: EventKind,

    /// Kind-dependent payload.
    #[serde(default)]
    pub payload: EventPayload,

    /// Correlates a request with its eventual success/failure.
    #[serde(default = "Uuid::new_v4")]
    pub correlation_id: Uuid,

    /// Opaque criteria forwarded to the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<serde_json::Value>,

    /// Max-age override for `*IfNecessary` kinds.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Duration>,
}

impl EntityEvent {
    /// Create an event with a fresh correlation id.
    pub fn new(entity_type: impl Into<EntityTypeId>, kind: EventKind, payload: EventPayload) -> Self {
        Self {
            entity_type: entity_type.into(),
            kind,
            payload,
            correlation_id: Uuid::new_v4(),
            criteria: None,
            max_age: None,
        }
    }

    /// Use a caller-provided correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Attach transport criteria.
    #[must_use]
    pub fn with_criteria(mut self, criteria: serde_json::Value) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Attach a max-age override.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Build the follow-up event of this request: same entity type,
    /// correlation id and criteria, new kind and payload.
    #[must_use]
    pub fn follow_up(&self, kind: EventKind, payload: EventPayload) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            kind,
            payload,
            correlation_id: self.correlation_id,
            criteria: self.criteria.clone(),
            max_age: None,
        }
    }

    /// Returns true if the payload shape is accepted by the event kind.
    #[must_use]
    pub fn has_valid_payload(&self) -> bool {
        self.kind.accepted_payloads().contains(&self.payload.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_all_kinds_are_distinct() {
        let unique: HashSet<EventKind> = EventKind::ALL.iter().copied().collect();
        assert_eq!(unique.len(), 72);
    }

    #[test]
    fn test_every_begin_kind_has_success_and_failure() {
        for kind in EventKind::ALL {
            if kind.phase() == EventPhase::Begin {
                let success = kind.success().expect("success kind");
                let failure = kind.failure().expect("failure kind");
                assert_eq!(success.family(), kind.family());
                assert_eq!(success.phase(), EventPhase::Success);
                assert_eq!(failure.phase(), EventPhase::Failure);
            } else {
                assert!(kind.success().is_none());
            }
        }
    }

    #[test]
    fn test_escalation_targets_begin_kinds() {
        for kind in EventKind::ALL {
            match kind.escalation() {
                Some(target) => {
                    assert_eq!(kind.phase(), EventPhase::IfNecessary);
                    assert_eq!(target.phase(), EventPhase::Begin);
                    assert_eq!(target.family(), kind.family());
                }
                None => assert_ne!(kind.phase(), EventPhase::IfNecessary),
            }
        }
    }

    #[test]
    fn test_failure_kinds_accept_only_errors() {
        for kind in EventKind::ALL {
            if kind.phase() == EventPhase::Failure {
                assert_eq!(kind.accepted_payloads(), &[PayloadShape::Error]);
            }
        }
    }

    #[test]
    fn test_payload_validation() {
        let event = EntityEvent::new("Customer", EventKind::SelectByKey, EventPayload::Key(EntityKey::Number(1)));
        assert!(event.has_valid_payload());

        let event = EntityEvent::new("Customer", EventKind::SelectByKey, EventPayload::Empty);
        assert!(!event.has_valid_payload());
    }

    #[test]
    fn test_follow_up_keeps_correlation() {
        let request = EntityEvent::new("Order", EventKind::LoadAll, EventPayload::Empty)
            .with_criteria(json!({"status": "open"}));
        let response = request.follow_up(EventKind::LoadAllSuccess, EventPayload::Entities(vec![]));

        assert_eq!(response.correlation_id, request.correlation_id);
        assert_eq!(response.criteria, request.criteria);
        assert_eq!(response.entity_type, request.entity_type);
    }

    #[test]
    fn test_wire_contract_defaults_correlation_id() {
        let event: EntityEvent = serde_json::from_value(json!({
            "entityType": "Customer",
            "eventKind": "LoadIfNecessary",
            "payload": {"type": "key", "value": 42},
            "maxAge": 60
        }))
        .unwrap();

        assert_eq!(event.kind, EventKind::LoadIfNecessary);
        assert_eq!(event.payload, EventPayload::Key(EntityKey::Number(42)));
        assert_eq!(event.max_age, Some(Duration::from_secs(60)));
        assert!(!event.correlation_id.is_nil());
    }

    #[test]
    fn test_wire_round_trip_keeps_correlation_id() {
        let event = EntityEvent::new("Customer", EventKind::Clear, EventPayload::Empty);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventKind"], "Clear");

        let back: EntityEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.correlation_id, event.correlation_id);
    }
}
