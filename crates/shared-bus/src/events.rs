//! # Event Filters
//!
//! Subscription filters over `EntityEvent`s. Every dimension that is left
//! empty accepts everything.

use shared_types::{EntityEvent, EntityTypeId, EventFamily, EventKind, EventPhase};

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Entity types to include. Empty means all types.
    pub entity_types: Vec<EntityTypeId>,
    /// Operation families to include. Empty means all families.
    pub families: Vec<EventFamily>,
    /// Lifecycle phases to include. Empty means all phases.
    pub phases: Vec<EventPhase>,
    /// Exact kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific entity types.
    #[must_use]
    pub fn entity_types(entity_types: Vec<EntityTypeId>) -> Self {
        Self {
            entity_types,
            ..Self::default()
        }
    }

    /// Create a filter for specific lifecycle phases.
    #[must_use]
    pub fn phases(phases: Vec<EventPhase>) -> Self {
        Self {
            phases,
            ..Self::default()
        }
    }

    /// Create a filter for exact event kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            ..Self::default()
        }
    }

    /// Events an effects loop answers: begin requests and conditional loads.
    #[must_use]
    pub fn requests() -> Self {
        Self::phases(vec![EventPhase::Begin, EventPhase::IfNecessary])
    }

    /// Narrow the filter to the given families.
    #[must_use]
    pub fn with_families(mut self, families: Vec<EventFamily>) -> Self {
        self.families = families;
        self
    }

    /// Narrow the filter to the given entity types.
    #[must_use]
    pub fn with_entity_types(mut self, entity_types: Vec<EntityTypeId>) -> Self {
        self.entity_types = entity_types;
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &EntityEvent) -> bool {
        let type_match =
            self.entity_types.is_empty() || self.entity_types.contains(&event.entity_type);
        let family_match =
            self.families.is_empty() || self.families.contains(&event.kind.family());
        let phase_match = self.phases.is_empty() || self.phases.contains(&event.kind.phase());
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind);

        type_match && family_match && phase_match && kind_match
    }

    /// Stable key used to track subscription counts.
    pub(crate) fn key(&self) -> String {
        format!(
            "{:?}|{:?}|{:?}|{:?}",
            self.entity_types, self.families, self.phases, self.kinds
        )
    }
}
