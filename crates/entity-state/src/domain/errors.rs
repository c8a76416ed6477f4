//! Engine error types.
//!
//! Two tiers: `ConfigurationError` is caught at the reducer's dispatch
//! choke point and degrades to a logged no-op; everything else in
//! `EngineError` propagates to the caller.

use shared_types::{EntityTypeId, EventKind, PayloadShape};
use thiserror::Error;

/// Misdeclared metadata or a state tree that does not match it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No metadata registered for the entity type.
    #[error("No metadata registered for entity type {entity_type}")]
    MissingMetadata { entity_type: EntityTypeId },

    /// Metadata declared without a model name.
    #[error("Entity type {entity_type} must declare a non-empty model name")]
    MissingModelName { entity_type: EntityTypeId },

    /// Metadata declared without key fields.
    #[error("Entity type {entity_type} must declare at least one key field")]
    MissingKeyFields { entity_type: EntityTypeId },

    /// A key field name is blank.
    #[error("Entity type {entity_type} declares a blank key field name")]
    BlankKeyField { entity_type: EntityTypeId },

    /// A namespace name is blank.
    #[error("Entity type {entity_type} declares a blank namespace")]
    BlankNamespace { entity_type: EntityTypeId },

    /// The default comparer names a comparer that was never declared.
    #[error("Entity type {entity_type} has no comparer named {name}")]
    UnknownComparer {
        entity_type: EntityTypeId,
        name: String,
    },

    /// Two entity types resolve to the same state address.
    #[error("Entity types {entity_type} and {existing} both map to state address {address}")]
    AddressConflict {
        entity_type: EntityTypeId,
        existing: EntityTypeId,
        address: String,
    },

    /// An entity lacks (or has a null) key field.
    #[error("Entity of type {entity_type} has no value for key field {field}")]
    MissingKeyValue {
        entity_type: EntityTypeId,
        field: String,
    },

    /// No slice at the type's address, or a node of the wrong shape.
    #[error("No state slice for entity type {entity_type} at {address}")]
    MissingStateSlice {
        entity_type: EntityTypeId,
        address: String,
    },
}

impl ConfigurationError {
    /// The entity type the error names.
    #[must_use]
    pub fn entity_type(&self) -> &EntityTypeId {
        match self {
            Self::MissingMetadata { entity_type }
            | Self::MissingModelName { entity_type }
            | Self::MissingKeyFields { entity_type }
            | Self::BlankKeyField { entity_type }
            | Self::BlankNamespace { entity_type }
            | Self::UnknownComparer { entity_type, .. }
            | Self::AddressConflict { entity_type, .. }
            | Self::MissingKeyValue { entity_type, .. }
            | Self::MissingStateSlice { entity_type, .. } => entity_type,
        }
    }
}

/// Engine error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Configuration problem (logged and skipped by the reducer).
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The payload shape does not fit the event kind.
    #[error("Event {kind} expects a payload of shape {expected:?}, found {found:?}")]
    PayloadMismatch {
        kind: EventKind,
        expected: &'static [PayloadShape],
        found: PayloadShape,
    },

    /// A key field holds a value that cannot identify an entity.
    #[error("Key field {field} of entity type {entity_type} holds a {found}, expected a string or number")]
    InvalidKeyValue {
        entity_type: EntityTypeId,
        field: String,
        found: &'static str,
    },

    /// A conditional-reload decision was requested for a non-conditional kind.
    #[error("Event {kind} is not a conditional load")]
    NotConditional { kind: EventKind },
}

impl EngineError {
    /// Returns true for errors the reducer degrades to a no-op.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
