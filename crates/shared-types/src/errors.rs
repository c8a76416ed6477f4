//! # Error Types
//!
//! Defines error types shared across crates.

use crate::entities::EntityTypeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a transport collaborator.
///
/// These never reach the reducer as errors: the effects layer translates
/// them into the matching `*Failure` event.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransportError {
    /// The transport does not provide this operation for the entity type.
    #[error("{operation} is not implemented for entity type {entity_type}")]
    NotImplemented {
        entity_type: EntityTypeId,
        operation: String,
    },

    /// The operation was attempted and failed.
    #[error("{operation} failed for entity type {entity_type}: {cause}")]
    Failed {
        entity_type: EntityTypeId,
        operation: String,
        cause: String,
    },
}

impl TransportError {
    /// Create a `NotImplemented` error.
    pub fn not_implemented(entity_type: &EntityTypeId, operation: &str) -> Self {
        Self::NotImplemented {
            entity_type: entity_type.clone(),
            operation: operation.to_string(),
        }
    }

    /// Create a `Failed` error from any displayable cause.
    pub fn failed(
        entity_type: &EntityTypeId,
        operation: &str,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self::Failed {
            entity_type: entity_type.clone(),
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for the "method not implemented" case.
    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    /// The entity type the failed operation targeted.
    #[must_use]
    pub fn entity_type(&self) -> &EntityTypeId {
        match self {
            Self::NotImplemented { entity_type, .. } | Self::Failed { entity_type, .. } => {
                entity_type
            }
        }
    }
}

/// Errors building an `Entity` from arbitrary values.
#[derive(Debug, Error)]
pub enum EntityShapeError {
    /// Entities must be JSON objects.
    #[error("Entity must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// Conversion through serde failed.
    #[error("Entity conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}
