//! Entity key resolution.
//!
//! Single-field keys keep the field's native kind (integral numbers stay
//! numbers). Composite keys are the string values of every key field, in
//! declared order, joined by `_`. The format must be reproduced exactly:
//! the same logical entity always resolves to the same key.

use super::errors::{ConfigurationError, EngineError};
use super::metadata::EntityMetadata;
use serde_json::Value;
use shared_types::{Entity, EntityKey};

/// Separator between composite key segments.
pub const COMPOSITE_KEY_SEPARATOR: &str = "_";

/// Resolve the key of one entity.
pub fn resolve_key(metadata: &EntityMetadata, entity: &Entity) -> Result<EntityKey, EngineError> {
    match metadata.key_fields() {
        [field] => single_key(metadata, entity, field),
        fields => {
            let mut segments = Vec::with_capacity(fields.len());
            for field in fields {
                segments.push(segment(metadata, entity, field)?);
            }
            Ok(EntityKey::Text(segments.join(COMPOSITE_KEY_SEPARATOR)))
        }
    }
}

/// Resolve the keys of a batch, pairing each key with its entity.
pub fn resolve_keyed(
    metadata: &EntityMetadata,
    entities: &[Entity],
) -> Result<Vec<(EntityKey, Entity)>, EngineError> {
    entities
        .iter()
        .map(|entity| Ok((resolve_key(metadata, entity)?, entity.clone())))
        .collect()
}

/// Resolve the keys of a batch.
pub fn resolve_keys(
    metadata: &EntityMetadata,
    entities: &[Entity],
) -> Result<Vec<EntityKey>, EngineError> {
    entities.iter().map(|e| resolve_key(metadata, e)).collect()
}

/// Resolve a key, treating any failure as "no key".
///
/// Used where an entity legitimately may not carry its identity yet
/// (e.g. a buffer seeded by `EditNew`).
#[must_use]
pub fn try_resolve_key(metadata: &EntityMetadata, entity: &Entity) -> Option<EntityKey> {
    resolve_key(metadata, entity).ok()
}

fn single_key(
    metadata: &EntityMetadata,
    entity: &Entity,
    field: &str,
) -> Result<EntityKey, EngineError> {
    match entity.get(field) {
        Some(Value::Number(n)) => Ok(match n.as_i64() {
            Some(i) => EntityKey::Number(i),
            None => EntityKey::Text(n.to_string()),
        }),
        Some(Value::String(s)) => Ok(EntityKey::Text(s.clone())),
        Some(Value::Null) | None => Err(missing(metadata, field)),
        Some(other) => Err(invalid(metadata, field, other)),
    }
}

fn segment(metadata: &EntityMetadata, entity: &Entity, field: &str) -> Result<String, EngineError> {
    match entity.get(field) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(missing(metadata, field)),
        Some(other) => Err(invalid(metadata, field, other)),
    }
}

fn missing(metadata: &EntityMetadata, field: &str) -> EngineError {
    ConfigurationError::MissingKeyValue {
        entity_type: metadata.entity_type().clone(),
        field: field.to_string(),
    }
    .into()
}

fn invalid(metadata: &EntityMetadata, field: &str, value: &Value) -> EngineError {
    let found = match value {
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null | Value::Number(_) | Value::String(_) => "scalar",
    };
    EngineError::InvalidKeyValue {
        entity_type: metadata.entity_type().clone(),
        field: field.to_string(),
        found,
    }
}
