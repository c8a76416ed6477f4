//! # Core Domain Entities
//!
//! Defines the values every entity collection is built from.
//!
//! ## Types
//!
//! - **`EntityTypeId`**: Stable token naming one registered entity type
//! - **`EntityKey`**: Identity of one record within its type (number or text)
//! - **`Entity`**: A plain, JSON-shaped record shared behind an `Arc`
//! - **`Timestamp`**: Milliseconds since the UNIX epoch

use crate::errors::EntityShapeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::sync::Arc;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

// =============================================================================
// ENTITY TYPE TOKEN
// =============================================================================

/// Stable identifier of a registered entity type.
///
/// The registry, the event envelope and the bus filters are all keyed by
/// this token. Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTypeId(Arc<str>);

impl EntityTypeId {
    /// Create a new type token.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityTypeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// ENTITY KEY
// =============================================================================

/// Identity of a record within its entity type's collection.
///
/// Single-field keys keep the field's native kind; composite keys are
/// always `Text` (the `_`-joined segments).
///
/// Equality and hashing go through the canonical text form, so `Number(1)`
/// and `Text("1")` are the same key and a key taken from a route or URI
/// finds the record it names. `Text("01")` is not canonical and stays
/// distinct from `Number(1)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    /// Integral key value.
    Number(i64),
    /// Textual key value (also used for composite keys).
    Text(String),
}

impl EntityKey {
    /// Returns true for an empty textual key.
    ///
    /// Selection events treat an empty key as "no value".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Returns the key as a JSON value (used when writing keys back into
    /// records, e.g. by transports).
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::Text(text) => Value::from(text.as_str()),
        }
    }
}

/// Returns true if `text` is exactly how `n` prints in decimal.
fn is_canonical_text_of(text: &str, n: i64) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let canonical_digits = !digits.starts_with('+') && (digits == "0" || !digits.starts_with('0'));
    canonical_digits && text != "-0" && text.parse::<i64>() == Ok(n)
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(n), Self::Text(text)) | (Self::Text(text), Self::Number(n)) => {
                is_canonical_text_of(text, *n)
            }
        }
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut buf = [0u8; 20];
        let bytes = match self {
            Self::Text(text) => text.as_bytes(),
            Self::Number(n) => {
                let mut cursor = &mut buf[..];
                // i64::MIN prints in exactly 20 bytes.
                let _ = write!(cursor, "{n}");
                let len = 20 - cursor.len();
                &buf[..len]
            }
        };
        state.write(bytes);
        state.write_u8(0xff);
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for EntityKey {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for EntityKey {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// =============================================================================
// ENTITY RECORD
// =============================================================================

/// A plain entity record: a JSON object shared behind an `Arc`.
///
/// Entities are values. Builders return new records; `with`/`merge` copy on
/// write, so a record already stored in a collection is never changed
/// through another handle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Arc<Map<String, Value>>);

impl Entity {
    /// An empty record (used for "edit new" buffers).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a field map.
    ///
    /// ```
    /// use serde_json::json;
    /// use shared_types::Entity;
    ///
    /// let customer = Entity::from_fields([("id", json!(7)), ("name", json!("Ada"))]);
    /// assert_eq!(customer.get("name"), Some(&json!("Ada")));
    /// ```
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, EntityShapeError> {
        match value {
            Value::Object(map) => Ok(Self(Arc::new(map))),
            other => Err(EntityShapeError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Build a record from any serializable domain type.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, EntityShapeError> {
        Self::from_value(serde_json::to_value(value)?)
    }

    /// Convert the record back into a typed domain value.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, EntityShapeError> {
        Ok(serde_json::from_value(Value::Object((*self.0).clone()))?)
    }

    /// Read one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// All fields of the record.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a record with `field` set to `value`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.0).insert(field.into(), value);
        self
    }

    /// Shallow merge: fields of `patch` overwrite fields of `self`.
    #[must_use]
    pub fn merge(&self, patch: &Entity) -> Self {
        let mut merged = (*self.0).clone();
        for (field, value) in patch.0.iter() {
            merged.insert(field.clone(), value.clone());
        }
        Self(Arc::new(merged))
    }

    /// Returns true if both handles point at the same record allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(map: Map<String, Value>) -> Self {
        Self(Arc::new(map))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
