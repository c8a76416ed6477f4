//! Entity metadata and the registry that owns it.
//!
//! Metadata is declared once per entity type through
//! [`EntityMetadataBuilder`], validated eagerly, and stored in an
//! [`EntityRegistry`] the host owns. Nothing is attached to domain types.

use super::errors::ConfigurationError;
use super::locator::StateAddress;
use super::tree::{RootState, RootStateBuilder};
use shared_types::{Entity, EntityTypeId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Ordering function used by sorted selectors.
pub type Comparer = Arc<dyn Fn(&Entity, &Entity) -> Ordering + Send + Sync>;

/// Declared metadata of one entity type.
#[derive(Clone)]
pub struct EntityMetadata {
    entity_type: EntityTypeId,
    model_name: String,
    plural_name: String,
    uri_name: Option<String>,
    key_fields: Vec<String>,
    namespace: Option<String>,
    default_max_age: Option<Duration>,
    comparers: HashMap<String, Comparer>,
    default_comparer: Option<String>,
    address: StateAddress,
}

impl EntityMetadata {
    /// Start declaring metadata for an entity type.
    pub fn builder(entity_type: impl Into<EntityTypeId>) -> EntityMetadataBuilder {
        EntityMetadataBuilder::new(entity_type.into())
    }

    /// Token identifying the entity type.
    #[must_use]
    pub fn entity_type(&self) -> &EntityTypeId {
        &self.entity_type
    }

    /// Display name; the slice address derives from it.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Plural display name (defaults to the model name plus `s`).
    #[must_use]
    pub fn plural_name(&self) -> &str {
        &self.plural_name
    }

    /// Name transports use in URIs, if declared.
    #[must_use]
    pub fn uri_name(&self) -> Option<&str> {
        self.uri_name.as_deref()
    }

    /// Identity fields in declared order.
    #[must_use]
    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    /// Returns true if the identity spans more than one field.
    #[must_use]
    pub fn is_composite_key(&self) -> bool {
        self.key_fields.len() > 1
    }

    /// Namespace node the slice lives under, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Default staleness window for conditional loads.
    #[must_use]
    pub fn default_max_age(&self) -> Option<Duration> {
        self.default_max_age
    }

    /// Address of this type's slice in the root state.
    #[must_use]
    pub fn address(&self) -> &StateAddress {
        &self.address
    }

    /// Look up a named comparer.
    #[must_use]
    pub fn comparer(&self, name: &str) -> Option<&Comparer> {
        self.comparers.get(name)
    }

    /// The default comparer, if one was declared.
    #[must_use]
    pub fn default_comparer(&self) -> Option<(&str, &Comparer)> {
        let name = self.default_comparer.as_deref()?;
        self.comparers.get(name).map(|c| (name, c))
    }
}

impl fmt::Debug for EntityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut comparers: Vec<&String> = self.comparers.keys().collect();
        comparers.sort();
        f.debug_struct("EntityMetadata")
            .field("entity_type", &self.entity_type)
            .field("model_name", &self.model_name)
            .field("key_fields", &self.key_fields)
            .field("namespace", &self.namespace)
            .field("default_max_age", &self.default_max_age)
            .field("comparers", &comparers)
            .field("default_comparer", &self.default_comparer)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EntityMetadata`]; `build` validates everything up front.
pub struct EntityMetadataBuilder {
    entity_type: EntityTypeId,
    model_name: Option<String>,
    plural_name: Option<String>,
    uri_name: Option<String>,
    key_fields: Vec<String>,
    namespace: Option<String>,
    default_max_age: Option<Duration>,
    comparers: HashMap<String, Comparer>,
    default_comparer: Option<String>,
}

impl EntityMetadataBuilder {
    fn new(entity_type: EntityTypeId) -> Self {
        Self {
            entity_type,
            model_name: None,
            plural_name: None,
            uri_name: None,
            key_fields: Vec::new(),
            namespace: None,
            default_max_age: None,
            comparers: HashMap::new(),
            default_comparer: None,
        }
    }

    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn plural_name(mut self, name: impl Into<String>) -> Self {
        self.plural_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn uri_name(mut self, name: impl Into<String>) -> Self {
        self.uri_name = Some(name.into());
        self
    }

    /// Append one identity field.
    #[must_use]
    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_fields.push(field.into());
        self
    }

    /// Replace the identity fields (order is significant for composite keys).
    #[must_use]
    pub fn key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Default staleness window for `*IfNecessary` loads.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age = Some(max_age);
        self
    }

    /// Declare a named comparer.
    #[must_use]
    pub fn comparer<F>(mut self, name: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&Entity, &Entity) -> Ordering + Send + Sync + 'static,
    {
        self.comparers.insert(name.into(), Arc::new(compare));
        self
    }

    /// Pick the comparer used by the default sorted selector.
    #[must_use]
    pub fn default_comparer(mut self, name: impl Into<String>) -> Self {
        self.default_comparer = Some(name.into());
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<EntityMetadata, ConfigurationError> {
        let entity_type = self.entity_type;

        let model_name = match self.model_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ConfigurationError::MissingModelName { entity_type }),
        };

        if self.key_fields.is_empty() {
            return Err(ConfigurationError::MissingKeyFields { entity_type });
        }
        if self.key_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigurationError::BlankKeyField { entity_type });
        }

        if matches!(&self.namespace, Some(ns) if ns.trim().is_empty()) {
            return Err(ConfigurationError::BlankNamespace { entity_type });
        }

        if let Some(name) = &self.default_comparer {
            if !self.comparers.contains_key(name) {
                return Err(ConfigurationError::UnknownComparer {
                    entity_type,
                    name: name.clone(),
                });
            }
        }

        let address = StateAddress::for_model(&model_name, self.namespace.as_deref());
        let plural_name = self
            .plural_name
            .unwrap_or_else(|| format!("{model_name}s"));

        Ok(EntityMetadata {
            entity_type,
            model_name,
            plural_name,
            uri_name: self.uri_name,
            key_fields: self.key_fields,
            namespace: self.namespace,
            default_max_age: self.default_max_age,
            comparers: self.comparers,
            default_comparer: self.default_comparer,
            address,
        })
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Metadata of every registered entity type, keyed by type token.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: HashMap<EntityTypeId, Arc<EntityMetadata>>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an entity type.
    ///
    /// Fails if another type already owns the same state address.
    pub fn register(
        &mut self,
        metadata: EntityMetadata,
    ) -> Result<Arc<EntityMetadata>, ConfigurationError> {
        if let Some(existing) = self.entries.values().find(|m| {
            m.entity_type != metadata.entity_type && m.address == metadata.address
        }) {
            return Err(ConfigurationError::AddressConflict {
                entity_type: metadata.entity_type.clone(),
                existing: existing.entity_type.clone(),
                address: metadata.address.to_string(),
            });
        }

        info!(
            entity_type = %metadata.entity_type,
            address = %metadata.address,
            key_fields = ?metadata.key_fields,
            "Entity type registered"
        );

        let metadata = Arc::new(metadata);
        self.entries
            .insert(metadata.entity_type.clone(), Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Builder-style registration.
    pub fn with(mut self, metadata: EntityMetadata) -> Result<Self, ConfigurationError> {
        self.register(metadata)?;
        Ok(self)
    }

    /// Metadata for a type, or `MissingMetadata`.
    pub fn get(&self, entity_type: &EntityTypeId) -> Result<&Arc<EntityMetadata>, ConfigurationError> {
        self.entries
            .get(entity_type)
            .ok_or_else(|| ConfigurationError::MissingMetadata {
                entity_type: entity_type.clone(),
            })
    }

    #[must_use]
    pub fn contains(&self, entity_type: &EntityTypeId) -> bool {
        self.entries.contains_key(entity_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered metadata (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityMetadata>> {
        self.entries.values()
    }

    /// A root state with an empty slice seeded for every registered type.
    #[must_use]
    pub fn initial_state(&self) -> RootState {
        RootStateBuilder::from_registry(self).build()
    }
}
