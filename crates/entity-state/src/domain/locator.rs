//! State addressing.
//!
//! A type's slice lives either directly on the root (root mode) under the
//! camel-cased model name, or one level down under a namespace node
//! (namespaced mode).

use super::errors::ConfigurationError;
use super::metadata::EntityMetadata;
use super::slice::EntitySlice;
use super::tree::{RootState, StateNode};
use convert_case::{Case, Casing};
use std::fmt;
use std::sync::Arc;

/// Address of a slice inside the root state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateAddress {
    namespace: Option<String>,
    name: String,
}

impl StateAddress {
    /// Slice stored directly on the root.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Slice stored under a namespace node.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Address derived from a model name: `OrderLine` becomes `orderLine`.
    #[must_use]
    pub fn for_model(model_name: &str, namespace: Option<&str>) -> Self {
        let name = model_name.trim().to_case(Case::Camel);
        match namespace {
            Some(ns) => Self::namespaced(ns, name),
            None => Self::root(name),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Find a type's slice, or fail with `MissingStateSlice`.
pub fn locate<'s>(
    root: &'s RootState,
    metadata: &EntityMetadata,
) -> Result<&'s Arc<EntitySlice>, ConfigurationError> {
    root.slice_at(metadata.address())
        .ok_or_else(|| missing_slice(metadata))
}

/// Replace a type's slice, copying only the nodes along its path.
pub fn write(
    root: &mut RootState,
    metadata: &EntityMetadata,
    slice: EntitySlice,
) -> Result<(), ConfigurationError> {
    locate(root, metadata)?;
    let slot = root
        .slice_slot_mut(metadata.address())
        .ok_or_else(|| missing_slice(metadata))?;
    *slot = Arc::new(slice);
    Ok(())
}

/// Edit a type's slice in place (copy-on-write along its path).
pub(crate) fn edit<F>(
    root: &mut RootState,
    metadata: &EntityMetadata,
    apply: F,
) -> Result<(), ConfigurationError>
where
    F: FnOnce(&mut EntitySlice),
{
    let slot = root
        .slice_slot_mut(metadata.address())
        .ok_or_else(|| missing_slice(metadata))?;
    apply(Arc::make_mut(slot));
    Ok(())
}

fn missing_slice(metadata: &EntityMetadata) -> ConfigurationError {
    ConfigurationError::MissingStateSlice {
        entity_type: metadata.entity_type().clone(),
        address: metadata.address().to_string(),
    }
}

impl RootState {
    /// The slice at an address, if the path exists with the right shape.
    #[must_use]
    pub fn slice_at(&self, address: &StateAddress) -> Option<&Arc<EntitySlice>> {
        let node = match address.namespace() {
            None => self.node(address.name())?,
            Some(ns) => match self.node(ns)? {
                StateNode::Namespace(children) => children.get(address.name())?,
                StateNode::Slice(_) | StateNode::Value(_) => return None,
            },
        };
        match node {
            StateNode::Slice(slice) => Some(slice),
            StateNode::Namespace(_) | StateNode::Value(_) => None,
        }
    }

    /// Mutable slot of the slice at an address.
    ///
    /// Un-shares the root map (and the namespace map) on the way down, so
    /// it must only be called once the path is known to exist.
    fn slice_slot_mut(&mut self, address: &StateAddress) -> Option<&mut Arc<EntitySlice>> {
        if self.slice_at(address).is_none() {
            return None;
        }
        let nodes = self.nodes_mut();
        let node = match address.namespace() {
            None => nodes.get_mut(address.name())?,
            Some(ns) => match nodes.get_mut(ns)? {
                StateNode::Namespace(children) => Arc::make_mut(children).get_mut(address.name())?,
                StateNode::Slice(_) | StateNode::Value(_) => return None,
            },
        };
        match node {
            StateNode::Slice(slice) => Some(slice),
            StateNode::Namespace(_) | StateNode::Value(_) => None,
        }
    }
}
