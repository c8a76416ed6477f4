//! The root state tree.
//!
//! A persistent tree of `Arc` nodes. Cloning a `RootState` is one
//! reference-count bump; writes un-share only the nodes on the written
//! path, so every earlier handle keeps observing the state it was taken
//! from and untouched branches stay pointer-equal.

use super::locator::StateAddress;
use super::metadata::EntityRegistry;
use super::slice::EntitySlice;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One node of the state tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateNode {
    /// An entity slice.
    Slice(Arc<EntitySlice>),
    /// A namespace grouping slices (and host values).
    Namespace(Arc<BTreeMap<String, StateNode>>),
    /// Host-defined data the engine never touches.
    Value(Arc<Value>),
}

/// Root of the state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RootState {
    nodes: Arc<BTreeMap<String, StateNode>>,
}

impl RootState {
    /// Returns true if both handles share the same root allocation.
    ///
    /// A reduction that changes nothing returns the root unchanged, so this
    /// is the cheap "did anything happen" check.
    #[must_use]
    pub fn ptr_eq(&self, other: &RootState) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
    }

    /// Top-level node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&StateNode> {
        self.nodes.get(name)
    }

    /// Names of the top-level nodes.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Host value stored at the top level.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.nodes.get(name)? {
            StateNode::Value(value) => Some(value),
            StateNode::Slice(_) | StateNode::Namespace(_) => None,
        }
    }

    /// Set a host value at the top level.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.nodes_mut()
            .insert(name.into(), StateNode::Value(Arc::new(value)));
    }

    /// JSON rendering of the whole tree (diagnostics, snapshots).
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub(super) fn nodes_mut(&mut self) -> &mut BTreeMap<String, StateNode> {
        Arc::make_mut(&mut self.nodes)
    }
}

/// Builds a root state from slices and host values.
#[derive(Debug, Default)]
pub struct RootStateBuilder {
    nodes: BTreeMap<String, StateNode>,
}

impl RootStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an empty slice for every registered type.
    #[must_use]
    pub fn from_registry(registry: &EntityRegistry) -> Self {
        registry.iter().fold(Self::new(), |builder, metadata| {
            builder.slice(metadata.address().clone(), EntitySlice::new())
        })
    }

    /// Place a slice at an address, creating its namespace node if needed.
    ///
    /// A non-namespace node already occupying the namespace name is replaced.
    #[must_use]
    pub fn slice(mut self, address: StateAddress, slice: EntitySlice) -> Self {
        let node = StateNode::Slice(Arc::new(slice));
        match address.namespace() {
            None => {
                self.nodes.insert(address.name().to_string(), node);
            }
            Some(ns) => {
                let entry = self
                    .nodes
                    .entry(ns.to_string())
                    .or_insert_with(|| StateNode::Namespace(Arc::default()));
                if !matches!(entry, StateNode::Namespace(_)) {
                    *entry = StateNode::Namespace(Arc::default());
                }
                if let StateNode::Namespace(children) = entry {
                    Arc::make_mut(children).insert(address.name().to_string(), node);
                }
            }
        }
        self
    }

    /// Place a host value at the top level.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.nodes.insert(name.into(), StateNode::Value(Arc::new(value)));
        self
    }

    #[must_use]
    pub fn build(self) -> RootState {
        RootState {
            nodes: Arc::new(self.nodes),
        }
    }
}
