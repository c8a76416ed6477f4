//! Normalized entity collection.
//!
//! ## Invariant
//!
//! `ids` holds no duplicates and its value set equals the key set of
//! `entities` after every operation. Only the operations below mutate a
//! collection, and each of them preserves the invariant.
//!
//! ## Cost
//!
//! Both halves are persistent structures (`imbl`). Cloning a collection is
//! O(1) and a write copies only the nodes it touches, so merging N records
//! costs O(N log M) whether or not an older root, a store snapshot or a
//! selector handle still shares the collection.

use imbl::{HashMap, Vector};
use serde::Serialize;
use shared_types::{Entity, EntityKey};
use std::collections::HashSet;

/// Keyed records of one collection.
pub type EntityMap = HashMap<EntityKey, Entity>;

/// Ordered keys of one collection.
pub type KeyList = Vector<EntityKey>;

/// `entities` by key plus the load/insertion order of their keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityCollection {
    entities: EntityMap,
    ids: KeyList,
}

impl EntityCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from keyed records (later duplicates overwrite
    /// the record but keep the first position).
    #[must_use]
    pub fn from_keyed(keyed: Vec<(EntityKey, Entity)>) -> Self {
        let mut collection = Self::default();
        collection.replace_all(keyed);
        collection
    }

    #[must_use]
    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keys in load/insertion order.
    #[must_use]
    pub fn ids(&self) -> &KeyList {
        &self.ids
    }

    #[must_use]
    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    /// Records in `ids` order, skipping any id without a record.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.ids.iter().filter_map(|key| self.entities.get(key))
    }

    /// Insert or overwrite records; keys not yet present are appended to
    /// `ids` in batch order.
    pub fn merge_append(&mut self, keyed: Vec<(EntityKey, Entity)>) {
        for (key, entity) in keyed {
            if self.entities.insert(key.clone(), entity).is_none() {
                self.ids.push_back(key);
            }
        }
    }

    /// Replace the whole collection with the batch, de-duplicated in
    /// first-seen order.
    pub fn replace_all(&mut self, keyed: Vec<(EntityKey, Entity)>) {
        self.entities = EntityMap::new();
        self.ids = KeyList::new();
        self.merge_append(keyed);
    }

    /// Overwrite records whose keys are already present; unknown keys are
    /// skipped. Returns the number of records written.
    pub fn overwrite_existing(&mut self, keyed: Vec<(EntityKey, Entity)>) -> usize {
        let mut written = 0;
        for (key, entity) in keyed {
            if let Some(slot) = self.entities.get_mut(&key) {
                *slot = entity;
                written += 1;
            }
        }
        written
    }

    /// Remove records by key; `ids` becomes its intersection with the
    /// remaining keys. Returns the number of records removed.
    pub fn remove_keys(&mut self, keys: &[EntityKey]) -> usize {
        let removed = keys
            .iter()
            .filter(|key| self.entities.remove(*key).is_some())
            .count();
        if removed > 0 {
            let remaining = &self.entities;
            self.ids.retain(|key| remaining.contains_key(key));
        }
        removed
    }

    /// Returns true if the invariant holds. Intended for tests.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let unique: HashSet<&EntityKey> = self.ids.iter().collect();
        unique.len() == self.ids.len()
            && unique.len() == self.entities.len()
            && self.entities.keys().all(|key| unique.contains(key))
    }
}
