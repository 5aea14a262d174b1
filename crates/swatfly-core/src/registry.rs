//! Registry module: the ordered collection of entities in a session.
//!
//! The Registry provides:
//! - Entity storage with insertion-ordered iteration (`BTreeMap` keyed by a
//!   monotonically increasing slot)
//! - Lookup by [`EntityId`] through a side index
//! - Tracking of the single local entity
//! - A score-ranked view for scoreboards
//!
//! # Architecture
//!
//! Slots are never reused, so iterating the `BTreeMap` always yields entities
//! in the order they were first inserted. Drawing relies on this order, and
//! the ranked view uses it to break score ties.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use swatfly_core::config::EntityTuning;
//! use swatfly_core::entity::{ControlMode, Entity, EntityId};
//! use swatfly_core::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let id = EntityId::new("p2");
//!
//! registry.upsert(&id, || {
//!     Entity::new(id.clone(), ControlMode::Remote, Vec2::ZERO, EntityTuning::default())
//! });
//! // A second upsert returns the existing entity and never calls the factory.
//! registry.upsert(&id, || unreachable!());
//!
//! assert_eq!(registry.len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{Entity, EntityId};

/// Ordered collection of entities keyed by identity.
///
/// Guarantees that identities are unique and that at most one entity is
/// in [`ControlMode::Local`](crate::entity::ControlMode::Local).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Entities by insertion slot.
    slots: BTreeMap<u64, Entity>,
    /// Slot of every identity in `slots`.
    index: HashMap<EntityId, u64>,
    /// Next slot to hand out.
    next_slot: u64,
    /// Identity of the local entity, if one has been inserted.
    local: Option<EntityId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Insertion and removal
    // =========================================================================

    /// Returns the entity with `id`, creating it with `factory` if absent.
    ///
    /// `factory` is only called when `id` is not yet present, and must build
    /// an entity carrying that same identity. If the new entity is local, any
    /// previous local entity under another identity is removed first.
    pub fn upsert(&mut self, id: &EntityId, factory: impl FnOnce() -> Entity) -> &mut Entity {
        let slot = match self.index.get(id).copied() {
            Some(slot) => slot,
            None => {
                let entity = factory();
                debug_assert_eq!(entity.id(), id, "factory built an entity with another id");
                let slot = self.claim_slot(&entity);
                return self.slots.entry(slot).or_insert(entity);
            }
        };
        self.slots.entry(slot).or_insert_with(factory)
    }

    /// Inserts `entity` unless its identity is already present.
    ///
    /// Returns `true` if the entity was inserted.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.index.contains_key(entity.id()) {
            return false;
        }
        let slot = self.claim_slot(&entity);
        self.slots.insert(slot, entity);
        true
    }

    fn claim_slot(&mut self, entity: &Entity) -> u64 {
        if entity.is_local() {
            if let Some(previous) = self.local.take() {
                if &previous != entity.id() {
                    debug!(%previous, replacement = %entity.id(), "replacing local entity");
                    self.remove(&previous);
                }
            }
            self.local = Some(entity.id().clone());
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        self.index.insert(entity.id().clone(), slot);
        slot
    }

    /// Removes and returns the entity with `id`. No-op if absent.
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let slot = self.index.remove(id)?;
        if self.local.as_ref() == Some(id) {
            self.local = None;
        }
        self.slots.remove(&slot)
    }

    /// Removes every entity. Slots keep increasing across a clear.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.local = None;
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Returns the entity with `id`.
    #[must_use]
    pub fn find(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).and_then(|slot| self.slots.get(slot))
    }

    /// Returns the entity with `id` mutably.
    #[must_use]
    pub fn find_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        let slot = self.index.get(id)?;
        self.slots.get_mut(slot)
    }

    /// Returns `true` if an entity with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the local entity, or `None` before initialization.
    #[must_use]
    pub fn local_entity(&self) -> Option<&Entity> {
        self.local.as_ref().and_then(|id| self.find(id))
    }

    /// Returns the local entity mutably.
    #[must_use]
    pub fn local_entity_mut(&mut self) -> Option<&mut Entity> {
        let id = self.local.clone()?;
        self.find_mut(&id)
    }

    /// Returns the identity of the local entity.
    #[must_use]
    pub fn local_id(&self) -> Option<&EntityId> {
        self.local.as_ref()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the registry holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Iterates entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.values()
    }

    /// Iterates entities mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.values_mut()
    }

    /// Identities in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.slots.values().map(|e| e.id().clone()).collect()
    }

    /// Entities ordered by score descending, ties in insertion order.
    ///
    /// Recomputed on every call and never reorders the underlying storage,
    /// so each call starts a fresh pass over the current scores.
    pub fn ranked(&self) -> impl Iterator<Item = &Entity> + '_ {
        let mut ranked: Vec<&Entity> = self.slots.values().collect();
        // sort_by is stable, so equal scores keep insertion order.
        ranked.sort_by(|a, b| b.score().cmp(&a.score()));
        ranked.into_iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityTuning;
    use crate::entity::ControlMode;
    use glam::Vec2;

    fn make(id: &str, mode: ControlMode) -> Entity {
        Entity::new(EntityId::new(id), mode, Vec2::ZERO, EntityTuning::default())
    }

    mod upsert_tests {
        use super::*;

        #[test]
        fn creates_once() {
            let mut registry = Registry::new();
            let id = EntityId::new("a");
            let mut calls = 0;

            for _ in 0..3 {
                registry.upsert(&id, || {
                    calls += 1;
                    make("a", ControlMode::Remote)
                });
            }

            assert_eq!(calls, 1);
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn returns_existing_for_mutation() {
            let mut registry = Registry::new();
            let id = EntityId::new("a");
            registry.upsert(&id, || make("a", ControlMode::Remote)).set_score(3);

            let entity = registry.upsert(&id, || make("a", ControlMode::Remote));
            assert_eq!(entity.score(), 3);
        }

        #[test]
        fn duplicate_insert_is_no_op() {
            let mut registry = Registry::new();
            assert!(registry.insert(make("a", ControlMode::Remote).with_score(1)));
            assert!(!registry.insert(make("a", ControlMode::Remote).with_score(9)));
            assert_eq!(registry.find(&EntityId::new("a")).unwrap().score(), 1);
        }

        #[test]
        fn new_local_replaces_previous_local() {
            let mut registry = Registry::new();
            registry.insert(make("me", ControlMode::Local));
            registry.insert(make("other", ControlMode::Remote));
            registry.insert(make("me2", ControlMode::Local));

            assert_eq!(registry.local_id(), Some(&EntityId::new("me2")));
            assert!(!registry.contains(&EntityId::new("me")));
            assert_eq!(registry.len(), 2);
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn find_and_remove() {
            let mut registry = Registry::new();
            registry.insert(make("a", ControlMode::Remote));
            assert!(registry.find(&EntityId::new("a")).is_some());

            assert!(registry.remove(&EntityId::new("a")).is_some());
            assert!(registry.find(&EntityId::new("a")).is_none());
            assert!(registry.remove(&EntityId::new("a")).is_none());
        }

        #[test]
        fn local_entity_before_and_after_insert() {
            let mut registry = Registry::new();
            assert!(registry.local_entity().is_none());

            registry.insert(make("me", ControlMode::Local));
            assert_eq!(registry.local_entity().unwrap().id().as_str(), "me");

            registry.remove(&EntityId::new("me"));
            assert!(registry.local_entity().is_none());
            assert!(registry.local_id().is_none());
        }

        #[test]
        fn clear_empties_everything() {
            let mut registry = Registry::new();
            registry.insert(make("me", ControlMode::Local));
            registry.insert(make("a", ControlMode::Remote));
            registry.clear();

            assert!(registry.is_empty());
            assert!(registry.local_entity().is_none());
        }
    }

    mod order_tests {
        use super::*;

        #[test]
        fn iteration_follows_insertion_order() {
            let mut registry = Registry::new();
            for id in ["c", "a", "b"] {
                registry.insert(make(id, ControlMode::Remote));
            }
            let ids: Vec<_> = registry.iter().map(|e| e.id().as_str().to_owned()).collect();
            assert_eq!(ids, ["c", "a", "b"]);
        }

        #[test]
        fn reinserted_entity_goes_last() {
            let mut registry = Registry::new();
            for id in ["a", "b"] {
                registry.insert(make(id, ControlMode::Remote));
            }
            registry.remove(&EntityId::new("a"));
            registry.insert(make("a", ControlMode::Remote));

            let ids: Vec<_> = registry.ids().into_iter().map(|id| id.to_string()).collect();
            assert_eq!(ids, ["b", "a"]);
        }

        #[test]
        fn ranked_reflects_current_scores() {
            let mut registry = Registry::new();
            registry.insert(make("A", ControlMode::Remote).with_score(1));
            registry.insert(make("B", ControlMode::Remote).with_score(2));
            assert_eq!(registry.ranked().next().unwrap().id().as_str(), "B");

            registry.find_mut(&EntityId::new("A")).unwrap().set_score(7);
            let ranked: Vec<_> = registry.ranked().map(|e| e.id().as_str()).collect();
            assert_eq!(ranked, ["A", "B"]);
            assert_eq!(registry.ranked().count(), 2);
        }

        #[test]
        fn ranked_is_stable() {
            let mut registry = Registry::new();
            registry.insert(make("A", ControlMode::Remote).with_score(3));
            registry.insert(make("B", ControlMode::Remote).with_score(5));
            registry.insert(make("C", ControlMode::Remote).with_score(3));

            let ranked: Vec<_> = registry.ranked().map(|e| e.id().as_str()).collect();
            assert_eq!(ranked, ["B", "A", "C"]);

            // Storage order is untouched.
            let ids: Vec<_> = registry.iter().map(|e| e.id().as_str()).collect();
            assert_eq!(ids, ["A", "B", "C"]);
        }
    }
}
