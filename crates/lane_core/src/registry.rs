//! Entity registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::{AttackableEntity, EntityId};

/// Storage for all entities in the battle.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRegistry {
    /// Map of entity ID to entity data.
    entities: HashMap<EntityId, AttackableEntity>,
    /// Next entity ID to assign.
    next_id: EntityId,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    ///
    /// IDs are handed out from a monotonic counter, so an ID is never
    /// reused even after its entity has been removed.
    pub fn insert(&mut self, mut entity: AttackableEntity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<AttackableEntity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&AttackableEntity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut AttackableEntity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities in ascending ID order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &AttackableEntity> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.entities.get(&id))
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CastleMaster, CastleTypeId};
    use crate::entity::Side;

    fn castle() -> AttackableEntity {
        AttackableEntity::castle(
            &CastleMaster {
                id: CastleTypeId(1),
                name: "castle".to_string(),
                max_health: 10,
            },
            Side::Player,
        )
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut registry = EntityRegistry::new();
        assert_eq!(registry.insert(castle()), 1);
        assert_eq!(registry.insert(castle()), 2);
        assert_eq!(registry.get(2).map(|e| e.id), Some(2));
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut registry = EntityRegistry::new();
        let first = registry.insert(castle());
        assert!(registry.remove(first).is_some());
        assert!(!registry.contains(first));
        assert_eq!(registry.insert(castle()), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sorted_iteration() {
        let mut registry = EntityRegistry::new();
        for _ in 0..10 {
            registry.insert(castle());
        }
        registry.remove(4);
        let ids: Vec<_> = registry.iter_sorted().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 5, 6, 7, 8, 9, 10]);
    }
}
