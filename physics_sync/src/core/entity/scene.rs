//! Scene wrapper providing UUID-addressed entity access

use super::components::{EntityId, IdComponent, Transform};
use crate::config::PhysicsSettings;
use hecs::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a scene, stored in native user-data records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub u64);

/// Wrapper around hecs::World that indexes entities by their UUID
///
/// Every entity spawned through the scene carries an `IdComponent` and a
/// `Transform`, so physics code can always resolve and move it.
pub struct Scene {
    id: SceneId,
    world: hecs::World,
    index: HashMap<EntityId, Entity>,
    next_uuid: u64,
    /// Scene-level physics tunables
    pub physics: PhysicsSettings,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a new empty scene with default physics settings
    pub fn new() -> Self {
        Self::with_settings(PhysicsSettings::default())
    }

    /// Create a new empty scene with the given physics settings
    pub fn with_settings(physics: PhysicsSettings) -> Self {
        Self {
            id: SceneId(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed)),
            world: hecs::World::new(),
            index: HashMap::new(),
            next_uuid: 1,
            physics,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Spawn a new entity with a freshly allocated UUID
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> EntityId {
        while self.index.contains_key(&EntityId(self.next_uuid)) {
            self.next_uuid += 1;
        }
        let id = EntityId(self.next_uuid);
        self.next_uuid += 1;
        self.spawn_with_id(id, components)
    }

    /// Spawn a new entity with a caller-chosen UUID
    ///
    /// An existing entity with the same UUID is despawned first.
    pub fn spawn_with_id(&mut self, id: EntityId, components: impl hecs::DynamicBundle) -> EntityId {
        if self.index.contains_key(&id) {
            debug!(entity = %id, "Replacing existing entity with same UUID");
            self.despawn(id);
        }

        let entity = self.world.spawn(components);
        let _ = self.world.insert_one(entity, IdComponent(id));

        // Auto-add Transform if missing
        let has_transform = self
            .world
            .entity(entity)
            .map(|e| e.has::<Transform>())
            .unwrap_or(false);
        if !has_transform {
            let _ = self.world.insert_one(entity, Transform::default());
            debug!(entity = %id, "Auto-added Transform component");
        }

        self.index.insert(id, entity);
        id
    }

    /// Despawn an entity and all its components
    pub fn despawn(&mut self, id: EntityId) -> bool {
        match self.index.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    /// Resolve a UUID to the live hecs entity, if any
    pub fn try_get_entity(&self, id: EntityId) -> Option<Entity> {
        self.index
            .get(&id)
            .copied()
            .filter(|entity| self.world.contains(*entity))
    }

    /// Check if an entity exists
    pub fn contains(&self, id: EntityId) -> bool {
        self.try_get_entity(id).is_some()
    }

    /// Check whether an entity carries a component
    pub fn has<T: hecs::Component>(&self, id: EntityId) -> bool {
        self.try_get_entity(id)
            .and_then(|entity| self.world.entity(entity).ok())
            .map(|entity_ref| entity_ref.has::<T>())
            .unwrap_or(false)
    }

    /// Get a reference to a component on an entity
    pub fn get<T: hecs::Component>(&self, id: EntityId) -> Option<hecs::Ref<'_, T>> {
        let entity = self.try_get_entity(id)?;
        self.world.get::<&T>(entity).ok()
    }

    /// Get a mutable reference to a component on an entity
    pub fn get_mut<T: hecs::Component>(&self, id: EntityId) -> Option<hecs::RefMut<'_, T>> {
        let entity = self.try_get_entity(id)?;
        self.world.get::<&mut T>(entity).ok()
    }

    /// Insert or replace a component on an entity
    pub fn insert_one(&mut self, id: EntityId, component: impl hecs::Component) -> bool {
        match self.try_get_entity(id) {
            Some(entity) => self.world.insert_one(entity, component).is_ok(),
            None => false,
        }
    }

    /// Remove a component from an entity, returning it
    pub fn remove_one<T: hecs::Component>(&mut self, id: EntityId) -> Option<T> {
        let entity = self.try_get_entity(id)?;
        self.world.remove_one::<T>(entity).ok()
    }

    /// World transform of an entity
    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.get::<Transform>(id).map(|t| *t)
    }

    /// Overwrite the world transform of an entity
    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> bool {
        match self.get_mut::<Transform>(id) {
            Some(mut current) => {
                *current = transform;
                true
            }
            None => false,
        }
    }

    /// UUIDs of all entities carrying component `T`
    pub fn entities_with<T: hecs::Component>(&self) -> Vec<EntityId> {
        self.world
            .query::<(&IdComponent, &T)>()
            .iter()
            .map(|(_, (id, _))| id.0)
            .collect()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get access to the inner hecs::World for advanced operations
    pub fn inner(&self) -> &hecs::World {
        &self.world
    }
}
