//! UUID-keyed registries of native physics objects for one simulating scene

use super::components::BodyKind;
use super::user_data::{BodyDataKey, JointDataKey};
use crate::core::entity::EntityId;
use glam::Vec3;
use rapier3d::control::KinematicCharacterController;
use rapier3d::prelude::{ColliderHandle, ImpulseJointHandle, RigidBodyHandle};
use std::collections::HashMap;

/// Native actor created for an entity with a `RigidBody`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorHandle {
    pub body: RigidBodyHandle,
    pub data: BodyDataKey,
    pub kind: BodyKind,
    /// Mass last pushed to the colliders, to skip needless recomputation
    pub applied_mass: Option<f32>,
}

/// Native kinematic controller created for an entity with a `CharacterController`
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub data: BodyDataKey,
    pub controller: KinematicCharacterController,
    /// Local offset of the controller shape from the entity origin
    pub shape_offset: Vec3,
    /// Ground flag reported by the last move
    pub grounded: bool,
}

/// Native fixed joint owned by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointHandle {
    pub joint: ImpulseJointHandle,
    pub data: JointDataKey,
    pub connected_entity: EntityId,
}

/// Constraint force and torque reported for a joint after a step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointForces {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// All entity → native object maps of one simulation run
#[derive(Debug, Default)]
pub struct PhysicsRegistry {
    pub actors: HashMap<EntityId, ActorHandle>,
    pub controllers: HashMap<EntityId, ControllerHandle>,
    pub joints: HashMap<EntityId, JointHandle>,
    pub colliders: HashMap<EntityId, Vec<ColliderHandle>>,
    pub last_joint_forces: HashMap<ImpulseJointHandle, JointForces>,
}

impl PhysicsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(&self, entity: EntityId) -> Option<&ActorHandle> {
        self.actors.get(&entity)
    }

    /// Body handle of an entity's actor or, failing that, its controller
    pub fn body_of(&self, entity: EntityId) -> Option<RigidBodyHandle> {
        self.actors
            .get(&entity)
            .map(|actor| actor.body)
            .or_else(|| self.controllers.get(&entity).map(|c| c.body))
    }

    pub fn collider_handles(&self, entity: EntityId) -> &[ColliderHandle] {
        self.colliders
            .get(&entity)
            .map(|handles| handles.as_slice())
            .unwrap_or(&[])
    }

    /// Entities whose fixed joint links to `entity`, excluding its own joint
    pub fn joints_connected_to(&self, entity: EntityId) -> Vec<EntityId> {
        let mut owners: Vec<EntityId> = self
            .joints
            .iter()
            .filter(|(owner, joint)| joint.connected_entity == entity && **owner != entity)
            .map(|(owner, _)| *owner)
            .collect();
        owners.sort();
        owners
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
            && self.controllers.is_empty()
            && self.joints.is_empty()
            && self.colliders.is_empty()
    }

    pub fn clear(&mut self) {
        self.actors.clear();
        self.controllers.clear();
        self.joints.clear();
        self.colliders.clear();
        self.last_joint_forces.clear();
    }
}
