//! Physics synchronization bridge over Rapier3D
//!
//! Keeps scene entities and their physics components in sync with native
//! rigid bodies, colliders, character controllers and joints, steps the
//! simulation at a fixed rate and routes contacts to scripts.

pub mod accumulator;
pub mod actors;
pub mod backend;
pub mod character;
pub mod colliders;
pub mod components;
pub mod contacts;
pub mod context;
pub mod convert;
pub mod engine;
pub mod joints;
pub mod lifecycle;
pub mod raycast;
pub mod registry;
pub mod stepper;
pub mod user_data;

// Re-export commonly used types
pub use accumulator::PhysicsAccumulator;
pub use backend::PhysicsBackend;
pub use character::ControllerMove;
pub use colliders::{CookedMesh, CookedMeshLibrary, MeshCooker, NoMeshCooker};
pub use components::{
    AxisLocks, BodyKind, CharacterController, ClimbMode, ColliderDescriptor, Colliders,
    CollisionDetectionMode, FixedJoint, MeshColliderMode, NonWalkableMode, PhysicsMaterial,
    RigidBody,
};
pub use contacts::TouchTracker;
pub use context::PhysicsContext;
pub use engine::PhysicsSyncEngine;
pub use lifecycle::{LifecycleState, RegistryKind};
pub use raycast::RaycastHit;
pub use registry::{ActorHandle, ControllerHandle, JointForces, JointHandle};
pub use user_data::{ConstrainedJointData, PhysicsBodyData};

// Re-export commonly used Rapier types
pub use rapier3d::prelude::{ColliderHandle, ImpulseJointHandle, RigidBodyHandle};
