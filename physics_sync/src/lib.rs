//! Physics synchronization bridge for an ECS scene
//!
//! This crate keeps entities in sync with a Rapier3D simulation: rigid
//! actors, colliders, character controllers and fixed joints are created
//! from components, stepped at a fixed rate, and contacts, triggers and
//! raycasts are reported back to entity scripts.

pub mod config;
pub mod core;
pub mod error;
pub mod physics;
pub mod scripting;

// Re-export commonly used types
pub mod prelude {
    // Entity system types
    pub use crate::core::entity::{EntityId, IdComponent, Scene, SceneId, Transform};

    // Math types
    pub use glam::{Quat, Vec3};

    // Config types
    pub use crate::config::{AssetConfig, MaterialSettings, PhysicsSettings};

    // Error types
    pub use crate::error::{PhysicsError, ScriptError};

    // Scripting types
    pub use crate::scripting::{NoScriptHooks, ScriptEngine, ScriptHook, ScriptHooks, ScriptRef};

    // Physics types
    pub use crate::physics::{
        AxisLocks, BodyKind, CharacterController, ClimbMode, ColliderDescriptor, Colliders,
        CollisionDetectionMode, FixedJoint, MeshColliderMode, NonWalkableMode, PhysicsMaterial,
        PhysicsSyncEngine, RaycastHit, RigidBody,
    };
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize logging for tests; safe to call more than once
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
