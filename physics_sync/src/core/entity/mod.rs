//! Scene-side entity access consumed by the physics bridge
//!
//! The ECS itself is external; this module provides the UUID-addressed
//! scene boundary (component queries, get/has/add, transform access) that
//! the physics code depends on.

pub mod components;
pub mod scene;

pub use components::{EntityId, IdComponent, Transform};
pub use scene::{Scene, SceneId};

// Re-export hecs types that users will need
pub use hecs::Entity;
