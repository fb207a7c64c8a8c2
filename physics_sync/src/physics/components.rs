//! Physics components for the entity system
//!
//! These are the descriptors the bridge reads every tick. Runtime-only state
//! (accumulated fall speed, pending controller displacement) is skipped when
//! serializing.

use crate::core::entity::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Whether a body is immovable or simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BodyKind {
    #[default]
    Static,
    Dynamic,
}

/// Collision detection strategy for fast-moving dynamic bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CollisionDetectionMode {
    #[default]
    Discrete,
    Continuous,
    ContinuousSpeculative,
}

bitflags::bitflags! {
    /// Locked degrees of freedom, same bit layout as Rapier's `LockedAxes`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AxisLocks: u8 {
        const TRANSLATION_X = 1 << 0;
        const TRANSLATION_Y = 1 << 1;
        const TRANSLATION_Z = 1 << 2;
        const ROTATION_X = 1 << 3;
        const ROTATION_Y = 1 << 4;
        const ROTATION_Z = 1 << 5;
        const ALL_TRANSLATION = Self::TRANSLATION_X.bits() | Self::TRANSLATION_Y.bits() | Self::TRANSLATION_Z.bits();
        const ALL_ROTATION = Self::ROTATION_X.bits() | Self::ROTATION_Y.bits() | Self::ROTATION_Z.bits();
    }
}

impl Default for AxisLocks {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rigid body descriptor
///
/// Velocities use a don't-touch convention: a zero component leaves the
/// backend's current value for that axis untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RigidBody {
    /// Static or dynamic; changing it at runtime requires re-creating the actor
    pub kind: BodyKind,
    /// Mass in kilograms
    pub mass: f32,
    pub linear_velocity: Vec3,
    /// Linear damping coefficient
    pub linear_drag: f32,
    pub angular_velocity: Vec3,
    /// Angular damping coefficient
    pub angular_drag: f32,
    pub disable_gravity: bool,
    /// Kinematic bodies follow the entity transform instead of being simulated
    pub is_kinematic: bool,
    pub collision_detection: CollisionDetectionMode,
    pub axis_locks: AxisLocks,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            kind: BodyKind::Static,
            mass: 1.0,
            linear_velocity: Vec3::ZERO,
            linear_drag: 0.01,
            angular_velocity: Vec3::ZERO,
            angular_drag: 0.05,
            disable_gravity: false,
            is_kinematic: false,
            collision_detection: CollisionDetectionMode::Discrete,
            axis_locks: AxisLocks::empty(),
        }
    }
}

impl RigidBody {
    /// Create a static (immovable) body
    pub fn fixed() -> Self {
        Self::default()
    }

    /// Create a dynamic body with the given mass
    pub fn dynamic(mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass,
            ..Default::default()
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }
}

/// How mesh collider geometry is built from the cooked mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MeshColliderMode {
    /// Convex hull of the submesh vertices
    #[default]
    Convex,
    /// Exact triangle mesh
    Triangle,
}

/// One collision volume attached to an entity's actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderDescriptor {
    Box {
        half_size: Vec3,
        offset: Vec3,
        is_trigger: bool,
    },
    Sphere {
        radius: f32,
        offset: Vec3,
        is_trigger: bool,
    },
    /// Y-aligned capsule; `height` is the length of the cylindrical section
    Capsule {
        radius: f32,
        height: f32,
        offset: Vec3,
        is_trigger: bool,
    },
    Mesh {
        submesh_index: u32,
        mode: MeshColliderMode,
        is_trigger: bool,
    },
}

impl ColliderDescriptor {
    pub fn cuboid(half_size: Vec3) -> Self {
        Self::Box {
            half_size,
            offset: Vec3::ZERO,
            is_trigger: false,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            radius,
            offset: Vec3::ZERO,
            is_trigger: false,
        }
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self::Capsule {
            radius,
            height,
            offset: Vec3::ZERO,
            is_trigger: false,
        }
    }

    pub fn mesh(submesh_index: u32, mode: MeshColliderMode) -> Self {
        Self::Mesh {
            submesh_index,
            mode,
            is_trigger: false,
        }
    }

    /// Shift the shape relative to the entity origin
    pub fn with_offset(mut self, new_offset: Vec3) -> Self {
        match &mut self {
            Self::Box { offset, .. } | Self::Sphere { offset, .. } | Self::Capsule { offset, .. } => {
                *offset = new_offset;
            }
            Self::Mesh { .. } => {}
        }
        self
    }

    /// Turn this shape into an overlap-only trigger
    pub fn as_trigger(mut self) -> Self {
        match &mut self {
            Self::Box { is_trigger, .. }
            | Self::Sphere { is_trigger, .. }
            | Self::Capsule { is_trigger, .. }
            | Self::Mesh { is_trigger, .. } => *is_trigger = true,
        }
        self
    }

    pub fn is_trigger(&self) -> bool {
        match self {
            Self::Box { is_trigger, .. }
            | Self::Sphere { is_trigger, .. }
            | Self::Capsule { is_trigger, .. }
            | Self::Mesh { is_trigger, .. } => *is_trigger,
        }
    }

    /// Local offset of the shape center from the entity origin
    pub fn offset(&self) -> Vec3 {
        match self {
            Self::Box { offset, .. } | Self::Sphere { offset, .. } | Self::Capsule { offset, .. } => {
                *offset
            }
            Self::Mesh { .. } => Vec3::ZERO,
        }
    }
}

/// Collider component holding every shape of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Colliders {
    pub shapes: Vec<ColliderDescriptor>,
}

impl Colliders {
    pub fn new(shapes: Vec<ColliderDescriptor>) -> Self {
        Self { shapes }
    }

    pub fn single(shape: ColliderDescriptor) -> Self {
        Self {
            shapes: vec![shape],
        }
    }
}

/// Physics material properties
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhysicsMaterial {
    /// Static friction coefficient
    ///
    /// Kept for authoring only. Rapier has a single friction coefficient per
    /// collider, which is taken from `dynamic_friction`.
    pub static_friction: f32,
    /// Friction coefficient applied to the native colliders
    pub dynamic_friction: f32,
    /// Restitution (bounciness) coefficient
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            static_friction: 0.6,
            dynamic_friction: 0.6,
            restitution: 0.0,
        }
    }
}

/// What a controller does on slopes steeper than its slope limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NonWalkableMode {
    #[default]
    PreventClimbing,
    PreventClimbingAndForceSliding,
}

/// How eagerly a controller steps onto obstacles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClimbMode {
    #[default]
    Easy,
    Constrained,
}

/// Kinematic character controller descriptor
///
/// The controller takes its shape from the entity's first capsule or box
/// collider. `speed_down` is integration state owned by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CharacterController {
    pub non_walkable_mode: NonWalkableMode,
    pub climb_mode: ClimbMode,
    pub slope_limit_degrees: f32,
    pub step_offset: f32,
    pub contact_offset: f32,
    pub disable_gravity: bool,
    /// Accumulated fall speed in m/s
    #[serde(skip)]
    pub speed_down: f32,
    /// Displacement requested by gameplay for the next tick
    #[serde(skip)]
    pub displacement: Vec3,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            non_walkable_mode: NonWalkableMode::PreventClimbing,
            climb_mode: ClimbMode::Easy,
            slope_limit_degrees: 45.0,
            step_offset: 0.3,
            contact_offset: 0.01,
            disable_gravity: false,
            speed_down: 0.0,
            displacement: Vec3::ZERO,
        }
    }
}

impl CharacterController {
    /// Queue a displacement for the next fixed tick
    pub fn request_move(&mut self, displacement: Vec3) {
        self.displacement += displacement;
    }
}

/// Rigid constraint from this entity to `connected_entity`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedJoint {
    pub connected_entity: EntityId,
    /// Linear force above which the joint breaks
    pub break_force: f32,
    /// Torque above which the joint breaks
    pub break_torque: f32,
    /// Allow the two linked bodies to collide with each other
    pub enable_collision: bool,
    pub enable_pre_processing: bool,
}

impl FixedJoint {
    /// An unbreakable joint to `connected_entity`
    pub fn new(connected_entity: EntityId) -> Self {
        Self {
            connected_entity,
            break_force: f32::MAX,
            break_torque: f32::MAX,
            enable_collision: false,
            enable_pre_processing: true,
        }
    }

    pub fn with_break_thresholds(mut self, force: f32, torque: f32) -> Self {
        self.break_force = force;
        self.break_torque = torque;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigidbody_serialization() {
        let rb = RigidBody {
            linear_velocity: Vec3::new(0.0, 3.0, 0.0),
            axis_locks: AxisLocks::ROTATION_X | AxisLocks::ROTATION_Z,
            ..RigidBody::dynamic(4.0)
        };

        let json = serde_json::to_string(&rb).unwrap();
        let deserialized: RigidBody = serde_json::from_str(&json).unwrap();
        assert_eq!(rb, deserialized);
    }

    #[test]
    fn test_controller_runtime_state_not_serialized() {
        let mut controller = CharacterController {
            speed_down: 4.2,
            ..Default::default()
        };
        controller.request_move(Vec3::X);

        let json = serde_json::to_string(&controller).unwrap();
        let deserialized: CharacterController = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.speed_down, 0.0);
        assert_eq!(deserialized.displacement, Vec3::ZERO);
        assert_eq!(deserialized.slope_limit_degrees, controller.slope_limit_degrees);
    }

    #[test]
    fn test_axis_locks() {
        let locks = AxisLocks::TRANSLATION_Y | AxisLocks::ROTATION_X;
        assert!(locks.contains(AxisLocks::TRANSLATION_Y));
        assert!(!locks.contains(AxisLocks::TRANSLATION_X));
        assert!(AxisLocks::default().is_empty());
        assert_eq!(AxisLocks::ALL_TRANSLATION | AxisLocks::ALL_ROTATION, AxisLocks::all());
        assert_eq!(AxisLocks::all().bits(), 0b111_111);
    }

    #[test]
    fn test_axis_locks_match_backend_layout() {
        use rapier3d::prelude::LockedAxes;

        let locks = AxisLocks::TRANSLATION_Y | AxisLocks::ROTATION_X | AxisLocks::ROTATION_Z;
        let native = LockedAxes::from_bits_truncate(locks.bits());
        assert_eq!(
            native,
            LockedAxes::TRANSLATION_LOCKED_Y | LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z
        );

        let json = serde_json::to_string(&locks).unwrap();
        let deserialized: AxisLocks = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, locks);
    }

    #[test]
    fn test_collider_descriptor_builders() {
        let capsule = ColliderDescriptor::capsule(0.5, 1.0)
            .with_offset(Vec3::new(0.0, 1.0, 0.0))
            .as_trigger();
        assert!(capsule.is_trigger());
        assert_eq!(capsule.offset(), Vec3::new(0.0, 1.0, 0.0));

        let mesh = ColliderDescriptor::mesh(2, MeshColliderMode::Triangle).with_offset(Vec3::X);
        assert_eq!(mesh.offset(), Vec3::ZERO);
        assert!(!mesh.is_trigger());
    }
}
