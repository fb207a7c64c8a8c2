//! Fixed joints between two entities' actors, with force reporting and breaking

use super::context::PhysicsContext;
use super::components::FixedJoint;
use super::convert::{from_vector, to_isometry};
use super::lifecycle::RegistryKind;
use super::registry::{JointForces, JointHandle};
use super::user_data::ConstrainedJointData;
use crate::core::entity::{EntityId, Scene};
use glam::Vec3;
use rapier3d::prelude::*;
use tracing::{debug, info, warn};

/// Create the fixed joint owned by `entity`
///
/// Both the owner and the connected entity must already have an actor or
/// controller. Otherwise nothing is created and `None` is returned; the
/// stepper retries on the next tick.
pub fn create_fixed_joint(
    ctx: &mut PhysicsContext,
    scene: &Scene,
    entity: EntityId,
) -> Option<ImpulseJointHandle> {
    if let Some(existing) = ctx.registry.joints.get(&entity) {
        return Some(existing.joint);
    }

    let descriptor = scene.get::<FixedJoint>(entity).map(|j| (*j).clone())?;
    let connected = descriptor.connected_entity;

    let (Some(owner_body), Some(connected_body)) =
        (ctx.registry.body_of(entity), ctx.registry.body_of(connected))
    else {
        warn!(
            entity = %entity,
            connected = %connected,
            "Fixed joint needs actors on both entities, deferring"
        );
        return None;
    };
    if owner_body == connected_body {
        warn!(entity = %entity, "Fixed joint connects an actor to itself, ignoring");
        return None;
    }

    let (Some(owner_transform), Some(connected_transform)) =
        (scene.transform(entity), scene.transform(connected))
    else {
        return None;
    };

    // Anchor at the owner's origin, expressed in both local frames
    let owner_pose = to_isometry(&owner_transform);
    let connected_pose = to_isometry(&connected_transform);
    let frame2 = connected_pose.inverse() * owner_pose;

    let joint = FixedJointBuilder::new()
        .local_frame1(Isometry::identity())
        .local_frame2(frame2)
        .contacts_enabled(descriptor.enable_collision);
    let handle = ctx
        .backend
        .impulse_joints
        .insert(owner_body, connected_body, joint, true);

    let data = ctx.body_data.insert_joint(ConstrainedJointData {
        entity,
        is_broken: false,
    });
    ctx.registry.joints.insert(
        entity,
        JointHandle {
            joint: handle,
            data,
            connected_entity: connected,
        },
    );
    ctx.registry
        .last_joint_forces
        .insert(handle, JointForces::default());
    ctx.lifecycle.mark_active(RegistryKind::Joint, entity);

    debug!(
        entity = %entity,
        connected = %connected,
        break_force = descriptor.break_force,
        break_torque = descriptor.break_torque,
        collision = descriptor.enable_collision,
        "Created fixed joint"
    );

    Some(handle)
}

/// Remove the joint owned by `entity` and free its record
pub fn destroy_fixed_joint(ctx: &mut PhysicsContext, entity: EntityId) -> bool {
    let Some(joint) = ctx.registry.joints.remove(&entity) else {
        return false;
    };

    ctx.backend.remove_joint(joint.joint);
    ctx.registry.last_joint_forces.remove(&joint.joint);
    ctx.body_data.remove_joint(joint.data);
    ctx.lifecycle.mark_destroyed(RegistryKind::Joint, entity);

    debug!(entity = %entity, "Destroyed fixed joint");
    true
}

pub fn is_constraint_broken(ctx: &PhysicsContext, entity: EntityId) -> bool {
    ctx.registry
        .joints
        .get(&entity)
        .and_then(|joint| ctx.body_data.joint(joint.data))
        .is_some_and(|data| data.is_broken)
}

/// Mark the joint broken and stop it from constraining its bodies
///
/// The joint stays registered until its owner is destroyed.
pub fn break_joint(ctx: &mut PhysicsContext, entity: EntityId) -> bool {
    let Some(joint) = ctx.registry.joints.get(&entity).copied() else {
        return false;
    };
    let Some(data) = ctx.body_data.joint_mut(joint.data) else {
        return false;
    };
    if data.is_broken {
        return true;
    }
    data.is_broken = true;

    let bodies = ctx.backend.joint_mut(joint.joint).map(|native| {
        native.data.set_enabled(false);
        (native.body1, native.body2)
    });
    if let Some((body1, body2)) = bodies {
        ctx.backend.wake_up(body1);
        ctx.backend.wake_up(body2);
    }

    info!(entity = %entity, "Fixed joint broken");
    true
}

pub fn last_reported_forces(ctx: &PhysicsContext, joint: ImpulseJointHandle) -> Option<JointForces> {
    ctx.registry.last_joint_forces.get(&joint).copied()
}

/// Cache the constraint force of every joint after a step and break the
/// ones whose force or torque exceeded their thresholds
pub fn update_joints(ctx: &mut PhysicsContext, scene: &Scene, dt: f32) {
    if dt <= 0.0 {
        return;
    }

    let mut to_break = Vec::new();
    for (entity, joint) in &ctx.registry.joints {
        let Some(native) = ctx.backend.impulse_joints.get(joint.joint) else {
            continue;
        };
        let impulses = native.impulses;
        let forces = JointForces {
            linear: Vec3::new(impulses[0], impulses[1], impulses[2]) / dt,
            angular: Vec3::new(impulses[3], impulses[4], impulses[5]) / dt,
        };
        ctx.registry.last_joint_forces.insert(joint.joint, forces);

        if is_constraint_broken(ctx, *entity) {
            continue;
        }
        if let Some(descriptor) = scene.get::<FixedJoint>(*entity) {
            if forces.linear.length() > descriptor.break_force
                || forces.angular.length() > descriptor.break_torque
            {
                to_break.push(*entity);
            }
        }
    }

    for entity in to_break {
        debug!(entity = %entity, "Joint force exceeded break threshold");
        break_joint(ctx, entity);
    }
}

/// Anchor of a joint in world space as seen from the owner body
pub fn joint_anchor(ctx: &PhysicsContext, entity: EntityId) -> Option<Vec3> {
    let joint = ctx.registry.joints.get(&entity)?;
    let native = ctx.backend.impulse_joints.get(joint.joint)?;
    let body = ctx.backend.bodies.get(native.body1)?;
    let anchor = body.position() * native.data.local_frame1;
    Some(from_vector(&anchor.translation.vector))
}
