//! Kinematic character controllers driven by per-tick displacement and gravity

use super::colliders::{build_shape, collision_groups, MeshCooker, ResolvedMaterial};
use super::components::{
    CharacterController, ClimbMode, ColliderDescriptor, Colliders, NonWalkableMode,
    PhysicsMaterial,
};
use super::context::PhysicsContext;
use super::convert::{from_vector, to_rotation, to_vector};
use super::lifecycle::RegistryKind;
use super::registry::ControllerHandle;
use super::user_data::{encode_user_data, PhysicsBodyData};
use crate::config::PhysicsSettings;
use crate::core::entity::{EntityId, Scene, Transform};
use crate::error::PhysicsError;
use glam::Vec3;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;
use std::f32::consts::FRAC_PI_2;
use tracing::{debug, trace, warn};

/// Shape used when the entity has no capsule or box collider
const DEFAULT_CAPSULE_RADIUS: f32 = 0.5;
const DEFAULT_CAPSULE_HEIGHT: f32 = 1.0;

/// Result of one controller update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerMove {
    /// Translation actually applied after collision resolution
    pub translation: Vec3,
    pub grounded: bool,
    /// Fall speed after the update
    pub speed_down: f32,
}

/// First capsule or box descriptor on the entity, falling back to a default capsule
fn controller_shape_descriptor(scene: &Scene, entity: EntityId) -> ColliderDescriptor {
    let found = scene.get::<Colliders>(entity).and_then(|colliders| {
        colliders
            .shapes
            .iter()
            .find(|d| matches!(d, ColliderDescriptor::Capsule { .. } | ColliderDescriptor::Box { .. }))
            .cloned()
    });

    found.unwrap_or_else(|| {
        warn!(entity = %entity, "Character controller has no capsule or box collider, using default capsule");
        ColliderDescriptor::capsule(DEFAULT_CAPSULE_RADIUS, DEFAULT_CAPSULE_HEIGHT)
    })
}

/// Copy the descriptor's tunables onto the native controller
pub fn configure_controller(controller: &mut KinematicCharacterController, descriptor: &CharacterController) {
    let slope = descriptor.slope_limit_degrees.clamp(0.0, 90.0).to_radians();

    controller.up = Vector::y_axis();
    controller.offset = CharacterLength::Absolute(descriptor.contact_offset.max(1.0e-4));
    controller.max_slope_climb_angle = slope;
    controller.min_slope_slide_angle = match descriptor.non_walkable_mode {
        NonWalkableMode::PreventClimbing => FRAC_PI_2,
        NonWalkableMode::PreventClimbingAndForceSliding => slope,
    };
    controller.autostep = (descriptor.step_offset > 0.0).then(|| CharacterAutostep {
        max_height: CharacterLength::Absolute(descriptor.step_offset),
        min_width: CharacterLength::Relative(match descriptor.climb_mode {
            ClimbMode::Easy => 0.1,
            ClimbMode::Constrained => 0.5,
        }),
        include_dynamic_bodies: false,
    });
}

/// Create the kinematic controller of `entity`
pub fn create_controller(
    ctx: &mut PhysicsContext,
    scene: &Scene,
    entity: EntityId,
    cooker: &dyn MeshCooker,
) -> Result<RigidBodyHandle, PhysicsError> {
    if let Some(existing) = ctx.registry.controllers.get(&entity) {
        return Ok(existing.body);
    }

    let transform = scene
        .transform(entity)
        .ok_or(PhysicsError::EntityNotFound(entity))?;
    let descriptor = scene
        .get::<CharacterController>(entity)
        .map(|c| (*c).clone())
        .ok_or(PhysicsError::MissingComponent {
            entity,
            component: "CharacterController",
        })?;

    let shape_descriptor = controller_shape_descriptor(scene, entity);
    let shape = build_shape(&shape_descriptor, transform.scale, entity, cooker).ok_or(
        PhysicsError::MissingComponent {
            entity,
            component: "Colliders",
        },
    )?;
    let shape_offset = shape_descriptor.offset();

    let data = ctx.body_data.insert_body(PhysicsBodyData {
        entity,
        scene: ctx.scene,
    });
    let body = ctx.backend.bodies.insert(
        RigidBodyBuilder::kinematic_position_based()
            .translation(to_vector(transform.position + shape_offset))
            .rotation(to_rotation(transform.rotation).scaled_axis())
            .user_data(encode_user_data(data))
            .build(),
    );

    let material = ResolvedMaterial::resolve(
        scene.get::<PhysicsMaterial>(entity).as_deref(),
        &scene.physics.default_material,
    );
    let collider = ColliderBuilder::new(shape)
        .friction(material.friction)
        .restitution(material.restitution)
        .collision_groups(collision_groups(true))
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build();
    let collider = ctx
        .backend
        .colliders
        .insert_with_parent(collider, body, &mut ctx.backend.bodies);

    let mut controller = KinematicCharacterController::default();
    configure_controller(&mut controller, &descriptor);

    ctx.registry.controllers.insert(
        entity,
        ControllerHandle {
            body,
            collider,
            data,
            controller,
            shape_offset,
            grounded: false,
        },
    );
    ctx.lifecycle.mark_active(RegistryKind::Controller, entity);

    debug!(entity = %entity, "Created character controller");
    Ok(body)
}

pub fn destroy_controller(ctx: &mut PhysicsContext, entity: EntityId) -> bool {
    let Some(controller) = ctx.registry.controllers.remove(&entity) else {
        return false;
    };

    ctx.backend.remove_collider(controller.collider);
    ctx.backend.remove_body(controller.body);
    ctx.body_data.remove_body(controller.data);
    ctx.touches.forget(entity);
    ctx.lifecycle.mark_destroyed(RegistryKind::Controller, entity);

    debug!(entity = %entity, "Destroyed character controller");
    true
}

/// Move one controller by `desired` plus accumulated gravity for a tick of `dt`
///
/// Writes the resulting position back to the entity transform and the new
/// fall speed back to the descriptor.
pub fn update_controller(
    ctx: &mut PhysicsContext,
    scene: &mut Scene,
    entity: EntityId,
    desired: Vec3,
    dt: f32,
    settings: &PhysicsSettings,
) -> Result<ControllerMove, PhysicsError> {
    let mut descriptor = scene
        .get::<CharacterController>(entity)
        .map(|c| (*c).clone())
        .ok_or(PhysicsError::MissingComponent {
            entity,
            component: "CharacterController",
        })?;
    let entry = ctx
        .registry
        .controllers
        .get_mut(&entity)
        .ok_or(PhysicsError::EntityNotFound(entity))?;

    configure_controller(&mut entry.controller, &descriptor);

    let gravity_y = settings.gravity.y;
    if !descriptor.disable_gravity {
        descriptor.speed_down -= gravity_y * dt;
    }

    let up = from_vector(&entry.controller.up);
    let movement = desired - up * descriptor.speed_down * dt;

    let backend = &ctx.backend;
    let (Some(body), Some(collider)) = (
        backend.bodies.get(entry.body),
        backend.colliders.get(entry.collider),
    ) else {
        return Err(PhysicsError::EntityNotFound(entity));
    };
    let position = *body.position();

    let corrected = entry.controller.move_shape(
        dt,
        &backend.bodies,
        &backend.colliders,
        &backend.query_pipeline,
        collider.shape(),
        &position,
        to_vector(movement),
        QueryFilter::default()
            .exclude_rigid_body(entry.body)
            .exclude_sensors(),
        |_| {},
    );

    let translation = from_vector(&corrected.translation);
    let new_center = from_vector(&position.translation.vector) + translation;
    let grounded = corrected.grounded;
    entry.grounded = grounded;
    let shape_offset = entry.shape_offset;
    let body_handle = entry.body;

    if let Some(body) = ctx.backend.bodies.get_mut(body_handle) {
        body.set_next_kinematic_translation(to_vector(new_center));
    }

    if grounded {
        descriptor.speed_down = gravity_y * settings.controller_landing_factor;
    }

    if let Some(mut transform) = scene.get_mut::<Transform>(entity) {
        transform.position = new_center - shape_offset;
    }
    if let Some(mut component) = scene.get_mut::<CharacterController>(entity) {
        component.speed_down = descriptor.speed_down;
    }

    trace!(
        entity = %entity,
        ?translation,
        grounded,
        speed_down = descriptor.speed_down,
        "Character controller moved"
    );

    Ok(ControllerMove {
        translation,
        grounded,
        speed_down: descriptor.speed_down,
    })
}

/// Run every registered controller once, consuming queued displacements
pub fn update_controllers(ctx: &mut PhysicsContext, scene: &mut Scene, dt: f32) {
    let settings = scene.physics.clone();
    let mut entities: Vec<EntityId> = ctx.registry.controllers.keys().copied().collect();
    entities.sort();

    for entity in entities {
        let desired = match scene.get_mut::<CharacterController>(entity) {
            Some(mut component) => std::mem::take(&mut component.displacement),
            None => continue,
        };
        if let Err(err) = update_controller(ctx, scene, entity, desired, dt, &settings) {
            warn!(entity = %entity, error = %err, "Character controller update failed");
        }
    }
}
