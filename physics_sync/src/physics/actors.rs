//! Actor lifecycle: native rigid bodies created from and torn down for entities

use super::character;
use super::colliders::{
    attach_colliders, collision_groups, detach_colliders, MeshCooker, ResolvedMaterial,
};
use super::components::{BodyKind, CollisionDetectionMode, Colliders, PhysicsMaterial, RigidBody};
use super::context::PhysicsContext;
use super::convert::{to_isometry, to_vector};
use super::joints;
use super::lifecycle::RegistryKind;
use super::registry::ActorHandle;
use super::user_data::{encode_user_data, PhysicsBodyData};
use crate::config::PhysicsSettings;
use crate::core::entity::{EntityId, Scene};
use crate::error::PhysicsError;
use rapier3d::prelude::*;
use tracing::{debug, warn};

/// Create the native actor for `entity` and register it
///
/// Dynamic actors get the full dynamic property set applied before this
/// returns. Calling this for an entity that already has an actor returns
/// the existing body.
pub fn create_actor(
    ctx: &mut PhysicsContext,
    scene: &Scene,
    entity: EntityId,
    cooker: &dyn MeshCooker,
) -> Result<RigidBodyHandle, PhysicsError> {
    if let Some(existing) = ctx.registry.actor(entity) {
        debug!(entity = %entity, "Actor already exists");
        return Ok(existing.body);
    }

    let transform = scene
        .transform(entity)
        .ok_or(PhysicsError::EntityNotFound(entity))?;
    let descriptor = scene
        .get::<RigidBody>(entity)
        .map(|rb| (*rb).clone())
        .ok_or(PhysicsError::MissingComponent {
            entity,
            component: "RigidBody",
        })?;

    let data = ctx.body_data.insert_body(PhysicsBodyData {
        entity,
        scene: ctx.scene,
    });

    let builder = match descriptor.kind {
        BodyKind::Static => RigidBodyBuilder::fixed(),
        BodyKind::Dynamic if descriptor.is_kinematic => RigidBodyBuilder::kinematic_position_based(),
        BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
    };
    let body = ctx.backend.bodies.insert(
        builder
            .position(to_isometry(&transform))
            .user_data(encode_user_data(data))
            .build(),
    );

    let shapes = scene
        .get::<Colliders>(entity)
        .map(|c| c.shapes.clone())
        .unwrap_or_default();
    let material = ResolvedMaterial::resolve(
        scene.get::<PhysicsMaterial>(entity).as_deref(),
        &scene.physics.default_material,
    );
    let handles = attach_colliders(
        &mut ctx.backend,
        body,
        entity,
        &shapes,
        transform.scale,
        material,
        collision_groups(descriptor.is_dynamic()),
        cooker,
    );

    let mut actor = ActorHandle {
        body,
        data,
        kind: descriptor.kind,
        applied_mass: None,
    };
    if descriptor.is_dynamic() {
        apply_dynamic_properties(ctx, &mut actor, &descriptor, &scene.physics);
    }

    ctx.registry.actors.insert(entity, actor);
    ctx.registry.colliders.insert(entity, handles);
    ctx.lifecycle.mark_active(RegistryKind::Actor, entity);

    debug!(
        entity = %entity,
        kind = ?descriptor.kind,
        kinematic = descriptor.is_kinematic,
        "Created physics actor"
    );

    Ok(body)
}

/// Tear down every native object of `entity`
///
/// Order: joints referencing the entity, its own joint, its controller,
/// its colliders, the actor itself, then the user-data record.
/// Returns whether an actor existed.
pub fn destroy_actor(ctx: &mut PhysicsContext, entity: EntityId) -> bool {
    for owner in ctx.registry.joints_connected_to(entity) {
        joints::destroy_fixed_joint(ctx, owner);
        // The owner still carries its joint component; retry once both sides exist again
        ctx.lifecycle.mark_pending(RegistryKind::Joint, owner);
    }
    joints::destroy_fixed_joint(ctx, entity);
    character::destroy_controller(ctx, entity);

    let Some(actor) = ctx.registry.actors.remove(&entity) else {
        return false;
    };

    let handles = ctx.registry.colliders.remove(&entity).unwrap_or_default();
    detach_colliders(&mut ctx.backend, &handles);

    if !ctx.backend.remove_body(actor.body) {
        warn!(entity = %entity, "Actor body was already removed from the backend");
    }
    if ctx.body_data.remove_body(actor.data).is_none() {
        warn!(entity = %entity, "Actor user-data was already freed");
    }
    ctx.touches.forget(entity);
    ctx.lifecycle.mark_destroyed(RegistryKind::Actor, entity);

    debug!(entity = %entity, colliders = handles.len(), "Destroyed physics actor");
    true
}

/// Destroy and create again, e.g. after the body kind changed
pub fn recreate_actor(
    ctx: &mut PhysicsContext,
    scene: &Scene,
    entity: EntityId,
    cooker: &dyn MeshCooker,
) -> Result<RigidBodyHandle, PhysicsError> {
    destroy_actor(ctx, entity);
    create_actor(ctx, scene, entity, cooker)
}

/// Push the descriptor's dynamic properties into the native body
///
/// Velocity axes that are zero in the descriptor keep the backend value.
/// Mass and inertia are recomputed only when the mass changed.
pub fn apply_dynamic_properties(
    ctx: &mut PhysicsContext,
    actor: &mut ActorHandle,
    descriptor: &RigidBody,
    settings: &PhysicsSettings,
) {
    let backend = &mut ctx.backend;
    let Some(body) = backend.bodies.get_mut(actor.body) else {
        warn!(handle = ?actor.body, "Dynamic properties applied to a missing body");
        return;
    };

    let body_type = if descriptor.is_kinematic {
        RigidBodyType::KinematicPositionBased
    } else {
        RigidBodyType::Dynamic
    };
    if body.body_type() != body_type {
        body.set_body_type(body_type, true);
    }

    let gravity_scale = if descriptor.disable_gravity { 0.0 } else { 1.0 };
    if body.gravity_scale() != gravity_scale {
        body.set_gravity_scale(gravity_scale, true);
    }

    if actor.applied_mass != Some(descriptor.mass) {
        let solid: Vec<ColliderHandle> = body
            .colliders()
            .iter()
            .copied()
            .filter(|h| backend.colliders.get(*h).is_some_and(|c| !c.is_sensor()))
            .collect();

        if solid.is_empty() {
            body.set_additional_mass(descriptor.mass, true);
        } else {
            let share = descriptor.mass / solid.len() as f32;
            for handle in &solid {
                if let Some(collider) = backend.colliders.get_mut(*handle) {
                    collider.set_mass(share);
                }
            }
            body.set_additional_mass(0.0, true);
        }
        body.recompute_mass_properties_from_colliders(&backend.colliders);
        actor.applied_mass = Some(descriptor.mass);
    }

    if !descriptor.is_kinematic {
        let mut linvel = *body.linvel();
        let mut angvel = *body.angvel();
        for axis in 0..3 {
            if descriptor.linear_velocity[axis] != 0.0 {
                linvel[axis] = descriptor.linear_velocity[axis];
            }
            if descriptor.angular_velocity[axis] != 0.0 {
                angvel[axis] = descriptor.angular_velocity[axis];
            }
        }
        if linvel != *body.linvel() {
            body.set_linvel(linvel, true);
        }
        if angvel != *body.angvel() {
            body.set_angvel(angvel, true);
        }
    }

    body.set_linear_damping(descriptor.linear_drag);
    body.set_angular_damping(descriptor.angular_drag);

    let locks = LockedAxes::from_bits_truncate(descriptor.axis_locks.bits());
    if body.locked_axes() != locks {
        body.set_locked_axes(locks, true);
    }

    match descriptor.collision_detection {
        CollisionDetectionMode::Discrete => {
            body.enable_ccd(false);
            body.set_soft_ccd_prediction(0.0);
        }
        CollisionDetectionMode::Continuous => {
            body.enable_ccd(true);
            body.set_soft_ccd_prediction(0.0);
        }
        CollisionDetectionMode::ContinuousSpeculative => {
            body.enable_ccd(false);
            body.set_soft_ccd_prediction(settings.soft_ccd_prediction);
        }
    }
}

/// Push the entity transform into a static or kinematic actor
pub fn push_transform(ctx: &mut PhysicsContext, scene: &Scene, entity: EntityId) {
    let Some(actor) = ctx.registry.actor(entity).copied() else {
        return;
    };
    let Some(transform) = scene.transform(entity) else {
        return;
    };
    let Some(body) = ctx.backend.bodies.get_mut(actor.body) else {
        return;
    };

    let pose = to_isometry(&transform);
    if body.is_kinematic() {
        body.set_next_kinematic_position(pose);
    } else if *body.position() != pose {
        body.set_position(pose, true);
    }
}

/// Wake up the actor of one entity
pub fn wake_up_actor(ctx: &mut PhysicsContext, entity: EntityId) -> bool {
    match ctx.registry.body_of(entity) {
        Some(body) => ctx.backend.wake_up(body),
        None => false,
    }
}

/// Wake up every dynamic actor, returning how many were woken
pub fn wake_up_actors(ctx: &mut PhysicsContext) -> usize {
    let bodies: Vec<RigidBodyHandle> = ctx
        .registry
        .actors
        .values()
        .filter(|actor| actor.kind == BodyKind::Dynamic)
        .map(|actor| actor.body)
        .collect();

    bodies
        .into_iter()
        .filter(|body| ctx.backend.wake_up(*body))
        .count()
}

/// Apply a linear impulse to a dynamic actor
pub fn apply_impulse(ctx: &mut PhysicsContext, entity: EntityId, impulse: glam::Vec3) -> bool {
    let Some(actor) = ctx.registry.actor(entity) else {
        return false;
    };
    match ctx.backend.bodies.get_mut(actor.body) {
        Some(body) if body.is_dynamic() => {
            body.apply_impulse(to_vector(impulse), true);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Transform;
    use crate::physics::colliders::NoMeshCooker;
    use crate::physics::components::{AxisLocks, ColliderDescriptor};
    use glam::Vec3;

    fn context(scene: &Scene) -> PhysicsContext {
        PhysicsContext::new(scene.id(), &scene.physics)
    }

    fn spawn_dynamic(scene: &mut Scene, rb: RigidBody) -> EntityId {
        scene.spawn((
            Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
            rb,
            Colliders::single(ColliderDescriptor::sphere(0.5)),
        ))
    }

    #[test]
    fn test_create_registers_actor_and_user_data() {
        let mut scene = Scene::new();
        let entity = spawn_dynamic(&mut scene, RigidBody::dynamic(2.0));
        let mut ctx = context(&scene);

        let body = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();

        let native = &ctx.backend.bodies[body];
        assert!(native.is_dynamic());
        assert_eq!(ctx.body_data.resolve(native.user_data).unwrap().entity, entity);
        assert_eq!(ctx.registry.collider_handles(entity).len(), 1);
        assert!((native.mass() - 2.0).abs() < 1e-4);
        assert!(ctx.lifecycle.is_active(RegistryKind::Actor, entity));
    }

    #[test]
    fn test_create_without_rigid_body_fails() {
        let mut scene = Scene::new();
        let entity = scene.spawn(());
        let mut ctx = context(&scene);

        let result = create_actor(&mut ctx, &scene, entity, &NoMeshCooker);
        assert!(matches!(result, Err(PhysicsError::MissingComponent { .. })));
        assert_eq!(ctx.body_data.body_count(), 0);
    }

    #[test]
    fn test_create_is_idempotent() {
        let mut scene = Scene::new();
        let entity = spawn_dynamic(&mut scene, RigidBody::dynamic(1.0));
        let mut ctx = context(&scene);

        let first = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();
        let second = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();

        assert_eq!(first, second);
        assert_eq!(ctx.backend.bodies.len(), 1);
    }

    #[test]
    fn test_destroy_frees_everything() {
        let mut scene = Scene::new();
        let entity = spawn_dynamic(&mut scene, RigidBody::dynamic(1.0));
        let mut ctx = context(&scene);
        create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();

        assert!(destroy_actor(&mut ctx, entity));
        assert!(ctx.backend.bodies.is_empty());
        assert!(ctx.backend.colliders.is_empty());
        assert_eq!(ctx.body_data.body_count(), 0);
        assert!(ctx.registry.is_empty());
        assert!(!destroy_actor(&mut ctx, entity));
    }

    #[test]
    fn test_velocity_zero_axes_keep_backend_value() {
        let mut scene = Scene::new();
        let entity = spawn_dynamic(&mut scene, RigidBody::dynamic(1.0));
        let mut ctx = context(&scene);
        let body = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();
        ctx.backend.bodies[body].set_linvel(vector![3.0, 1.0, 4.0], true);

        let mut descriptor = RigidBody::dynamic(1.0);
        descriptor.linear_velocity = Vec3::new(0.0, 7.0, 0.0);
        let mut actor = *ctx.registry.actor(entity).unwrap();
        apply_dynamic_properties(&mut ctx, &mut actor, &descriptor, &scene.physics);

        assert_eq!(*ctx.backend.bodies[body].linvel(), vector![3.0, 7.0, 4.0]);
    }

    #[test]
    fn test_dynamic_flags() {
        let mut scene = Scene::new();
        let mut rb = RigidBody::dynamic(1.0);
        rb.disable_gravity = true;
        rb.axis_locks = AxisLocks::ALL_ROTATION;
        rb.collision_detection = CollisionDetectionMode::Continuous;
        let entity = spawn_dynamic(&mut scene, rb);
        let mut ctx = context(&scene);

        let body = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();
        let native = &ctx.backend.bodies[body];

        assert_eq!(native.gravity_scale(), 0.0);
        assert_eq!(native.locked_axes(), LockedAxes::ROTATION_LOCKED);
        assert!(native.is_ccd_enabled());
    }

    #[test]
    fn test_kinematic_dynamic_body() {
        let mut scene = Scene::new();
        let mut rb = RigidBody::dynamic(1.0);
        rb.is_kinematic = true;
        let entity = spawn_dynamic(&mut scene, rb);
        let mut ctx = context(&scene);

        let body = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();
        assert!(ctx.backend.bodies[body].is_kinematic());
    }

    #[test]
    fn test_static_actor_follows_transform() {
        let mut scene = Scene::new();
        let entity = scene.spawn((RigidBody::fixed(),));
        let mut ctx = context(&scene);
        let body = create_actor(&mut ctx, &scene, entity, &NoMeshCooker).unwrap();

        scene.set_transform(entity, Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        push_transform(&mut ctx, &scene, entity);

        assert_eq!(ctx.backend.bodies[body].translation().x, 5.0);
    }

    #[test]
    fn test_wake_up_actors_counts_dynamic_only() {
        let mut scene = Scene::new();
        let dynamic = spawn_dynamic(&mut scene, RigidBody::dynamic(1.0));
        let fixed = scene.spawn((RigidBody::fixed(),));
        let mut ctx = context(&scene);
        create_actor(&mut ctx, &scene, dynamic, &NoMeshCooker).unwrap();
        create_actor(&mut ctx, &scene, fixed, &NoMeshCooker).unwrap();

        assert_eq!(wake_up_actors(&mut ctx), 1);
        assert!(wake_up_actor(&mut ctx, fixed));
        assert!(!wake_up_actor(&mut ctx, EntityId(999)));
    }
}
