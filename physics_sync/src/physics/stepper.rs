//! Fixed-tick simulation: lifecycle sweep, ECS → backend sync, step,
//! contact dispatch, backend → ECS sync, controllers and joints

use super::actors::{apply_dynamic_properties, create_actor, destroy_actor, push_transform};
use super::character::{create_controller, destroy_controller, update_controllers};
use super::colliders::MeshCooker;
use super::components::{BodyKind, CharacterController, FixedJoint, RigidBody};
use super::contacts::dispatch_contacts;
use super::context::PhysicsContext;
use super::convert::{from_rotation, from_vector};
use super::joints::{create_fixed_joint, destroy_fixed_joint, update_joints};
use super::lifecycle::{LifecycleState, RegistryKind};
use crate::config::PhysicsSettings;
use crate::core::entity::{EntityId, Scene};
use crate::scripting::ScriptHooks;
use tracing::{debug, trace, warn};

/// Entities with a rigid body that should get a plain actor
///
/// A character controller takes precedence over a rigid body on the same entity.
fn actor_candidates(scene: &Scene) -> Vec<EntityId> {
    let mut entities = scene.entities_with::<RigidBody>();
    entities.retain(|entity| {
        if scene.has::<CharacterController>(*entity) {
            warn!(entity = %entity, "Entity has both RigidBody and CharacterController, using the controller");
            false
        } else {
            true
        }
    });
    entities.sort();
    entities
}

/// Create and destroy native objects so the registries match the components
pub fn sync_lifecycle(ctx: &mut PhysicsContext, scene: &Scene, cooker: &dyn MeshCooker) {
    // Actors
    let present = actor_candidates(scene);
    let diff = ctx.lifecycle.reconcile(RegistryKind::Actor, &present);
    for entity in diff.removed {
        destroy_actor(ctx, entity);
        ctx.lifecycle.mark_destroyed(RegistryKind::Actor, entity);
    }
    let kind_changed: Vec<EntityId> = ctx
        .registry
        .actors
        .iter()
        .filter(|(entity, actor)| {
            scene
                .get::<RigidBody>(**entity)
                .is_some_and(|rb| rb.kind != actor.kind)
        })
        .map(|(entity, _)| *entity)
        .collect();
    for entity in kind_changed {
        debug!(entity = %entity, "Body kind changed, re-creating actor");
        destroy_actor(ctx, entity);
        ctx.lifecycle.mark_pending(RegistryKind::Actor, entity);
    }
    for entity in ctx.lifecycle.in_state(RegistryKind::Actor, LifecycleState::Pending) {
        if let Err(err) = create_actor(ctx, scene, entity, cooker) {
            warn!(entity = %entity, error = %err, "Failed to create physics actor");
        }
    }

    // Controllers
    let mut present = scene.entities_with::<CharacterController>();
    present.sort();
    let diff = ctx.lifecycle.reconcile(RegistryKind::Controller, &present);
    for entity in diff.removed {
        destroy_controller(ctx, entity);
        ctx.lifecycle.mark_destroyed(RegistryKind::Controller, entity);
    }
    for entity in ctx.lifecycle.in_state(RegistryKind::Controller, LifecycleState::Pending) {
        if let Err(err) = create_controller(ctx, scene, entity, cooker) {
            warn!(entity = %entity, error = %err, "Failed to create character controller");
        }
    }

    // Joints
    let mut present = scene.entities_with::<FixedJoint>();
    present.sort();
    let diff = ctx.lifecycle.reconcile(RegistryKind::Joint, &present);
    for entity in diff.removed {
        destroy_fixed_joint(ctx, entity);
        ctx.lifecycle.mark_destroyed(RegistryKind::Joint, entity);
    }
    let retargeted: Vec<EntityId> = ctx
        .registry
        .joints
        .iter()
        .filter(|(entity, joint)| {
            scene
                .get::<FixedJoint>(**entity)
                .is_some_and(|j| j.connected_entity != joint.connected_entity)
        })
        .map(|(entity, _)| *entity)
        .collect();
    for entity in retargeted {
        destroy_fixed_joint(ctx, entity);
        ctx.lifecycle.mark_pending(RegistryKind::Joint, entity);
    }
    for entity in ctx.lifecycle.in_state(RegistryKind::Joint, LifecycleState::Pending) {
        create_fixed_joint(ctx, scene, entity);
    }

    // Despawned entities are not coming back
    let gone: Vec<EntityId> = [RegistryKind::Actor, RegistryKind::Controller, RegistryKind::Joint]
        .into_iter()
        .flat_map(|kind| ctx.lifecycle.in_state(kind, LifecycleState::Destroyed))
        .filter(|entity| !scene.contains(*entity))
        .collect();
    for entity in gone {
        ctx.lifecycle.forget(entity);
    }
}

/// Push scene-level tunables into the backend
pub fn push_settings(ctx: &mut PhysicsContext, settings: &PhysicsSettings) {
    ctx.backend.set_gravity(settings.gravity);
    ctx.backend
        .set_solver_iterations(settings.position_iterations, settings.velocity_iterations);
    ctx.accumulator.fixed_timestep = settings.fixed_timestep;
    ctx.accumulator.max_substeps = settings.max_substeps.max(1);
}

/// ECS → backend: static and kinematic poses, dynamic properties
pub fn sync_to_backend(ctx: &mut PhysicsContext, scene: &Scene, settings: &PhysicsSettings) {
    let mut entities: Vec<EntityId> = ctx.registry.actors.keys().copied().collect();
    entities.sort();

    for entity in entities {
        let Some(descriptor) = scene.get::<RigidBody>(entity).map(|rb| (*rb).clone()) else {
            continue;
        };
        let Some(mut actor) = ctx.registry.actor(entity).copied() else {
            continue;
        };

        match descriptor.kind {
            BodyKind::Static => push_transform(ctx, scene, entity),
            BodyKind::Dynamic => {
                apply_dynamic_properties(ctx, &mut actor, &descriptor, settings);
                if descriptor.is_kinematic {
                    push_transform(ctx, scene, entity);
                }
                ctx.registry.actors.insert(entity, actor);
            }
        }
    }
}

/// Backend → ECS: simulated dynamic poses back onto entity transforms
pub fn sync_from_backend(ctx: &PhysicsContext, scene: &mut Scene) {
    for (entity, actor) in &ctx.registry.actors {
        if actor.kind != BodyKind::Dynamic {
            continue;
        }
        let Some(body) = ctx.backend.bodies.get(actor.body) else {
            continue;
        };
        if body.is_kinematic() {
            continue;
        }

        let position = body.position();
        if let Some(mut transform) = scene.transform(*entity) {
            transform.position = from_vector(&position.translation.vector);
            transform.rotation = from_rotation(&position.rotation);
            scene.set_transform(*entity, transform);
        }
    }
}

/// Run one fixed tick of `settings.fixed_timestep`
pub fn tick(
    ctx: &mut PhysicsContext,
    scene: &mut Scene,
    hooks: &mut dyn ScriptHooks,
    cooker: &dyn MeshCooker,
) {
    let settings = scene.physics.clone();
    let dt = settings.fixed_timestep;

    sync_lifecycle(ctx, scene, cooker);
    push_settings(ctx, &settings);
    sync_to_backend(ctx, scene, &settings);

    ctx.backend.simulate(dt, &ctx.contacts);

    let events = ctx.contacts.drain();
    let calls = dispatch_contacts(events, &ctx.body_data, &mut ctx.touches, scene, hooks);

    sync_from_backend(ctx, scene);
    update_controllers(ctx, scene, dt);
    update_joints(ctx, scene, dt);

    trace!(
        step = ctx.backend.step_count(),
        actors = ctx.registry.actors.len(),
        controllers = ctx.registry.controllers.len(),
        joints = ctx.registry.joints.len(),
        hook_calls = calls,
        "Physics tick complete"
    );
}
