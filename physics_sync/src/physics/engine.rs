//! The physics API surface the rest of the engine talks to
//!
//! `PhysicsSyncEngine` owns the per-scene `PhysicsContext` for the duration
//! of a simulation run and composes actors, colliders, controllers, joints,
//! the stepper, contact dispatch and raycasts.

use super::actors;
use super::character::{self, ControllerMove};
use super::colliders::{MeshCooker, NoMeshCooker};
use super::context::PhysicsContext;
use super::joints;
use super::raycast::{cast_ray, RaycastHit};
use super::registry::{ActorHandle, ControllerHandle, JointForces, JointHandle};
use super::stepper;
use crate::core::entity::{EntityId, Scene};
use crate::error::PhysicsError;
use crate::scripting::{NoScriptHooks, ScriptHook, ScriptHooks, ScriptRef};
use glam::Vec3;
use rapier3d::prelude::{ImpulseJointHandle, RigidBodyHandle};
use tracing::{debug, info, warn};

pub struct PhysicsSyncEngine<H: ScriptHooks = NoScriptHooks> {
    context: Option<PhysicsContext>,
    hooks: H,
    cooker: Box<dyn MeshCooker>,
}

impl PhysicsSyncEngine<NoScriptHooks> {
    pub fn new() -> Self {
        Self::with_hooks(NoScriptHooks)
    }
}

impl Default for PhysicsSyncEngine<NoScriptHooks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ScriptHooks> PhysicsSyncEngine<H> {
    /// Create an engine delivering contact, trigger and raycast hooks to `hooks`
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            context: None,
            hooks,
            cooker: Box::new(NoMeshCooker),
        }
    }

    /// Use `cooker` to obtain geometry for mesh colliders
    pub fn with_mesh_cooker(mut self, cooker: impl MeshCooker + 'static) -> Self {
        self.cooker = Box::new(cooker);
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn is_simulating(&self) -> bool {
        self.context.is_some()
    }

    /// State of the running simulation, if any
    pub fn context(&self) -> Option<&PhysicsContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut PhysicsContext> {
        self.context.as_mut()
    }

    fn running(&mut self) -> Result<&mut PhysicsContext, PhysicsError> {
        self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)
    }

    /// Begin simulating `scene`, creating native objects for every physics component
    pub fn on_simulation_start(&mut self, scene: &Scene) {
        if self.context.is_some() {
            warn!("Simulation already running, restarting");
            self.teardown();
        }

        let mut ctx = PhysicsContext::new(scene.id(), &scene.physics);
        stepper::sync_lifecycle(&mut ctx, scene, self.cooker.as_ref());

        info!(
            scene = scene.id().0,
            actors = ctx.registry.actors.len(),
            controllers = ctx.registry.controllers.len(),
            joints = ctx.registry.joints.len(),
            "Physics simulation started"
        );
        self.context = Some(ctx);
    }

    /// Advance by a variable frame delta, running as many fixed ticks as it covers
    ///
    /// Returns the number of ticks run.
    pub fn on_simulation_update(&mut self, scene: &mut Scene, delta_time: f32) -> Result<u32, PhysicsError> {
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        stepper::push_settings(ctx, &scene.physics);

        let steps = ctx.accumulator.accumulate(delta_time);
        for _ in 0..steps {
            stepper::tick(ctx, scene, &mut self.hooks, self.cooker.as_ref());
        }
        Ok(steps)
    }

    /// Run exactly one fixed tick regardless of accumulated time
    pub fn step(&mut self, scene: &mut Scene) -> Result<(), PhysicsError> {
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        stepper::tick(ctx, scene, &mut self.hooks, self.cooker.as_ref());
        Ok(())
    }

    /// Fraction of a fixed tick carried over to the next frame
    pub fn interpolation_alpha(&self) -> f32 {
        self.context
            .as_ref()
            .map(|ctx| ctx.accumulator.interpolation_alpha())
            .unwrap_or(0.0)
    }

    /// Stop simulating and tear down every native object
    pub fn on_simulation_stop(&mut self, scene: &Scene) {
        match &self.context {
            Some(ctx) if ctx.scene != scene.id() => {
                warn!(
                    running = ctx.scene.0,
                    requested = scene.id().0,
                    "Stopping simulation of a different scene"
                );
            }
            Some(_) => {}
            None => return,
        }
        self.teardown();
        info!(scene = scene.id().0, "Physics simulation stopped");
    }

    fn teardown(&mut self) {
        let Some(mut ctx) = self.context.take() else {
            return;
        };

        let mut owners: Vec<EntityId> = ctx.registry.joints.keys().copied().collect();
        owners.sort();
        for entity in owners {
            joints::destroy_fixed_joint(&mut ctx, entity);
        }
        let mut entities: Vec<EntityId> = ctx
            .registry
            .controllers
            .keys()
            .chain(ctx.registry.actors.keys())
            .copied()
            .collect();
        entities.sort();
        entities.dedup();
        for entity in entities {
            character::destroy_controller(&mut ctx, entity);
            actors::destroy_actor(&mut ctx, entity);
        }

        if ctx.body_data.body_count() > 0 || ctx.body_data.joint_count() > 0 {
            warn!(
                bodies = ctx.body_data.body_count(),
                joints = ctx.body_data.joint_count(),
                "User-data records left after teardown"
            );
        }
        ctx.body_data.clear();
        ctx.registry.clear();
        ctx.lifecycle.clear();
    }

    /// Create the actor for `entity` right away instead of on the next tick
    pub fn create_physics_actor(&mut self, scene: &Scene, entity: EntityId) -> Result<RigidBodyHandle, PhysicsError> {
        let cooker = self.cooker.as_ref();
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        actors::create_actor(ctx, scene, entity, cooker)
    }

    /// Destroy every native object of `entity`; returns whether an actor existed
    pub fn destroy_physics_actor(&mut self, entity: EntityId) -> Result<bool, PhysicsError> {
        let ctx = self.running()?;
        Ok(actors::destroy_actor(ctx, entity))
    }

    /// Destroy then create the actor of `entity`
    pub fn recreate_actor(&mut self, scene: &Scene, entity: EntityId) -> Result<RigidBodyHandle, PhysicsError> {
        let cooker = self.cooker.as_ref();
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        debug!(entity = %entity, "Re-creating physics actor");
        actors::recreate_actor(ctx, scene, entity, cooker)
    }

    pub fn wake_up_actor(&mut self, entity: EntityId) -> Result<bool, PhysicsError> {
        let ctx = self.running()?;
        Ok(actors::wake_up_actor(ctx, entity))
    }

    /// Wake up every dynamic actor; returns how many were woken
    pub fn wake_up_actors(&mut self) -> Result<usize, PhysicsError> {
        let ctx = self.running()?;
        Ok(actors::wake_up_actors(ctx))
    }

    /// Apply a linear impulse to a dynamic actor
    pub fn apply_impulse(&mut self, entity: EntityId, impulse: Vec3) -> Result<bool, PhysicsError> {
        let ctx = self.running()?;
        Ok(actors::apply_impulse(ctx, entity, impulse))
    }

    /// Cast a ray against the scene
    ///
    /// On a hit, the hit entity's `on_raycast_collision` hook runs before
    /// this returns.
    pub fn raycast(
        &mut self,
        scene: &Scene,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Result<Option<RaycastHit>, PhysicsError> {
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        ctx.backend.refresh_queries();

        let hit = cast_ray(&ctx.backend, &ctx.body_data, origin, direction, max_distance);
        if let Some(hit) = &hit {
            if let Some(script) = scene.get::<ScriptRef>(hit.entity).map(|s| (*s).clone()) {
                self.hooks
                    .invoke(&script, ScriptHook::RaycastCollision { entity: hit.entity });
            }
        }
        Ok(hit)
    }

    pub fn get_actor(&self, entity: EntityId) -> Option<&ActorHandle> {
        self.context.as_ref()?.registry.actor(entity)
    }

    pub fn get_controller(&self, entity: EntityId) -> Option<&ControllerHandle> {
        self.context.as_ref()?.registry.controllers.get(&entity)
    }

    pub fn get_fixed_joint(&self, entity: EntityId) -> Option<&JointHandle> {
        self.context.as_ref()?.registry.joints.get(&entity)
    }

    /// Force and torque of `joint` cached after the last tick
    pub fn last_reported_fixed_joint_forces(&self, joint: ImpulseJointHandle) -> Option<JointForces> {
        joints::last_reported_forces(self.context.as_ref()?, joint)
    }

    pub fn is_constraint_broken(&self, entity: EntityId) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| joints::is_constraint_broken(ctx, entity))
    }

    /// Break the joint owned by `entity`; it stays registered until the entity is destroyed
    pub fn break_joint(&mut self, entity: EntityId) -> Result<bool, PhysicsError> {
        let ctx = self.running()?;
        Ok(joints::break_joint(ctx, entity))
    }

    /// Move a character controller by `displacement` for one fixed tick
    pub fn on_character_controller_update(
        &mut self,
        scene: &mut Scene,
        entity: EntityId,
        displacement: Vec3,
    ) -> Result<ControllerMove, PhysicsError> {
        let ctx = self.context.as_mut().ok_or(PhysicsError::SimulationNotRunning)?;
        let settings = scene.physics.clone();
        character::update_controller(ctx, scene, entity, displacement, settings.fixed_timestep, &settings)
    }
}
