//! Backend handle owning every native Rapier structure of one simulation
//!
//! Nothing here knows about entities. The bridge modules create and destroy
//! objects through these sets and keep their own UUID registries.

use glam::Vec3;
use rapier3d::prelude::*;
use std::num::NonZeroUsize;
use tracing::{debug, info, trace};

use super::convert::to_vector;

/// Rapier sets, pipelines and scene-wide parameters
pub struct PhysicsBackend {
    /// Set of rigid bodies (actors and controller bodies)
    pub bodies: RigidBodySet,

    /// Set of collision shapes
    pub colliders: ColliderSet,

    /// Integration parameters for the simulation
    pub integration_parameters: IntegrationParameters,

    /// Physics pipeline for stepping the simulation
    pipeline: PhysicsPipeline,

    /// Island manager for grouping connected bodies
    pub islands: IslandManager,

    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,

    /// Set of impulse-based joints
    pub impulse_joints: ImpulseJointSet,

    /// Set of multibody (articulated) joints, unused but required by the pipeline
    pub multibody_joints: MultibodyJointSet,

    ccd_solver: CCDSolver,

    /// Query pipeline for raycasts and controller sweeps
    pub query_pipeline: QueryPipeline,

    /// Gravity vector for the simulation
    pub gravity: Vector<Real>,

    steps: u64,
}

impl PhysicsBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        info!("Initializing physics backend");

        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: vector![0.0, -9.81, 0.0],
            steps: 0,
        }
    }

    /// Set the gravity vector for the simulation
    pub fn set_gravity(&mut self, gravity: Vec3) {
        let gravity = to_vector(gravity);
        if gravity != self.gravity {
            debug!(?gravity, "Physics gravity changed");
            self.gravity = gravity;
        }
    }

    /// Set solver position/velocity iteration counts
    pub fn set_solver_iterations(&mut self, position_iterations: u32, velocity_iterations: u32) {
        if let Some(iterations) = NonZeroUsize::new(position_iterations as usize) {
            self.integration_parameters.num_solver_iterations = iterations;
        }
        self.integration_parameters.num_internal_pgs_iterations =
            velocity_iterations.max(1) as usize;
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// Blocks until the step completes. Collision events are delivered to
    /// `events` synchronously, before this returns.
    pub fn simulate(&mut self, dt: f32, events: &dyn EventHandler) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            events,
        );

        self.steps += 1;
        trace!(step = self.steps, dt = dt, "Physics step completed");
    }

    /// Rebuild the query acceleration structure outside of a step
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Number of completed simulation steps
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Remove a single collider from its body
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, true)
            .is_some()
    }

    /// Remove a body; its colliders must already be detached
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    /// Remove a joint, waking both linked bodies
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.remove(handle, true).is_some()
    }

    /// Mutable access to a joint without waking its bodies
    pub fn joint_mut(&mut self, handle: ImpulseJointHandle) -> Option<&mut ImpulseJoint> {
        self.impulse_joints
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, joint)| joint)
    }

    /// Wake up a sleeping body
    pub fn wake_up(&mut self, handle: RigidBodyHandle) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.wake_up(true);
                true
            }
            None => false,
        }
    }
}

impl Default for PhysicsBackend {
    fn default() -> Self {
        Self::new()
    }
}
