//! Explicit per-scene physics state
//!
//! One `PhysicsContext` exists per simulating scene. It owns the backend,
//! the registries and the reverse-lookup arena, so several simulations can
//! live side by side.

use super::accumulator::PhysicsAccumulator;
use super::backend::PhysicsBackend;
use super::contacts::{ContactCollector, TouchTracker};
use super::lifecycle::LifecycleTracker;
use super::registry::PhysicsRegistry;
use super::user_data::BodyDataArena;
use crate::config::PhysicsSettings;
use crate::core::entity::SceneId;

pub struct PhysicsContext {
    pub scene: SceneId,
    pub backend: PhysicsBackend,
    pub registry: PhysicsRegistry,
    pub body_data: BodyDataArena,
    pub lifecycle: LifecycleTracker,
    pub accumulator: PhysicsAccumulator,
    pub contacts: ContactCollector,
    pub touches: TouchTracker,
}

impl PhysicsContext {
    pub fn new(scene: SceneId, settings: &PhysicsSettings) -> Self {
        let mut backend = PhysicsBackend::new();
        backend.set_gravity(settings.gravity);
        backend.set_solver_iterations(settings.position_iterations, settings.velocity_iterations);

        Self {
            scene,
            backend,
            registry: PhysicsRegistry::new(),
            body_data: BodyDataArena::new(),
            lifecycle: LifecycleTracker::new(),
            accumulator: PhysicsAccumulator::new(settings.fixed_timestep, settings.max_substeps),
            contacts: ContactCollector::new(),
            touches: TouchTracker::new(),
        }
    }
}
