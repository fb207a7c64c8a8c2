//! Closest-hit ray queries resolved to entities

use super::backend::PhysicsBackend;
use super::convert::{from_point, from_vector, to_point, to_vector};
use super::user_data::BodyDataArena;
use crate::core::entity::EntityId;
use glam::Vec3;
use rapier3d::prelude::*;
use tracing::trace;

/// Surface hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub entity: EntityId,
}

/// Cast a ray and return the closest hit on a resolvable actor
///
/// `direction` is normalized first. A zero direction or a non-positive
/// distance never hits. The query pipeline must be current.
pub fn cast_ray(
    backend: &PhysicsBackend,
    arena: &BodyDataArena,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<RaycastHit> {
    let direction = direction.try_normalize()?;
    if !(max_distance > 0.0) {
        return None;
    }

    let ray = Ray::new(to_point(origin), to_vector(direction));
    let (collider, intersection) = backend.query_pipeline.cast_ray_and_get_normal(
        &backend.bodies,
        &backend.colliders,
        &ray,
        max_distance,
        true,
        QueryFilter::default(),
    )?;

    let parent = backend.colliders.get(collider)?.parent()?;
    let user_data = backend.bodies.get(parent)?.user_data;
    let Some(data) = arena.resolve(user_data) else {
        trace!(?collider, "Raycast hit an actor without user-data");
        return None;
    };

    let toi = intersection.time_of_impact;
    Some(RaycastHit {
        position: from_point(&ray.point_at(toi)),
        normal: from_vector(&intersection.normal),
        distance: toi,
        entity: data.entity,
    })
}
