//! Collider attachment: descriptor variants to native shapes on an actor

use super::backend::PhysicsBackend;
use super::components::{ColliderDescriptor, MeshColliderMode, PhysicsMaterial};
use super::convert::{to_point, to_vector};
use crate::config::MaterialSettings;
use crate::core::entity::EntityId;
use glam::Vec3;
use rapier3d::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Geometry produced by the mesh cooking collaborator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookedMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
}

impl CookedMesh {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Every index refers to an existing vertex and there is at least one triangle
    pub fn is_valid(&self) -> bool {
        let count = self.vertices.len() as u32;
        !self.indices.is_empty() && self.indices.iter().flatten().all(|i| *i < count)
    }
}

/// Supplies collision geometry for mesh colliders
pub trait MeshCooker {
    fn cook(&self, entity: EntityId, submesh_index: u32) -> Option<CookedMesh>;
}

/// Cooker with no meshes; every mesh collider is skipped
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMeshCooker;

impl MeshCooker for NoMeshCooker {
    fn cook(&self, _entity: EntityId, _submesh_index: u32) -> Option<CookedMesh> {
        None
    }
}

/// Pre-cooked meshes keyed by entity and submesh index
#[derive(Debug, Default, Clone)]
pub struct CookedMeshLibrary {
    meshes: HashMap<(EntityId, u32), CookedMesh>,
}

impl CookedMeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityId, submesh_index: u32, mesh: CookedMesh) {
        self.meshes.insert((entity, submesh_index), mesh);
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshCooker for CookedMeshLibrary {
    fn cook(&self, entity: EntityId, submesh_index: u32) -> Option<CookedMesh> {
        self.meshes.get(&(entity, submesh_index)).cloned()
    }
}

/// Friction/restitution resolved for an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl ResolvedMaterial {
    pub fn resolve(material: Option<&PhysicsMaterial>, fallback: &MaterialSettings) -> Self {
        match material {
            Some(m) => Self {
                friction: m.dynamic_friction,
                restitution: m.restitution,
            },
            None => Self {
                friction: fallback.dynamic_friction,
                restitution: fallback.restitution,
            },
        }
    }
}

/// Build native geometry for one descriptor at the given world scale
///
/// Primitive shapes are scaled once here. Mesh geometry comes unscaled from
/// the cooker.
pub fn build_shape(
    descriptor: &ColliderDescriptor,
    scale: Vec3,
    entity: EntityId,
    cooker: &dyn MeshCooker,
) -> Option<SharedShape> {
    let scale = scale.abs();
    match descriptor {
        ColliderDescriptor::Box { half_size, .. } => {
            let half = *half_size * scale;
            Some(SharedShape::cuboid(half.x, half.y, half.z))
        }
        ColliderDescriptor::Sphere { radius, .. } => {
            Some(SharedShape::ball(radius * scale.max_element()))
        }
        ColliderDescriptor::Capsule { radius, height, .. } => {
            let radius = radius * scale.x.max(scale.z);
            let half_height = height * scale.y * 0.5;
            Some(SharedShape::capsule_y(half_height, radius))
        }
        ColliderDescriptor::Mesh {
            submesh_index,
            mode,
            ..
        } => {
            let Some(mesh) = cooker.cook(entity, *submesh_index) else {
                warn!(entity = %entity, submesh_index, "No cooked mesh available, skipping collider");
                return None;
            };
            let points: Vec<Point<Real>> = mesh.vertices.iter().map(|v| to_point(*v)).collect();
            match mode {
                MeshColliderMode::Convex => {
                    let shape = SharedShape::convex_hull(&points);
                    if shape.is_none() {
                        warn!(entity = %entity, submesh_index, "Convex hull computation failed");
                    }
                    shape
                }
                MeshColliderMode::Triangle => {
                    if !mesh.is_valid() {
                        warn!(entity = %entity, submesh_index, "Invalid triangle mesh, skipping collider");
                        return None;
                    }
                    Some(SharedShape::trimesh(points, mesh.indices))
                }
            }
        }
    }
}

/// Collision filter for an actor: its own group by body kind, colliding with all
pub fn collision_groups(is_dynamic: bool) -> InteractionGroups {
    let membership = if is_dynamic { Group::GROUP_2 } else { Group::GROUP_1 };
    InteractionGroups::new(membership, Group::ALL)
}

/// Native collider for one descriptor, without parent
pub fn build_collider(
    shape: SharedShape,
    descriptor: &ColliderDescriptor,
    material: ResolvedMaterial,
    groups: InteractionGroups,
) -> Collider {
    let mut builder = ColliderBuilder::new(shape)
        .translation(to_vector(descriptor.offset()))
        .friction(material.friction)
        .restitution(material.restitution)
        .collision_groups(groups)
        .active_events(ActiveEvents::COLLISION_EVENTS);

    if descriptor.is_trigger() {
        // Sensors carry no mass and must see static and kinematic bodies too
        builder = builder
            .sensor(true)
            .density(0.0)
            .active_collision_types(ActiveCollisionTypes::all());
    }

    builder.build()
}

/// Create one exclusive native shape per descriptor on `body`
///
/// Descriptors whose geometry cannot be produced are skipped with a warning.
pub fn attach_colliders(
    backend: &mut PhysicsBackend,
    body: RigidBodyHandle,
    entity: EntityId,
    descriptors: &[ColliderDescriptor],
    scale: Vec3,
    material: ResolvedMaterial,
    groups: InteractionGroups,
    cooker: &dyn MeshCooker,
) -> Vec<ColliderHandle> {
    let mut handles = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let Some(shape) = build_shape(descriptor, scale, entity, cooker) else {
            continue;
        };
        let collider = build_collider(shape, descriptor, material, groups);
        let handle = backend
            .colliders
            .insert_with_parent(collider, body, &mut backend.bodies);
        handles.push(handle);
    }

    debug!(
        entity = %entity,
        requested = descriptors.len(),
        attached = handles.len(),
        "Attached colliders"
    );

    handles
}

/// Remove every collider in `handles` from the backend
pub fn detach_colliders(backend: &mut PhysicsBackend, handles: &[ColliderHandle]) {
    for handle in handles {
        if !backend.remove_collider(*handle) {
            warn!(?handle, "Collider already removed from backend");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> EntityId {
        EntityId(1)
    }

    #[test]
    fn test_box_scaled_by_world_scale() {
        let shape = build_shape(
            &ColliderDescriptor::cuboid(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(2.0, -1.0, 1.0),
            entity(),
            &NoMeshCooker,
        )
        .unwrap();

        let cuboid = shape.as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents, vector![2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sphere_uses_largest_scale_axis() {
        let shape = build_shape(
            &ColliderDescriptor::sphere(0.5),
            Vec3::new(1.0, 4.0, 2.0),
            entity(),
            &NoMeshCooker,
        )
        .unwrap();

        assert_eq!(shape.as_ball().unwrap().radius, 2.0);
    }

    #[test]
    fn test_capsule_dimensions() {
        let shape = build_shape(
            &ColliderDescriptor::capsule(0.5, 2.0),
            Vec3::ONE,
            entity(),
            &NoMeshCooker,
        )
        .unwrap();

        let capsule = shape.as_capsule().unwrap();
        assert_eq!(capsule.radius, 0.5);
        assert!((capsule.half_height() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mesh_without_cooked_data_is_skipped() {
        let shape = build_shape(
            &ColliderDescriptor::mesh(0, MeshColliderMode::Triangle),
            Vec3::ONE,
            entity(),
            &NoMeshCooker,
        );
        assert!(shape.is_none());
    }

    #[test]
    fn test_mesh_from_library() {
        let mut library = CookedMeshLibrary::new();
        library.insert(
            entity(),
            0,
            CookedMesh::new(
                vec![
                    Vec3::ZERO,
                    Vec3::X,
                    Vec3::Y,
                    Vec3::Z,
                ],
                vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]],
            ),
        );

        let triangles = build_shape(
            &ColliderDescriptor::mesh(0, MeshColliderMode::Triangle),
            Vec3::ONE,
            entity(),
            &library,
        );
        assert!(triangles.unwrap().as_trimesh().is_some());

        let hull = build_shape(
            &ColliderDescriptor::mesh(0, MeshColliderMode::Convex),
            Vec3::ONE,
            entity(),
            &library,
        );
        assert!(hull.is_some());
    }

    #[test]
    fn test_invalid_triangle_mesh_is_skipped() {
        let mut library = CookedMeshLibrary::new();
        library.insert(entity(), 1, CookedMesh::new(vec![Vec3::ZERO, Vec3::X], vec![[0, 1, 5]]));

        let shape = build_shape(
            &ColliderDescriptor::mesh(1, MeshColliderMode::Triangle),
            Vec3::ONE,
            entity(),
            &library,
        );
        assert!(shape.is_none());
    }

    #[test]
    fn test_invalid_cooked_mesh() {
        let mesh = CookedMesh::new(vec![Vec3::ZERO], vec![[0, 1, 2]]);
        assert!(!mesh.is_valid());
        assert!(!CookedMesh::default().is_valid());
    }

    #[test]
    fn test_material_fallback() {
        let fallback = MaterialSettings::default();
        let resolved = ResolvedMaterial::resolve(None, &fallback);
        assert_eq!(resolved.friction, 1.0);
        assert_eq!(resolved.restitution, 1.0);

        let material = PhysicsMaterial {
            static_friction: 0.2,
            dynamic_friction: 0.3,
            restitution: 0.0,
        };
        let resolved = ResolvedMaterial::resolve(Some(&material), &fallback);
        assert_eq!(resolved.friction, 0.3);

        // Only the dynamic coefficient reaches the backend
        let stickier = PhysicsMaterial {
            static_friction: 5.0,
            ..material
        };
        assert_eq!(ResolvedMaterial::resolve(Some(&stickier), &fallback), resolved);
    }

    #[test]
    fn test_trigger_collider_flags() {
        let descriptor = ColliderDescriptor::sphere(1.0).as_trigger();
        let collider = build_collider(
            SharedShape::ball(1.0),
            &descriptor,
            ResolvedMaterial {
                friction: 0.5,
                restitution: 0.0,
            },
            collision_groups(true),
        );

        assert!(collider.is_sensor());
        assert_eq!(collider.density(), 0.0);
        assert_eq!(collider.collision_groups().memberships, Group::GROUP_2);
    }

    #[test]
    fn test_attach_and_detach() {
        let mut backend = PhysicsBackend::new();
        let body = backend.bodies.insert(RigidBodyBuilder::fixed());
        let handles = attach_colliders(
            &mut backend,
            body,
            entity(),
            &[
                ColliderDescriptor::cuboid(Vec3::ONE),
                ColliderDescriptor::sphere(1.0).with_offset(Vec3::Y),
                ColliderDescriptor::mesh(0, MeshColliderMode::Convex),
            ],
            Vec3::ONE,
            ResolvedMaterial {
                friction: 1.0,
                restitution: 0.0,
            },
            collision_groups(false),
            &NoMeshCooker,
        );

        assert_eq!(handles.len(), 2);
        assert_eq!(backend.bodies[body].colliders().len(), 2);

        detach_colliders(&mut backend, &handles);
        assert!(backend.colliders.is_empty());
    }
}
