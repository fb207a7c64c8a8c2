//! Fixed joints between actors

use physics_sync::prelude::*;

/// A dynamic box hanging one meter below a static anchor
fn hanging_scene(joint: impl Fn(EntityId) -> FixedJoint) -> (Scene, EntityId, EntityId) {
    let mut scene = Scene::new();
    let anchor = scene.spawn((
        Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),
        RigidBody::fixed(),
        Colliders::single(ColliderDescriptor::cuboid(Vec3::splat(0.25))),
    ));
    let weight = scene.spawn((
        Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
        RigidBody::dynamic(1.0),
        Colliders::single(ColliderDescriptor::cuboid(Vec3::splat(0.25))),
    ));
    scene.insert_one(weight, joint(anchor));
    (scene, anchor, weight)
}

#[test]
fn test_joint_holds_body() {
    let (mut scene, _anchor, weight) = hanging_scene(FixedJoint::new);
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);
    assert!(engine.get_fixed_joint(weight).is_some());

    for _ in 0..100 {
        engine.step(&mut scene).unwrap();
    }

    let y = scene.transform(weight).unwrap().position.y;
    assert!((y - 2.0).abs() < 0.05, "weight sagged to {}", y);
    assert!(!engine.is_constraint_broken(weight));

    let handle = engine.get_fixed_joint(weight).unwrap().joint;
    let forces = engine.last_reported_fixed_joint_forces(handle).unwrap();
    println!("Joint forces: {:?}", forces);
    assert!(forces.linear.length() > 0.0);
}

#[test]
fn test_joint_waits_for_connected_actor() {
    let mut scene = Scene::new();
    let anchor = scene.spawn((Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),));
    let weight = scene.spawn((
        Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
        RigidBody::dynamic(1.0),
        Colliders::single(ColliderDescriptor::cuboid(Vec3::splat(0.25))),
        FixedJoint::new(anchor),
    ));
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    engine.step(&mut scene).unwrap();
    assert!(engine.get_fixed_joint(weight).is_none(), "anchor has no actor yet");
    assert_eq!(engine.context().unwrap().backend.impulse_joints.len(), 0);

    scene.insert_one(anchor, RigidBody::fixed());
    engine.step(&mut scene).unwrap();

    let joint = engine.get_fixed_joint(weight).expect("joint created once both actors exist");
    assert_eq!(joint.connected_entity, anchor);
}

#[test]
fn test_joint_recreated_after_connected_actor_returns() {
    let (mut scene, anchor, weight) = hanging_scene(FixedJoint::new);
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    let rigid_body = scene.remove_one::<RigidBody>(anchor).unwrap();
    engine.step(&mut scene).unwrap();
    assert!(engine.get_fixed_joint(weight).is_none());
    assert_eq!(engine.context().unwrap().body_data.joint_count(), 0);

    scene.insert_one(anchor, rigid_body);
    engine.step(&mut scene).unwrap();
    assert!(engine.get_fixed_joint(weight).is_some());
    assert_eq!(engine.context().unwrap().body_data.joint_count(), 1);
}

#[test]
fn test_break_joint_keeps_registration() {
    let (mut scene, _anchor, weight) = hanging_scene(FixedJoint::new);
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);
    engine.step(&mut scene).unwrap();

    assert!(engine.break_joint(weight).unwrap());
    assert!(engine.is_constraint_broken(weight));

    for _ in 0..50 {
        engine.step(&mut scene).unwrap();
    }

    // The body is free to fall but the joint is still registered
    assert!(scene.transform(weight).unwrap().position.y < 1.5);
    assert!(engine.get_fixed_joint(weight).is_some());
    assert!(engine.is_constraint_broken(weight));

    assert!(engine.destroy_physics_actor(weight).unwrap());
    assert!(engine.get_fixed_joint(weight).is_none());
    assert!(!engine.is_constraint_broken(weight));
}

#[test]
fn test_joint_breaks_over_threshold() {
    let (mut scene, _anchor, weight) =
        hanging_scene(|anchor| FixedJoint::new(anchor).with_break_thresholds(1.0, f32::MAX));
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    // Holding 1kg against gravity takes about 9.8N
    for _ in 0..10 {
        engine.step(&mut scene).unwrap();
    }

    assert!(engine.is_constraint_broken(weight));
    assert!(engine.get_fixed_joint(weight).is_some());
}

#[test]
fn test_removing_joint_component_destroys_joint() {
    let (mut scene, _anchor, weight) = hanging_scene(FixedJoint::new);
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    scene.remove_one::<FixedJoint>(weight);
    engine.step(&mut scene).unwrap();

    assert!(engine.get_fixed_joint(weight).is_none());
    assert!(engine.get_actor(weight).is_some());
    let ctx = engine.context().unwrap();
    assert_eq!(ctx.backend.impulse_joints.len(), 0);
    assert_eq!(ctx.body_data.joint_count(), 0);
}
