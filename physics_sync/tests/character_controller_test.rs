//! Character controllers falling, landing and walking on static geometry

use physics_sync::prelude::*;

fn controller_scene(start: Vec3) -> (Scene, EntityId) {
    let mut scene = Scene::new();
    scene.spawn((
        Transform::from_position(Vec3::ZERO),
        RigidBody::fixed(),
        Colliders::single(ColliderDescriptor::cuboid(Vec3::new(20.0, 0.5, 20.0))),
    ));
    let player = scene.spawn((
        Transform::from_position(start),
        CharacterController::default(),
        Colliders::single(ColliderDescriptor::capsule(0.5, 1.0)),
    ));
    (scene, player)
}

/// Step until the controller reports ground contact; returns the tick count
fn fall_until_grounded(engine: &mut PhysicsSyncEngine, scene: &mut Scene, player: EntityId) -> usize {
    let mut previous_speed = f32::MIN;
    for tick in 0..300 {
        engine.step(scene).unwrap();

        let speed_down = scene.get::<CharacterController>(player).unwrap().speed_down;
        if engine.get_controller(player).unwrap().grounded {
            return tick;
        }
        assert!(
            speed_down > previous_speed,
            "fall speed must grow while airborne ({} after {})",
            speed_down,
            previous_speed
        );
        previous_speed = speed_down;
    }
    panic!("controller never landed");
}

#[test]
fn test_controller_falls_and_lands() {
    physics_sync::init_test_logging();
    let (mut scene, player) = controller_scene(Vec3::new(0.0, 3.0, 0.0));
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);
    assert!(engine.get_controller(player).is_some());
    assert!(engine.get_actor(player).is_none(), "controllers are not plain actors");

    let ticks = fall_until_grounded(&mut engine, &mut scene, player);
    println!("Landed after {} ticks", ticks);

    // Landing re-arms the fall speed with a small fraction of gravity
    let expected = scene.physics.gravity.y * scene.physics.controller_landing_factor;
    let speed_down = scene.get::<CharacterController>(player).unwrap().speed_down;
    assert!((speed_down - expected).abs() < 1e-6, "speed_down {} != {}", speed_down, expected);

    // Capsule half extent is 1.0, ground top at 0.5
    let y = scene.transform(player).unwrap().position.y;
    assert!((y - 1.5).abs() < 0.1, "controller rests at {}", y);
}

#[test]
fn test_controller_walks_along_ground() {
    let (mut scene, player) = controller_scene(Vec3::new(0.0, 3.0, 0.0));
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);
    fall_until_grounded(&mut engine, &mut scene, player);

    for _ in 0..20 {
        scene
            .get_mut::<CharacterController>(player)
            .unwrap()
            .request_move(Vec3::new(0.05, 0.0, 0.0));
        engine.step(&mut scene).unwrap();
    }

    let position = scene.transform(player).unwrap().position;
    assert!(position.x > 0.5, "controller only reached x = {}", position.x);
    assert!((position.y - 1.5).abs() < 0.1, "controller left the ground: y = {}", position.y);
    assert_eq!(
        scene.get::<CharacterController>(player).unwrap().displacement,
        Vec3::ZERO,
        "queued displacement is consumed"
    );
}

#[test]
fn test_controller_without_gravity_hovers() {
    let (mut scene, player) = controller_scene(Vec3::new(0.0, 3.0, 0.0));
    scene.get_mut::<CharacterController>(player).unwrap().disable_gravity = true;
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    for _ in 0..50 {
        engine.step(&mut scene).unwrap();
    }

    assert!((scene.transform(player).unwrap().position.y - 3.0).abs() < 1e-4);
    assert_eq!(scene.get::<CharacterController>(player).unwrap().speed_down, 0.0);
}

#[test]
fn test_direct_controller_update() {
    let (mut scene, player) = controller_scene(Vec3::new(0.0, 3.0, 0.0));
    scene.get_mut::<CharacterController>(player).unwrap().disable_gravity = true;
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);
    engine.step(&mut scene).unwrap();

    let moved = engine
        .on_character_controller_update(&mut scene, player, Vec3::new(0.0, 0.0, 0.1))
        .unwrap();

    assert!((moved.translation.z - 0.1).abs() < 1e-3);
    assert!(!moved.grounded);
    assert!((scene.transform(player).unwrap().position.z - 0.1).abs() < 1e-3);
}

#[test]
fn test_controller_update_for_unknown_entity() {
    let (mut scene, _player) = controller_scene(Vec3::new(0.0, 3.0, 0.0));
    let mut engine = PhysicsSyncEngine::new();
    engine.on_simulation_start(&scene);

    let missing = EntityId(999);
    assert!(engine
        .on_character_controller_update(&mut scene, missing, Vec3::X)
        .is_err());
}
