//! End-to-end movement mode tests against real Avian3D collision.
//!
//! Each test builds a minimal headless app, spawns world geometry and a
//! character, and steps `FixedUpdate` ticks through the full orchestrator.

use avian3d::prelude::*;
use bevy::prelude::*;
use bevy_spacewalk::prelude::*;

const FIXED_UPDATE_HZ: f64 = 60.0;

/// Create a minimal test app with physics and the mover plugin.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    // Satisfies Avian's ColliderHierarchyPlugin without the full scene stack.
    app.insert_resource(bevy::scene::SceneSpawner::default());
    app.add_plugins(SpacewalkPlugin);
    app.insert_resource(Time::<Fixed>::from_hz(FIXED_UPDATE_HZ));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static box belonging to the world collision layer.
fn spawn_box(app: &mut App, center: Vec3, full_size: Vec3) -> Entity {
    let transform = Transform::from_translation(center);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Static,
            Collider::cuboid(full_size.x, full_size.y, full_size.z),
            CollisionLayers::new(GameLayer::World, LayerMask::ALL),
        ))
        .id()
}

/// Spawn a character in the given mode with default settings.
fn spawn_character(app: &mut App, position: Vec3, mode: ModeName) -> Entity {
    let settings = SharedMovementSettings::default();
    let capsule_length = (settings.capsule_half_height - settings.capsule_radius) * 2.0;
    let transform = Transform::from_translation(position);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Kinematic,
            Collider::capsule(settings.capsule_radius, capsule_length),
            CollisionLayers::new(GameLayer::Character, [GameLayer::World]),
            MovementMode(mode),
            settings,
            CharacterInputs::default(),
        ))
        .id()
}

/// Advance time by one fixed timestep and run one update.
fn tick(app: &mut App) {
    let timestep = std::time::Duration::from_secs_f64(1.0 / FIXED_UPDATE_HZ);
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .advance_by(timestep);
    app.update();
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

/// Re-arm a character after the warmup ticks that let Avian ingest colliders.
///
/// The first tick runs before the spatial query pipeline has seen anything,
/// which legitimately reads as "open space"; tests reset to their intended
/// starting state once the world is queryable.
fn reset_character(app: &mut App, entity: Entity, position: Vec3, mode: ModeName) {
    let mut entity_mut = app.world_mut().entity_mut(entity);
    *entity_mut.get_mut::<Transform>().unwrap() = Transform::from_translation(position);
    entity_mut.insert((
        MovementMode(mode),
        SyncState::default(),
        Blackboard::default(),
        LayeredMoveQueue::default(),
        CharacterInputs::default(),
    ));
}

fn set_inputs(app: &mut App, entity: Entity, inputs: CharacterInputs) {
    app.world_mut().entity_mut(entity).insert(inputs);
}

fn mode_of(app: &App, entity: Entity) -> ModeName {
    **app.world().get::<MovementMode>(entity).unwrap()
}

fn velocity_of(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<SyncState>(entity).unwrap().velocity
}

fn position_of(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

// Capsule half height 90 plus the float band center ~2.15.
const REST_HEIGHT: f32 = 92.15;

#[test]
fn idle_walking_on_flat_floor_holds_position() {
    let mut app = create_test_app();

    // Floor surface at y = 0.
    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);

    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);

    run_ticks(&mut app, 120);

    let pos = position_of(&app, character);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    assert!(
        (pos.y - REST_HEIGHT).abs() < 1.0,
        "height should settle in the float band, got y = {}",
        pos.y
    );
    assert!(pos.x.abs() < 0.1 && pos.z.abs() < 0.1, "no lateral drift, got {pos}");
    assert!(velocity_of(&app, character).length() < 1.0);
}

#[test]
fn walking_steps_up_a_low_ledge() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    // A 30-high step (below the 40 max) starting at x = 100.
    spawn_box(&mut app, Vec3::new(300.0, 15.0, 0.0), Vec3::new(400.0, 30.0, 600.0));

    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            move_input_type: MoveInputType::Intent,
            move_input: Vec3::X,
            ..default()
        },
    );

    run_ticks(&mut app, 120);

    let pos = position_of(&app, character);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    assert!(pos.x > 120.0, "should have crossed onto the step, got x = {}", pos.x);
    assert!(
        (pos.y - (REST_HEIGHT + 30.0)).abs() < 2.0,
        "should stand on top of the step, got y = {}",
        pos.y
    );
}

#[test]
fn walking_into_a_wall_slides_along_it() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    // A tall wall whose near face is at x = 100.
    spawn_box(&mut app, Vec3::new(150.0, 200.0, 0.0), Vec3::new(100.0, 400.0, 2000.0));

    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            move_input_type: MoveInputType::Intent,
            move_input: Vec3::new(1.0, 0.0, 0.4).normalize(),
            ..default()
        },
    );

    run_ticks(&mut app, 120);

    let pos = position_of(&app, character);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    // Pinned against the wall but not through it.
    assert!(pos.x < 100.0, "must not tunnel into the wall, got x = {}", pos.x);
    assert!(pos.x > 40.0, "should have reached the wall, got x = {}", pos.x);
    // The deflected component keeps moving.
    assert!(pos.z > 100.0, "should slide along the wall, got z = {}", pos.z);

    let impacts = app.world().resource::<Messages<ImpactMessage>>();
    assert!(!impacts.is_empty(), "pushing a wall should publish impacts");
}

#[test]
fn attaching_lands_and_becomes_walking() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    let character = spawn_character(&mut app, Vec3::new(0.0, 400.0, 0.0), ModeName::Attaching);

    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 400.0, 0.0), ModeName::Attaching);

    let mut landed_tick = None;
    for i in 0..180 {
        tick(&mut app);
        if mode_of(&app, character) == ModeName::Walking {
            landed_tick = Some(i);
            break;
        }
    }
    let landed_tick = landed_tick.expect("character should land within three seconds");
    // Free fall over ~300 units at 980/s^2 takes ~0.8 s.
    assert!(landed_tick > 20, "landing should not be instantaneous");

    let landings = app.world().resource::<Messages<AttachLanded>>();
    assert!(!landings.is_empty(), "landing should publish AttachLanded");

    // Landing zeroes velocity; the rest height follows shortly after.
    assert!(velocity_of(&app, character).length() < 1.0);
    run_ticks(&mut app, 30);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    let pos = position_of(&app, character);
    assert!(
        (pos.y - REST_HEIGHT).abs() < 2.0,
        "should rest on the floor, got y = {}",
        pos.y
    );
}

#[test]
fn attaching_with_nothing_in_range_hands_off_to_zero_g() {
    let mut app = create_test_app();

    // No geometry anywhere.
    let character = spawn_character(&mut app, Vec3::ZERO, ModeName::Attaching);

    run_ticks(&mut app, 5);
    assert_eq!(mode_of(&app, character), ModeName::ZeroG);

    // Zero-g is absorbing: nothing pulls the character back out.
    run_ticks(&mut app, 60);
    assert_eq!(mode_of(&app, character), ModeName::ZeroG);
}

#[test]
fn zero_g_speed_clamps_and_momentum_is_conserved() {
    let mut app = create_test_app();

    let character = spawn_character(&mut app, Vec3::ZERO, ModeName::ZeroG);
    let max_speed = SharedMovementSettings::default().zero_g_max_speed;

    run_ticks(&mut app, 2);
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            move_input_type: MoveInputType::Intent,
            move_input: Vec3::X,
            ..default()
        },
    );

    // 800/s^2 against a 6400 cap: well past saturation after ten seconds.
    run_ticks(&mut app, 600);
    let v = velocity_of(&app, character);
    assert!(v.length() <= max_speed + 0.5, "speed {} exceeds cap", v.length());
    assert!((v.length() - max_speed).abs() < 10.0, "should saturate at max, got {}", v.length());

    // Release the input: with zero deceleration momentum is conserved exactly.
    set_inputs(&mut app, character, CharacterInputs::default());
    tick(&mut app);
    let coasting = velocity_of(&app, character);
    run_ticks(&mut app, 60);
    let later = velocity_of(&app, character);
    assert!(
        (later - coasting).length() < 1e-3,
        "coasting velocity changed from {coasting} to {later}"
    );
}

#[test]
fn jump_launches_through_attaching_and_relands() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);

    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    run_ticks(&mut app, 10);

    let pre_jump_y = position_of(&app, character).y;
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            jump_pressed: true,
            jump_just_pressed: true,
            ..default()
        },
    );
    tick(&mut app);
    set_inputs(&mut app, character, CharacterInputs::default());

    assert_eq!(mode_of(&app, character), ModeName::Attaching);
    assert!(
        velocity_of(&app, character).y > 0.0,
        "jump should carry upward velocity"
    );

    // The jump itself consumes no time: the whole tick is handed to attaching
    // and simulated in the same frame, so roughly jump_speed * dt of rise shows
    // up immediately. No rise means the refund was lost; more than one tick's
    // worth means time was double-counted.
    let risen = position_of(&app, character).y - pre_jump_y;
    assert!(risen > 5.0, "refunded tick should produce lift, got {risen}");
    assert!(risen < 12.0, "lift should be one tick's worth, got {risen}");

    let start_y = position_of(&app, character).y;
    run_ticks(&mut app, 20);
    assert!(
        position_of(&app, character).y > start_y + 50.0,
        "jump should gain height"
    );

    // 500 up against 980 gravity: back on the floor in roughly a second.
    let mut relanded = false;
    for _ in 0..180 {
        tick(&mut app);
        if mode_of(&app, character) == ModeName::Walking {
            relanded = true;
            break;
        }
    }
    assert!(relanded, "jump should end back in walking");
}

#[test]
fn teleport_is_exact_and_drops_the_floor_cache() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);

    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    run_ticks(&mut app, 10);

    let target = Vec3::new(500.0, 92.0, 200.0);
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            teleport_target: Some(target),
            ..default()
        },
    );
    tick(&mut app);
    set_inputs(&mut app, character, CharacterInputs::default());

    // The teleport is the tick's only movement: nothing else runs on top.
    assert_eq!(position_of(&app, character), target);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    assert!(
        app.world()
            .get::<Blackboard>(character)
            .unwrap()
            .try_get_last_floor()
            .is_none(),
        "teleport should drop the cached floor"
    );

    // Simulation resumes normally from the target.
    run_ticks(&mut app, 30);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    let pos = position_of(&app, character);
    assert!((pos.x - target.x).abs() < 0.1 && (pos.z - target.z).abs() < 0.1);
}

#[test]
fn walking_reuses_the_cached_floor_before_probing() {
    let mut app = create_test_app();

    // No geometry at all: any floor probe would come up empty.
    let character = spawn_character(&mut app, Vec3::ZERO, ModeName::Walking);

    let fake_hit = MoveHit {
        blocking: true,
        start_penetrating: false,
        time: 0.1,
        distance: 2.15,
        point: Vec3::new(0.0, -92.15, 0.0),
        normal: Vec3::Y,
        location: Vec3::ZERO,
        entity: Entity::PLACEHOLDER,
    };
    let cached = FloorResult {
        blocking_hit: true,
        walkable: true,
        line_trace: false,
        floor_dist: 2.15,
        line_dist: 2.15,
        hit: Some(fake_hit),
    };
    app.world_mut()
        .get_mut::<Blackboard>(character)
        .unwrap()
        .set_last_floor(cached);

    // A walking tick that probed first would find nothing and hand off to
    // attaching; honoring the cache keeps it walking.
    tick(&mut app);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
    tick(&mut app);
    assert_eq!(mode_of(&app, character), ModeName::Walking);
}

#[test]
fn rejected_step_up_rolls_back_and_still_reports_the_impact() {
    let mut app = create_test_app();

    spawn_box(&mut app, Vec3::new(0.0, -10.0, 0.0), Vec3::new(2000.0, 20.0, 2000.0));
    // Far taller than the 40 max step: every step-up attempt must be rejected.
    spawn_box(&mut app, Vec3::new(150.0, 200.0, 0.0), Vec3::new(100.0, 400.0, 2000.0));

    let character = spawn_character(&mut app, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    run_ticks(&mut app, 5);
    reset_character(&mut app, character, Vec3::new(0.0, 92.0, 0.0), ModeName::Walking);
    // Dead-on into the wall: no slide direction, so a rejected step-up must
    // leave the position alone.
    set_inputs(
        &mut app,
        character,
        CharacterInputs {
            move_input_type: MoveInputType::Intent,
            move_input: Vec3::X,
            ..default()
        },
    );

    run_ticks(&mut app, 150);
    let pinned = position_of(&app, character);
    assert!(pinned.x < 100.0, "must stop at the wall, got x = {}", pinned.x);

    app.world_mut()
        .resource_mut::<Messages<ImpactMessage>>()
        .clear();
    tick(&mut app);

    let pos = position_of(&app, character);
    // The step-up transaction raises and advances a scratch position; any leak
    // from a rejected attempt would show up vertically.
    assert_eq!(pos.y, pinned.y, "rejected step-up must not leave height changes");
    assert_eq!(pos.z, pinned.z);
    assert!((pos.x - pinned.x).abs() < 1e-3, "pinned position should not creep");

    // Both the blocked move and the step-up's forward probe struck the wall;
    // a rolled-back step must still report its hit.
    let impacts = app.world().resource::<Messages<ImpactMessage>>();
    assert!(
        impacts.len() >= 2,
        "expected the blocked move and the step-up forward hit, got {}",
        impacts.len()
    );
}
