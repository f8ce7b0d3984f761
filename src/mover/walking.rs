use bevy::prelude::*;

use super::floor::{find_floor, is_walkable, FloorResult};
use super::geometry::{
    angular_velocity_toward, clamp_to_max_size, degrees_to_quat, is_nearly_zero,
    project_onto_plane,
};
use super::height::adjust_height_above_floor;
use super::input::CharacterInputs;
use super::layered::{LayeredMove, LayeredMoveQueue};
use super::safemove::{
    apply_teleport, penetration_adjustment, resolve_penetration, safe_move, MoveContext,
    SimScratch,
};
use super::settings::SharedMovementSettings;
use super::slide::try_walk_slide;
use super::state::{Blackboard, ModeName, ProposedMove, RelativeBaseInfo, SyncState, TickEndState};
use super::stepup::try_step_up;

/// Below this speed braking snaps the character to a stop.
const BRAKE_TO_STOP_SPEED: f32 = 10.0;

/// Speeds beyond this fraction of max are braked even under input.
const OVER_MAX_SPEED_TOLERANCE: f32 = 1.01;

/// Ground velocity integration: friction-assisted acceleration under input,
/// friction-plus-deceleration braking otherwise.
///
/// `prior_velocity` must already lie in the movement plane; `intent_dir` is a
/// unit direction (or zero) with `intent_strength` in 0..=1.
pub fn compute_ground_velocity(
    prior_velocity: Vec3,
    intent_dir: Vec3,
    intent_strength: f32,
    settings: &SharedMovementSettings,
    dt: f32,
) -> Vec3 {
    let speed = prior_velocity.length();
    let exceeding = speed > settings.max_speed * OVER_MAX_SPEED_TOLERANCE;
    let has_input = intent_strength > f32::EPSILON && intent_dir != Vec3::ZERO;

    if has_input && !exceeding {
        // Friction here doesn't shed speed, it redirects it: existing momentum
        // is pulled toward the input direction before accelerating.
        let turn_assist = (settings.ground_friction * settings.turning_boost * dt).min(1.0);
        let mut velocity = prior_velocity - (prior_velocity - intent_dir * speed) * turn_assist;
        velocity += intent_dir * settings.acceleration * dt;
        clamp_to_max_size(velocity, settings.max_speed * intent_strength)
    } else {
        if speed <= BRAKE_TO_STOP_SPEED {
            return Vec3::ZERO;
        }
        let friction = if settings.use_separate_braking_friction {
            settings.braking_friction
        } else {
            settings.ground_friction
        } * settings.braking_friction_factor;

        let reverse = -prior_velocity / speed;
        let velocity =
            prior_velocity + (-friction * prior_velocity + reverse * settings.deceleration) * dt;
        if velocity.dot(prior_velocity) <= 0.0 || velocity.length() <= BRAKE_TO_STOP_SPEED {
            Vec3::ZERO
        } else {
            velocity
        }
    }
}

/// Redirects a movement delta along a walkable ramp, keeping the component
/// perpendicular to `up` unchanged so ground speed is unaffected by slope.
pub fn compute_ramp_deflection(delta: Vec3, ramp_normal: Vec3, up: Vec3) -> Vec3 {
    let floor_dot = ramp_normal.dot(up);
    if floor_dot < 1.0 - 1e-4 && floor_dot > f32::EPSILON {
        let horizontal = project_onto_plane(delta, up);
        horizontal + up * (-(ramp_normal.dot(horizontal)) / floor_dot)
    } else {
        delta
    }
}

/// Proposes this tick's walking velocities. Pure: no world access, no state
/// mutation.
pub fn generate_move(
    settings: &SharedMovementSettings,
    inputs: &CharacterInputs,
    sync: &SyncState,
    last_floor: Option<&FloorResult>,
    dt: f32,
) -> ProposedMove {
    if let Some(target) = inputs.teleport_target {
        return ProposedMove {
            target_location: Some(target),
            ..default()
        };
    }

    let up = sync.up();
    let plane_normal = last_floor
        .filter(|f| f.is_walkable_floor())
        .and_then(|f| f.hit)
        .map_or(up, |h| h.normal);

    let prior_velocity = project_onto_plane(sync.velocity, plane_normal);
    let intent = project_onto_plane(inputs.move_intent(settings.max_speed), plane_normal);
    let intent_strength = intent.length().min(1.0);
    let intent_dir = intent.normalize_or_zero();

    let linear_velocity =
        compute_ground_velocity(prior_velocity, intent_dir, intent_strength, settings, dt);

    let intended_forward = project_onto_plane(inputs.orientation_intent, up);
    let angular_velocity = if intended_forward != Vec3::ZERO {
        angular_velocity_toward(sync.forward(), intended_forward, dt, settings.turning_rate)
    } else {
        Vec3::ZERO
    };

    ProposedMove {
        linear_velocity,
        angular_velocity,
        target_location: None,
    }
}

/// Walking tick body: floor tracking, orientation re-blend, collision-resolved
/// movement with step-up and slide, height maintenance, and base capture.
#[allow(clippy::too_many_arguments)]
pub fn simulate(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    inputs: &CharacterInputs,
    proposed: &ProposedMove,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    layered: &mut LayeredMoveQueue,
    dt: f32,
    step_ms: f32,
) -> TickEndState {
    // Teleports are instantaneous: they consume no simulation time.
    if let Some(target) = proposed.target_location {
        return apply_teleport(scratch, sync, blackboard, target, step_ms);
    }

    // A jump hands the whole tick to the airborne mode with the impulse queued.
    if inputs.jump_just_pressed {
        layered.queue(LayeredMove::JumpImpulse {
            upwards_speed: settings.jump_upwards_speed,
        });
        blackboard.invalidate_all();
        sync.base_info = None;
        return TickEndState::handoff(ModeName::Attaching, step_ms);
    }

    let mut up = sync.up();
    // Last tick's floor is still valid at this position; probe only on a miss.
    let mut floor = match blackboard.try_get_last_floor() {
        Some(cached) => *cached,
        None => find_floor(ctx, settings, sync.position, sync.orientation, up),
    };

    let start_penetrating = floor.hit.is_some_and(|h| h.start_penetrating);
    if !floor.is_walkable_floor() && !start_penetrating {
        blackboard.invalidate_last_floor();
        sync.base_info = None;
        return TickEndState::handoff(ModeName::Attaching, step_ms);
    }

    // Re-blend orientation so local up tracks the floor normal.
    if floor.is_walkable_floor() {
        if let Some(floor_hit) = floor.hit {
            let gravity_quat = Quat::from_rotation_arc(up, floor_hit.normal);
            sync.orientation = (gravity_quat * sync.orientation).normalize();
            up = sync.up();
        }
    }

    let spin = proposed.angular_velocity * dt;
    if spin != Vec3::ZERO {
        sync.orientation = (degrees_to_quat(spin) * sync.orientation).normalize();
    }

    let desired_delta = proposed.linear_velocity * dt;
    let did_attempt_movement = !is_nearly_zero(desired_delta);
    let mut pct_applied = 1.0;

    if did_attempt_movement {
        let mut move_delta = desired_delta;
        if floor.is_walkable_floor() && !floor.line_trace {
            if let Some(floor_hit) = floor.hit {
                move_delta = compute_ramp_deflection(desired_delta, floor_hit.normal, up);
            }
        }

        if let Some(hit) = safe_move(
            ctx,
            &mut scratch.record,
            "move",
            &mut sync.position,
            sync.orientation,
            move_delta,
            true,
        ) {
            let mut pct = hit.time;
            let remaining_pct = 1.0 - hit.time;

            if !hit.start_penetrating && is_walkable(ctx, &hit, up, settings) {
                // Ran onto another walkable ramp mid-move: deflect along it.
                let ramp_delta =
                    compute_ramp_deflection(move_delta * remaining_pct, hit.normal, up);
                if let Some(ramp_hit) = safe_move(
                    ctx,
                    &mut scratch.record,
                    "ramp-move",
                    &mut sync.position,
                    sync.orientation,
                    ramp_delta,
                    true,
                ) {
                    scratch.note_impact(ramp_hit, ramp_delta);
                    pct += remaining_pct * ramp_hit.time;
                    let leftover_pct = remaining_pct * (1.0 - ramp_hit.time);
                    let slide_pct = try_walk_slide(
                        ctx,
                        scratch,
                        settings,
                        &mut sync.position,
                        sync.orientation,
                        up,
                        move_delta,
                        leftover_pct,
                        &ramp_hit,
                    );
                    pct += leftover_pct * slide_pct;
                } else {
                    pct = 1.0;
                }
            } else {
                scratch.note_impact(hit, move_delta);

                let mut step_floor = None;
                let stepped = try_step_up(
                    ctx,
                    scratch,
                    settings,
                    &mut sync.position,
                    sync.orientation,
                    up,
                    move_delta * remaining_pct,
                    &hit,
                    &floor,
                    &mut step_floor,
                );
                if stepped {
                    if let Some(found) = step_floor {
                        floor = found;
                    }
                    pct = 1.0;
                } else {
                    let slide_pct = try_walk_slide(
                        ctx,
                        scratch,
                        settings,
                        &mut sync.position,
                        sync.orientation,
                        up,
                        move_delta,
                        remaining_pct,
                        &hit,
                    );
                    pct += remaining_pct * slide_pct;
                }
            }
            pct_applied = pct.clamp(0.0, 1.0);
        }

        floor = find_floor(ctx, settings, sync.position, sync.orientation, up);
        if floor.is_walkable_floor() {
            adjust_height_above_floor(
                ctx,
                scratch,
                settings,
                &mut sync.position,
                sync.orientation,
                up,
                &mut floor,
            );
        } else if !floor.hit.is_some_and(|h| h.start_penetrating) {
            // Walked off the edge: the rest of the tick belongs to the air.
            sync.velocity = scratch.record.effective_velocity(dt);
            blackboard.invalidate_last_floor();
            sync.base_info = None;
            return TickEndState::handoff(ModeName::Attaching, step_ms * (1.0 - pct_applied));
        }
    } else {
        // Stationary: escape any penetration the floor probe reported, then
        // keep the float height honest.
        if let Some(floor_hit) = floor.hit {
            if floor_hit.start_penetrating {
                let adjustment = penetration_adjustment(&floor_hit);
                resolve_penetration(
                    ctx,
                    &mut scratch.record,
                    &mut sync.position,
                    sync.orientation,
                    adjustment,
                );
                floor = find_floor(ctx, settings, sync.position, sync.orientation, up);
            }
        }
        if floor.is_walkable_floor() {
            adjust_height_above_floor(
                ctx,
                scratch,
                settings,
                &mut sync.position,
                sync.orientation,
                up,
                &mut floor,
            );
        }
    }

    capture_final_state(ctx, scratch, sync, blackboard, floor, did_attempt_movement, dt);
    TickEndState::finished()
}

/// Derives the tick's effective velocity and records the floor and any dynamic
/// base contact. While stationary on the same base the stored local contact
/// point is frozen so the character doesn't creep across a moving platform.
fn capture_final_state(
    ctx: &MoveContext,
    scratch: &SimScratch,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    floor: FloorResult,
    did_attempt_movement: bool,
    dt: f32,
) {
    sync.velocity = scratch.record.effective_velocity(dt);

    if floor.is_walkable_floor() {
        if let Some(floor_hit) = floor.hit {
            if ctx.is_dynamic_base(floor_hit.entity) {
                let same_base = sync
                    .base_info
                    .is_some_and(|b| b.base == floor_hit.entity);
                if !(same_base && !did_attempt_movement) {
                    if let Some(local) = ctx.base_local_point(floor_hit.entity, floor_hit.point) {
                        sync.base_info = Some(RelativeBaseInfo {
                            base: floor_hit.entity,
                            contact_local_position: local,
                        });
                    }
                }
            } else {
                sync.base_info = None;
            }
        }
        if let Some(base) = sync.base_info {
            blackboard.set_last_base(base);
        } else {
            blackboard.invalidate_last_base();
        }
    } else {
        sync.base_info = None;
        blackboard.invalidate_last_base();
    }
    blackboard.set_last_floor(floor);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SharedMovementSettings {
        SharedMovementSettings::default()
    }

    #[test]
    fn accelerates_toward_input() {
        let s = settings();
        let v = compute_ground_velocity(Vec3::ZERO, Vec3::X, 1.0, &s, 1.0 / 60.0);
        assert!(v.x > 0.0);
        assert!(v.y.abs() < 1e-5 && v.z.abs() < 1e-5);
    }

    #[test]
    fn speed_clamps_at_max() {
        let s = settings();
        let mut v = Vec3::ZERO;
        for _ in 0..600 {
            v = compute_ground_velocity(v, Vec3::X, 1.0, &s, 1.0 / 60.0);
        }
        assert!(v.length() <= s.max_speed + 1e-2, "speed {}", v.length());
        assert!((v.length() - s.max_speed).abs() < 1.0);
    }

    #[test]
    fn partial_intent_targets_partial_speed() {
        let s = settings();
        let mut v = Vec3::ZERO;
        for _ in 0..600 {
            v = compute_ground_velocity(v, Vec3::X, 0.5, &s, 1.0 / 60.0);
        }
        assert!((v.length() - s.max_speed * 0.5).abs() < 1.0);
    }

    #[test]
    fn braking_reaches_exact_zero() {
        let s = settings();
        let mut v = Vec3::X * s.max_speed;
        for _ in 0..600 {
            v = compute_ground_velocity(v, Vec3::ZERO, 0.0, &s, 1.0 / 60.0);
        }
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn braking_never_reverses_direction() {
        let s = settings();
        let start = Vec3::new(300.0, 0.0, 100.0);
        let mut v = start;
        for _ in 0..600 {
            let next = compute_ground_velocity(v, Vec3::ZERO, 0.0, &s, 1.0 / 60.0);
            assert!(next == Vec3::ZERO || next.dot(start) > 0.0);
            v = next;
        }
    }

    #[test]
    fn ramp_deflection_preserves_horizontal_motion() {
        let up = Vec3::Y;
        let ramp_normal = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let delta = Vec3::new(10.0, 0.0, 0.0);

        let deflected = compute_ramp_deflection(delta, ramp_normal, up);
        assert_eq!(project_onto_plane(deflected, up), delta);
        // Moving into the ramp must gain height along it.
        assert!(deflected.y > 0.0);
        // And end up tangent to the ramp.
        assert!(deflected.dot(ramp_normal).abs() < 1e-4);
    }

    #[test]
    fn flat_floor_leaves_delta_unchanged() {
        let delta = Vec3::new(5.0, 0.0, 3.0);
        assert_eq!(compute_ramp_deflection(delta, Vec3::Y, Vec3::Y), delta);
    }

    #[test]
    fn teleport_proposal_carries_no_velocity() {
        let s = settings();
        let inputs = CharacterInputs {
            teleport_target: Some(Vec3::new(100.0, 0.0, 0.0)),
            ..default()
        };
        let sync = SyncState::default();
        let proposed = generate_move(&s, &inputs, &sync, None, 1.0 / 60.0);
        assert_eq!(proposed.target_location, Some(Vec3::new(100.0, 0.0, 0.0)));
        assert_eq!(proposed.linear_velocity, Vec3::ZERO);
    }
}
