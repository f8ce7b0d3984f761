use bevy::prelude::*;

use super::floor::{find_floor, is_walkable, FloorResult};
use super::geometry::{
    angular_velocity_toward, clamp_to_max_size, degrees_to_quat, is_nearly_zero,
    project_onto_plane,
};
use super::hit::MoveHit;
use super::input::CharacterInputs;
use super::safemove::{apply_teleport, safe_move, MoveContext, SimScratch};
use super::settings::SharedMovementSettings;
use super::slide::{is_valid_landing_spot, try_fall_along_surface};
use super::state::{Blackboard, ModeName, ProposedMove, SyncState, TickEndState};

/// Landings with less unconsumed time than this don't bother re-dispatching.
const MIN_REFUND_SECONDS: f32 = 1e-4;

/// Airborne velocity law: prior momentum (clamped) plus reduced steering and
/// full gravity.
pub fn compute_attach_velocity(
    prior_velocity: Vec3,
    intent: Vec3,
    gravity: Vec3,
    settings: &SharedMovementSettings,
    dt: f32,
) -> Vec3 {
    let steering = intent * settings.zero_g_acceleration * settings.air_control_percentage;
    clamp_to_max_size(prior_velocity, settings.zero_g_max_speed) + (steering + gravity) * dt
}

/// Proposes this tick's airborne velocities. Pure.
pub fn generate_move(
    settings: &SharedMovementSettings,
    inputs: &CharacterInputs,
    sync: &SyncState,
    dt: f32,
) -> ProposedMove {
    if let Some(target) = inputs.teleport_target {
        return ProposedMove {
            target_location: Some(target),
            ..default()
        };
    }

    let up = sync.up();
    let mut gravity = inputs.gravity_acceleration;
    if is_nearly_zero(gravity) {
        gravity = -up * settings.default_gravity_accel;
    }

    let intent = inputs.move_intent(settings.zero_g_max_speed);
    let linear_velocity = compute_attach_velocity(sync.velocity, intent, gravity, settings, dt);

    let intended_forward = project_onto_plane(inputs.orientation_intent, up);
    let angular_velocity = if intended_forward != Vec3::ZERO {
        angular_velocity_toward(sync.forward(), intended_forward, dt, settings.zero_g_turning_rate)
    } else {
        Vec3::ZERO
    };

    ProposedMove {
        linear_velocity,
        angular_velocity,
        target_location: None,
    }
}

/// Attaching tick body: orient toward the nearest surface below, fall toward
/// it, and land when the contact can bear the character. With no surface in
/// attach range the character is in open space and hands off to zero-g.
#[allow(clippy::too_many_arguments)]
pub fn simulate(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    proposed: &ProposedMove,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    dt: f32,
    step_ms: f32,
) -> TickEndState {
    if let Some(target) = proposed.target_location {
        return apply_teleport(scratch, sync, blackboard, target, step_ms);
    }

    let mut up = sync.up();

    // The surface we're falling toward: last tick's cached contact, or a probe
    // straight down. Nothing within range means open space.
    let surface_normal = blackboard
        .try_get_last_floor()
        .and_then(|f| f.hit)
        .map(|h| h.normal)
        .or_else(|| {
            ctx.line_trace(sync.position, -up, settings.max_attach_distance)
                .map(|h| h.normal)
        });
    let Some(surface_normal) = surface_normal else {
        blackboard.invalidate_all();
        return TickEndState::handoff(ModeName::ZeroG, step_ms);
    };

    // Re-blend orientation so local down points at the target surface.
    let gravity_quat = Quat::from_rotation_arc(up, surface_normal);
    sync.orientation = (gravity_quat * sync.orientation).normalize();
    up = sync.up();

    let spin = proposed.angular_velocity * dt;
    if spin != Vec3::ZERO {
        sync.orientation = (degrees_to_quat(spin) * sync.orientation).normalize();
    }

    let move_delta = proposed.linear_velocity * dt;
    let hit = safe_move(
        ctx,
        &mut scratch.record,
        "move",
        &mut sync.position,
        sync.orientation,
        move_delta,
        true,
    );

    let Some(hit) = hit else {
        sync.velocity = scratch.record.effective_velocity(dt);
        return TickEndState::finished();
    };

    if is_valid_landing_spot(ctx, settings, sync.position, sync.orientation, up, &hit) {
        return land(ctx, scratch, settings, sync, blackboard, &hit, hit.time, step_ms);
    }

    // Struck something unlandable: remember it as the surface we're tracking
    // and slide off it, then see whether the slide found a landing.
    let mut grazed = FloorResult::default();
    let walkable = is_walkable(ctx, &hit, up, settings);
    grazed.set_from_sweep(hit, hit.distance, walkable);
    blackboard.set_last_floor(grazed);

    scratch.note_impact(hit, move_delta);
    let (slide_pct, slide_hit) = try_fall_along_surface(
        ctx,
        scratch,
        &mut sync.position,
        sync.orientation,
        move_delta,
        1.0 - hit.time,
        &hit,
    );

    if let Some(slide_hit) = slide_hit {
        if is_valid_landing_spot(ctx, settings, sync.position, sync.orientation, up, &slide_hit) {
            let applied = hit.time + (1.0 - hit.time) * slide_pct;
            return land(
                ctx, scratch, settings, sync, blackboard, &slide_hit, applied, step_ms,
            );
        }
    }

    sync.velocity = scratch.record.effective_velocity(dt);
    TickEndState::finished()
}

/// Finalizes a landing: velocity zeroed, floor cached, landing published, and
/// any meaningful unconsumed time refunded to the walking mode.
#[allow(clippy::too_many_arguments)]
fn land(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    hit: &MoveHit,
    pct_applied: f32,
    step_ms: f32,
) -> TickEndState {
    sync.velocity = Vec3::ZERO;

    let floor = find_floor(ctx, settings, sync.position, sync.orientation, sync.up());
    blackboard.set_last_floor(floor);
    scratch.landed = Some(*hit);

    let remaining_pct = (1.0 - pct_applied).clamp(0.0, 1.0);
    let refund_ms = if remaining_pct * step_ms >= MIN_REFUND_SECONDS * 1000.0 {
        remaining_pct * step_ms
    } else {
        0.0
    };
    TickEndState::handoff(ModeName::Walking, refund_ms)
}
