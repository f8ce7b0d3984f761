use bevy::prelude::*;

use super::geometry::{clamp_to_max_size, degrees_to_quat, normalize_axis_degrees};
use super::input::CharacterInputs;
use super::safemove::{apply_teleport, safe_move, MoveContext, SimScratch};
use super::settings::SharedMovementSettings;
use super::slide::try_fall_along_surface;
use super::state::{Blackboard, ProposedMove, SyncState, TickEndState};

/// Free-flight velocity law: accelerate, clamp, then retain.
///
/// With the default zero deceleration momentum is conserved exactly; holding
/// the dampening input switches to the braking retention factor.
pub fn compute_free_velocity(
    prior_velocity: Vec3,
    intent: Vec3,
    braking: bool,
    settings: &SharedMovementSettings,
    dt: f32,
) -> Vec3 {
    let deceleration = if braking {
        settings.linear_braking_scale
    } else {
        settings.zero_g_deceleration
    };
    let accelerated = prior_velocity + intent * settings.zero_g_acceleration * dt;
    (1.0 - deceleration) * clamp_to_max_size(accelerated, settings.zero_g_max_speed)
}

/// Proposes this tick's free-flight velocities. Pure.
///
/// The angular velocity is the raw input request, wrapped per axis to
/// [-180, 180] and clamped to the zero-g turning rate.
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

    let intent = inputs.move_intent(settings.zero_g_max_speed);
    let linear_velocity =
        compute_free_velocity(sync.velocity, intent, inputs.jump_pressed, settings, dt);

    let mut angular_velocity = Vec3::new(
        normalize_axis_degrees(inputs.angular_velocity.x),
        normalize_axis_degrees(inputs.angular_velocity.y),
        normalize_axis_degrees(inputs.angular_velocity.z),
    );
    if settings.zero_g_turning_rate >= 0.0 {
        angular_velocity = angular_velocity.clamp(
            Vec3::splat(-settings.zero_g_turning_rate),
            Vec3::splat(settings.zero_g_turning_rate),
        );
    }

    ProposedMove {
        linear_velocity,
        angular_velocity,
        target_location: None,
    }
}

/// Zero-g tick body: drift, spin, and slide off anything grazed. There is no
/// floor, no base, and no transition out; only external intent (attaching via
/// the host switching modes, or a teleport) ends free flight.
pub fn simulate(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    proposed: &ProposedMove,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    dt: f32,
    step_ms: f32,
) -> TickEndState {
    if let Some(target) = proposed.target_location {
        return apply_teleport(scratch, sync, blackboard, target, step_ms);
    }

    // Free flight holds no surface contacts.
    blackboard.invalidate_all();
    sync.base_info = None;

    // Spin is pilot-relative, so it applies in the local frame.
    let spin = proposed.angular_velocity * dt;
    if spin != Vec3::ZERO {
        sync.orientation = (sync.orientation * degrees_to_quat(spin)).normalize();
    }

    let move_delta = proposed.linear_velocity * dt;
    if let Some(hit) = safe_move(
        ctx,
        &mut scratch.record,
        "move",
        &mut sync.position,
        sync.orientation,
        move_delta,
        true,
    ) {
        scratch.note_impact(hit, move_delta);
        try_fall_along_surface(
            ctx,
            scratch,
            &mut sync.position,
            sync.orientation,
            move_delta,
            1.0 - hit.time,
            &hit,
        );
    }

    sync.velocity = scratch.record.effective_velocity(dt);
    TickEndState::finished()
}
