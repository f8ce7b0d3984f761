use bevy::prelude::*;

use super::floor::{find_floor, is_walkable, is_within_edge_tolerance};
use super::geometry::{
    compute_slide_delta, compute_two_wall_adjusted_delta, project_onto_plane, SMALL_MOVE_DISTANCE,
};
use super::hit::MoveHit;
use super::safemove::{safe_move, MoveContext, SimScratch};
use super::settings::SharedMovementSettings;

/// Deflects a blocked ground move along the blocking surface.
///
/// Unwalkable surfaces that tilt upward are treated as walls: their normal is
/// flattened into the movement plane so the slide can't climb them. When the
/// slide itself is blocked, the move continues along the crease of the two
/// surfaces; a crease direction that gains height is capped at the step height
/// if the second surface is walkable, flattened otherwise.
///
/// Returns the fraction of the requested slide that was applied.
pub fn try_walk_slide(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    position: &mut Vec3,
    rotation: Quat,
    up: Vec3,
    delta: Vec3,
    pct_to_apply: f32,
    hit: &MoveHit,
) -> f32 {
    let mut normal = hit.normal;
    if normal.dot(up) > 0.0 && !is_walkable(ctx, hit, up, settings) {
        normal = project_onto_plane(normal, up).normalize_or_zero();
        if normal == Vec3::ZERO {
            return 0.0;
        }
    }

    let slide_delta = compute_slide_delta(delta, pct_to_apply, normal);
    if slide_delta.dot(delta) <= 0.0 {
        return 0.0;
    }

    let second_hit = safe_move(
        ctx,
        &mut scratch.record,
        "slide",
        position,
        rotation,
        slide_delta,
        true,
    );
    let mut pct_applied = second_hit.as_ref().map_or(1.0, |h| h.time);

    if let Some(h2) = second_hit {
        scratch.note_impact(h2, slide_delta);

        let mut crease_delta =
            compute_two_wall_adjusted_delta(slide_delta, h2.time, h2.normal, normal);

        let vertical = crease_delta.dot(up);
        if vertical > 0.0 {
            if is_walkable(ctx, &h2, up, settings) {
                let capped = vertical.min(settings.max_step_height);
                crease_delta = project_onto_plane(crease_delta, up) + up * capped;
            } else {
                crease_delta = project_onto_plane(crease_delta, up);
            }
        }

        if crease_delta.length() > SMALL_MOVE_DISTANCE && crease_delta.dot(slide_delta) > 0.0 {
            let third_hit = safe_move(
                ctx,
                &mut scratch.record,
                "slide",
                position,
                rotation,
                crease_delta,
                true,
            );
            let second_pct = third_hit.as_ref().map_or(1.0, |h| h.time);
            if let Some(h3) = third_hit {
                scratch.note_impact(h3, crease_delta);
            }
            pct_applied += second_pct * (1.0 - pct_applied);
        }
    }

    pct_applied.clamp(0.0, 1.0)
}

/// Deflects a blocked airborne move along the blocking surface.
///
/// Unlike the ground variant there is no wall flattening or step-height cap;
/// airborne characters slide off whatever they graze. Returns the fraction
/// applied and the last blocking hit, so the caller can re-test for a landing.
pub fn try_fall_along_surface(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    position: &mut Vec3,
    rotation: Quat,
    delta: Vec3,
    pct_to_apply: f32,
    hit: &MoveHit,
) -> (f32, Option<MoveHit>) {
    let normal = hit.normal;
    let slide_delta = compute_slide_delta(delta, pct_to_apply, normal);
    if slide_delta.dot(delta) <= 0.0 {
        return (0.0, None);
    }

    let second_hit = safe_move(
        ctx,
        &mut scratch.record,
        "fall-slide",
        position,
        rotation,
        slide_delta,
        true,
    );
    let mut pct_applied = second_hit.as_ref().map_or(1.0, |h| h.time);
    let mut last_hit = second_hit;

    if let Some(h2) = second_hit {
        scratch.note_impact(h2, slide_delta);

        let crease_delta =
            compute_two_wall_adjusted_delta(slide_delta, h2.time, h2.normal, normal);
        if crease_delta.length() > SMALL_MOVE_DISTANCE && crease_delta.dot(slide_delta) > 0.0 {
            let third_hit = safe_move(
                ctx,
                &mut scratch.record,
                "fall-slide",
                position,
                rotation,
                crease_delta,
                true,
            );
            let second_pct = third_hit.as_ref().map_or(1.0, |h| h.time);
            if let Some(h3) = third_hit {
                scratch.note_impact(h3, crease_delta);
                last_hit = Some(h3);
            }
            pct_applied += second_pct * (1.0 - pct_applied);
        }
    }

    (pct_applied.clamp(0.0, 1.0), last_hit)
}

/// Whether a blocking hit is somewhere the character can come to rest.
///
/// Requires a non-penetrating contact on the lower hemisphere, a walkable
/// surface within edge tolerance, and a confirming floor probe at the landing
/// position.
pub fn is_valid_landing_spot(
    ctx: &MoveContext,
    settings: &SharedMovementSettings,
    position: Vec3,
    rotation: Quat,
    up: Vec3,
    hit: &MoveHit,
) -> bool {
    if hit.start_penetrating {
        return false;
    }
    if !is_walkable(ctx, hit, up, settings) {
        return false;
    }
    // Contact must be under the capsule, not on its side.
    let contact_height = (hit.point - hit.location).dot(up);
    if contact_height > -(ctx.half_height - ctx.radius) + 1e-3 {
        return false;
    }
    if !is_within_edge_tolerance(hit.location, hit.point, ctx.radius, up) {
        return false;
    }

    let floor = find_floor(ctx, settings, position, rotation, up);
    floor.is_walkable_floor()
}
