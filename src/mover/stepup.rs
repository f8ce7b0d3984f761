use bevy::prelude::*;

use super::floor::{find_floor, is_walkable, is_within_edge_tolerance, FloorResult, MAX_FLOOR_DIST};
use super::hit::MoveHit;
use super::safemove::{safe_move, MoveContext, SimScratch};
use super::settings::SharedMovementSettings;
use super::slide::try_walk_slide;

/// Minimum steepness (`barrier_normal . up`) of a barrier's top edge for the
/// character to perch on it when the landing floor probe finds nothing.
pub const MAX_STEP_SIDE: f32 = 0.08;

/// Attempts to step up over a blocking barrier: up, forward, slide, down.
///
/// The whole sequence runs against a scratch position and a private record;
/// no movement is visible to the caller until every rejection test passes, at
/// which point the final position, substeps, and slide impacts are committed
/// and the floor found at the landing point is returned through `out_floor`.
/// Any rejection leaves the caller's position untouched. The forward-phase
/// impact is reported either way, since the surface really was struck.
pub fn try_step_up(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    position: &mut Vec3,
    rotation: Quat,
    up: Vec3,
    move_delta: Vec3,
    hit: &MoveHit,
    current_floor: &FloorResult,
    out_floor: &mut Option<FloorResult>,
) -> bool {
    if settings.max_step_height <= 0.0 {
        return false;
    }
    if hit.start_penetrating || ctx.denies_step_up(hit.entity) {
        return false;
    }

    let rel_height = |point: Vec3| (point - *position).dot(up);

    // A contact on the upper hemisphere is an overhang, not a step.
    let impact_height = rel_height(hit.point);
    if impact_height > ctx.half_height - ctx.radius {
        return false;
    }

    // Locate our floor base and floor point relative to the capsule center.
    let mut floor_base_height = -ctx.half_height;
    let mut floor_point_height = floor_base_height;
    let mut travel_up = settings.max_step_height;
    if current_floor.is_walkable_floor() {
        let floor_dist = current_floor.floor_dist.max(0.0);
        floor_base_height -= floor_dist;
        travel_up = (settings.max_step_height - floor_dist).max(0.0);
        if !current_floor.line_trace {
            if let Some(floor_hit) = current_floor.hit {
                floor_point_height = rel_height(floor_hit.point);
            } else {
                floor_point_height -= floor_dist;
            }
        } else {
            floor_point_height -= floor_dist;
        }
    }

    // A contact below our floor base can't be stepped onto.
    if impact_height <= floor_base_height {
        return false;
    }

    let mut sub = SimScratch::default();
    let mut pos = *position;

    // Raise the capsule by the available step headroom.
    if let Some(up_hit) = safe_move(
        ctx,
        &mut sub.record,
        "step-up",
        &mut pos,
        rotation,
        up * travel_up,
        false,
    ) {
        if up_hit.start_penetrating {
            return false;
        }
    }

    // Try the original move from the raised position.
    if let Some(fwd_hit) = safe_move(
        ctx,
        &mut sub.record,
        "step-fwd",
        &mut pos,
        rotation,
        move_delta,
        true,
    ) {
        if fwd_hit.start_penetrating {
            return false;
        }
        // The forward hit is a real impact whether or not the step commits.
        scratch.note_impact(fwd_hit, move_delta);
        // A barrier whose top is still beyond the step height from our floor
        // point cannot be cleared by any step.
        if rel_height(fwd_hit.point) - floor_point_height > settings.max_step_height {
            return false;
        }
        let slide_pct = try_walk_slide(
            ctx,
            &mut sub,
            settings,
            &mut pos,
            rotation,
            up,
            move_delta,
            1.0 - fwd_hit.time,
            &fwd_hit,
        );
        if fwd_hit.time <= f32::EPSILON && slide_pct <= f32::EPSILON {
            // Neither the raised move nor its deflection went anywhere.
            return false;
        }
    }

    // Drop back down looking for the new floor.
    let travel_down = settings.max_step_height + 2.0 * MAX_FLOOR_DIST;
    let Some(down_hit) = safe_move(
        ctx,
        &mut sub.record,
        "step-down",
        &mut pos,
        rotation,
        -up * travel_down,
        false,
    ) else {
        return false;
    };
    if down_hit.start_penetrating {
        return false;
    }

    let delta_height = rel_height(down_hit.point) - floor_point_height;
    if delta_height > settings.max_step_height {
        return false;
    }

    let ended_higher = rel_height(down_hit.location) > 0.0;

    if !is_walkable(ctx, &down_hit, up, settings) {
        // An unwalkable landing opposing the move is a wall, not a step.
        if down_hit.normal.dot(move_delta.normalize_or_zero()) < 0.0 {
            return false;
        }
        if ended_higher {
            return false;
        }
    }

    if ended_higher && ctx.denies_step_up(down_hit.entity) {
        return false;
    }

    if !is_within_edge_tolerance(down_hit.location, down_hit.point, ctx.radius, up) {
        return false;
    }

    // Landing above our start: make sure we can actually stay there. A thin
    // ledge whose side is near-vertical and with no floor under the landing
    // point would leave us perched on nothing.
    let final_floor = find_floor(ctx, settings, pos, rotation, up);
    if ended_higher {
        let step_side = hit.normal.dot(up);
        if !final_floor.blocking_hit && step_side < MAX_STEP_SIDE {
            return false;
        }
    }

    *position = pos;
    scratch.record.absorb(sub.record);
    scratch.impacts.append(&mut sub.impacts);
    *out_floor = Some(final_floor);
    true
}
