use bevy::prelude::*;

use super::floor::{is_walkable, FloorResult, MAX_FLOOR_DIST, MIN_FLOOR_DIST};
use super::safemove::{safe_move, MoveContext, SimScratch};
use super::settings::SharedMovementSettings;

/// Signed distance to move along the floor normal to re-center the character
/// in the [`MIN_FLOOR_DIST`, `MAX_FLOOR_DIST`] band, or `None` when no
/// adjustment should happen.
///
/// When the floor distance came from the line-trace fallback, a sweep that
/// reads "too close" while the line reads "fine" is left alone; reacting to it
/// would pump the character up and down over sweep artifacts.
pub fn desired_height_adjustment(floor: &FloorResult) -> Option<f32> {
    if !floor.is_walkable_floor() {
        return None;
    }
    let mut floor_dist = floor.floor_dist;
    if floor.line_trace {
        if floor_dist < MIN_FLOOR_DIST && floor.line_dist >= MIN_FLOOR_DIST {
            return None;
        }
        floor_dist = floor.line_dist;
    }
    if (MIN_FLOOR_DIST..=MAX_FLOOR_DIST).contains(&floor_dist) {
        return None;
    }
    let target = (MIN_FLOOR_DIST + MAX_FLOOR_DIST) * 0.5;
    Some(target - floor_dist)
}

/// Nudges the character along the floor normal back into the float band.
///
/// The motion is recorded as non-velocity-relevant so it never shows up in the
/// character's reported speed. When a downward adjustment is blocked by a
/// walkable surface, that surface is adopted as the new floor.
pub fn adjust_height_above_floor(
    ctx: &MoveContext,
    scratch: &mut SimScratch,
    settings: &SharedMovementSettings,
    position: &mut Vec3,
    rotation: Quat,
    up: Vec3,
    floor: &mut FloorResult,
) {
    let Some(move_dist) = desired_height_adjustment(floor) else {
        return;
    };
    let old_floor_dist = if floor.line_trace {
        floor.line_dist
    } else {
        floor.floor_dist
    };

    let normal = floor.hit.map_or(up, |h| h.normal);
    let delta = normal * move_dist;

    scratch.record.lock_relevancy(false);
    let hit = safe_move(
        ctx,
        &mut scratch.record,
        "height-adjust",
        position,
        rotation,
        delta,
        false,
    );
    scratch.record.unlock_relevancy();

    let applied = hit.as_ref().map_or(1.0, |h| h.time);
    let new_dist = old_floor_dist + move_dist * applied;

    if let Some(h) = hit {
        if move_dist < 0.0 && is_walkable(ctx, &h, up, settings) {
            floor.set_from_sweep(h, new_dist, true);
            return;
        }
    }
    floor.floor_dist = new_dist;
    if floor.line_trace {
        floor.line_dist = new_dist;
    }
}
