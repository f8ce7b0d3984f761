use avian3d::prelude::*;
use bevy::prelude::*;

use super::geometry::project_onto_plane;
use super::hit::MoveHit;
use super::safemove::MoveContext;
use super::settings::SharedMovementSettings;

/// Below this distance the character is considered too close to the floor and
/// is lifted by the height maintainer.
pub const MIN_FLOOR_DIST: f32 = 1.9;

/// Above this distance (up to the sweep range) the character is lowered; a
/// floor further away than this is not "under" the character.
pub const MAX_FLOOR_DIST: f32 = 2.4;

/// Sweep contacts this close to the capsule's lateral edge are distrusted and
/// re-swept with a reduced radius.
pub const SWEEP_EDGE_REJECT_DISTANCE: f32 = 0.15;

/// Outcome of a floor probe.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloorResult {
    pub blocking_hit: bool,
    pub walkable: bool,
    /// The distance came from the line-trace fallback, not the sweep.
    pub line_trace: bool,
    /// Distance from the capsule bottom to the floor along the sweep.
    pub floor_dist: f32,
    /// Distance reported by the line-trace fallback, when used.
    pub line_dist: f32,
    pub hit: Option<MoveHit>,
}

impl FloorResult {
    pub fn is_walkable_floor(&self) -> bool {
        self.blocking_hit && self.walkable
    }

    pub fn set_from_sweep(&mut self, hit: MoveHit, sweep_floor_dist: f32, walkable: bool) {
        self.blocking_hit = hit.blocking && !hit.start_penetrating;
        self.walkable = walkable;
        self.line_trace = false;
        self.floor_dist = sweep_floor_dist;
        self.line_dist = sweep_floor_dist;
        self.hit = Some(hit);
    }

    /// Replaces the surface data with a line-trace hit while keeping the sweep
    /// distance. Only valid on top of an existing blocking sweep result.
    pub fn set_from_line_trace(
        &mut self,
        hit: MoveHit,
        sweep_floor_dist: f32,
        line_dist: f32,
        walkable: bool,
    ) {
        if self.hit.is_some() && hit.blocking {
            self.blocking_hit = true;
            self.walkable = walkable;
            self.line_trace = true;
            self.floor_dist = sweep_floor_dist;
            self.line_dist = line_dist;
            self.hit = Some(hit);
        }
    }
}

/// Whether a hit surface counts as walkable for a character whose up is `up`.
///
/// A per-surface override replaces the character's slope threshold. Surfaces
/// facing away from up (ceilings) are never walkable.
pub fn is_hit_surface_walkable(
    hit: &MoveHit,
    up: Vec3,
    max_walk_slope_cosine: f32,
    slope_override: Option<f32>,
) -> bool {
    let threshold = slope_override.unwrap_or(max_walk_slope_cosine);
    let cosine = hit.normal.dot(up);
    cosine > f32::EPSILON && cosine >= threshold - 1e-4
}

/// Context-aware walkability test: looks up the hit surface's slope override.
pub fn is_walkable(
    ctx: &MoveContext,
    hit: &MoveHit,
    up: Vec3,
    settings: &SharedMovementSettings,
) -> bool {
    is_hit_surface_walkable(
        hit,
        up,
        settings.max_walk_slope_cosine,
        ctx.slope_override(hit.entity),
    )
}

/// Whether a sweep contact is laterally close enough to the capsule axis to be
/// trusted. Contacts out near the rounded edge produce unreliable normals.
pub fn is_within_edge_tolerance(
    capsule_center: Vec3,
    impact_point: Vec3,
    capsule_radius: f32,
    up: Vec3,
) -> bool {
    let lateral = project_onto_plane(impact_point - capsule_center, up);
    let reduced_radius = (capsule_radius - SWEEP_EDGE_REJECT_DISTANCE)
        .max(SWEEP_EDGE_REJECT_DISTANCE + 1e-3);
    lateral.length_squared() < reduced_radius * reduced_radius
}

fn shrunk_capsule(radius: f32, half_height: f32) -> Collider {
    Collider::capsule(radius, ((half_height - radius) * 2.0).max(0.01))
}

/// Probes for the floor under the capsule centered at `position`.
///
/// Degrades to a cleared result when the sweep distance is non-positive.
pub fn find_floor(
    ctx: &MoveContext,
    settings: &SharedMovementSettings,
    position: Vec3,
    rotation: Quat,
    up: Vec3,
) -> FloorResult {
    if settings.floor_sweep_distance <= 0.0 {
        return FloorResult::default();
    }
    let sweep_distance = settings.floor_sweep_distance.max(MAX_FLOOR_DIST);
    compute_floor_dist(ctx, settings, position, rotation, up, sweep_distance, sweep_distance)
}

/// Two-phase floor probe: a shrunk-capsule sweep, with one edge-rejection
/// re-sweep at reduced radius, then a line-trace fallback for distance when the
/// sweep result is untrustworthy (penetrating or unwalkable).
pub fn compute_floor_dist(
    ctx: &MoveContext,
    settings: &SharedMovementSettings,
    position: Vec3,
    rotation: Quat,
    up: Vec3,
    line_distance: f32,
    sweep_distance: f32,
) -> FloorResult {
    let radius = ctx.radius;
    let half_height = ctx.half_height;
    let down = -up;

    let mut result = FloorResult {
        floor_dist: sweep_distance,
        ..default()
    };

    if sweep_distance > 0.0 && radius > 0.0 {
        // Shrink the capsule so the sweep starts clear of any surface the full
        // capsule is resting on, then extend the sweep by the shrink amount.
        let shrink_scale = 0.9;
        let shrink_scale_overlap = 0.1;

        let mut shrink_height = (half_height - radius) * (1.0 - shrink_scale);
        let mut trace_dist = sweep_distance + shrink_height;
        let mut sweep_radius = radius;
        let mut shape = shrunk_capsule(sweep_radius, half_height - shrink_height);

        let mut hit = ctx.sweep(&shape, position, rotation, down, trace_dist);

        if let Some(h) = hit {
            if h.start_penetrating
                || !is_within_edge_tolerance(position, h.point, sweep_radius, up)
            {
                // Contact on the capsule edge or an initial overlap: retry with
                // a reduced radius and a much smaller height shrink.
                sweep_radius = (radius - SWEEP_EDGE_REJECT_DISTANCE - 1e-3).max(0.0);
                if sweep_radius > f32::EPSILON {
                    shrink_height = (half_height - radius) * (1.0 - shrink_scale_overlap);
                    trace_dist = sweep_distance + shrink_height;
                    let capsule_half = (half_height - shrink_height).max(sweep_radius);
                    shape = shrunk_capsule(sweep_radius, capsule_half);
                    hit = ctx.sweep(&shape, position, rotation, down, trace_dist);
                }
            }
        }

        if let Some(h) = hit {
            let max_penetration_adjust = MAX_FLOOR_DIST.max(radius);
            let sweep_result = (h.time * trace_dist - shrink_height).max(-max_penetration_adjust);

            result.set_from_sweep(h, sweep_result, false);
            if h.blocking
                && !h.start_penetrating
                && is_walkable(ctx, &h, up, settings)
                && sweep_result <= sweep_distance
            {
                result.walkable = true;
                return result;
            }
        }
    }

    // No sweep contact at all: nothing below, skip the line trace.
    let start_penetrating = result.hit.is_some_and(|h| h.start_penetrating);
    if !result.blocking_hit && !start_penetrating {
        result.floor_dist = sweep_distance;
        return result;
    }

    // Sweep was inconclusive; fall back to a line trace from the capsule
    // center for the distance, keeping the sweep's floor_dist on record.
    if line_distance > 0.0 {
        let shrink_height = half_height;
        let trace_dist = line_distance + shrink_height;
        if let Some(h) = ctx.line_trace(position, down, trace_dist) {
            if is_walkable(ctx, &h, up, settings) {
                let max_penetration_adjust = MAX_FLOOR_DIST.max(radius);
                let line_result = (h.time * trace_dist - shrink_height).max(-max_penetration_adjust);
                if line_result <= line_distance {
                    let sweep_floor_dist = result.floor_dist;
                    result.set_from_line_trace(h, sweep_floor_dist, line_result, true);
                    return result;
                }
            }
        }
    }

    result.walkable = false;
    result
}
