use avian3d::prelude::*;
use bevy::prelude::*;

use super::geometry::is_nearly_zero;
use super::hit::MoveHit;
use super::record::MovementRecord;
use super::state::{
    Blackboard, DenyStepUp, DynamicBase, MovementMode, SyncState, TickEndState,
    WalkableSlopeOverride,
};

/// Contact offset kept between the capsule and blocking geometry.
pub const COLLISION_SKIN: f32 = 0.1;

/// Extra distance pulled back along the normal when escaping a penetration.
pub const PENETRATION_PULLBACK: f32 = 0.125;

/// Per-surface capability lookups (slope override, step-up denial, base).
pub type SurfaceQuery<'w, 's> = Query<
    'w,
    's,
    (
        Option<&'static WalkableSlopeOverride>,
        Has<DenyStepUp>,
        Has<DynamicBase>,
    ),
>;

/// Transforms of potential movement bases. Characters are excluded so the
/// orchestrator's mutable `Transform` access stays disjoint.
pub type BaseTransformQuery<'w, 's> = Query<'w, 's, &'static Transform, Without<MovementMode>>;

/// Everything a mode needs to query the world during one dispatch.
pub struct MoveContext<'a, 'w, 's> {
    pub entity: Entity,
    pub spatial: &'a SpatialQuery<'w, 's>,
    pub surfaces: &'a SurfaceQuery<'w, 's>,
    pub bases: &'a BaseTransformQuery<'w, 's>,
    /// Full-size capsule used by movement sweeps.
    pub collider: Collider,
    pub radius: f32,
    pub half_height: f32,
    pub filter: SpatialQueryFilter,
}

impl MoveContext<'_, '_, '_> {
    /// Slope override for a surface entity, if it has one.
    pub fn slope_override(&self, entity: Entity) -> Option<f32> {
        self.surfaces
            .get(entity)
            .ok()
            .and_then(|(over, _, _)| over.map(|o| o.walkable_slope_cosine))
    }

    pub fn denies_step_up(&self, entity: Entity) -> bool {
        self.surfaces
            .get(entity)
            .map(|(_, deny, _)| deny)
            .unwrap_or(false)
    }

    pub fn is_dynamic_base(&self, entity: Entity) -> bool {
        self.surfaces
            .get(entity)
            .map(|(_, _, base)| base)
            .unwrap_or(false)
    }

    /// A world point expressed in the local space of a base entity.
    pub fn base_local_point(&self, base: Entity, world_point: Vec3) -> Option<Vec3> {
        let transform = self.bases.get(base).ok()?;
        Some(transform.rotation.inverse() * (world_point - transform.translation))
    }

    /// Sweeps an arbitrary shape and converts the result.
    pub fn sweep(
        &self,
        shape: &Collider,
        origin: Vec3,
        rotation: Quat,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<MoveHit> {
        let direction = Dir3::new(direction).ok()?;
        let config = ShapeCastConfig {
            max_distance,
            ..default()
        };
        self.spatial
            .cast_shape(shape, origin, rotation, direction, &config, &self.filter)
            .map(|hit| MoveHit::from_shape_cast(&hit, origin, *direction, max_distance))
    }

    /// Sweeps the character capsule along a delta.
    pub fn sweep_capsule(&self, origin: Vec3, rotation: Quat, delta: Vec3) -> Option<MoveHit> {
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        self.sweep(&self.collider, origin, rotation, delta / length, length)
    }

    /// Line trace against blocking geometry.
    pub fn line_trace(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<MoveHit> {
        let direction = Dir3::new(direction).ok()?;
        self.spatial
            .cast_ray(origin, direction, max_distance, false, &self.filter)
            .map(|hit| MoveHit::from_ray_cast(&hit, origin, *direction, max_distance))
    }
}

/// A blocking hit waiting to be published as an `ImpactMessage`.
#[derive(Clone, Copy, Debug)]
pub struct PendingImpact {
    pub hit: MoveHit,
    pub attempted_delta: Vec3,
}

/// Mutable per-dispatch working state: the movement record plus impacts
/// gathered while resolving the move.
#[derive(Default)]
pub struct SimScratch {
    pub record: MovementRecord,
    pub impacts: Vec<PendingImpact>,
    /// Set when an attaching move came to rest on a walkable surface.
    pub landed: Option<MoveHit>,
}

impl SimScratch {
    pub fn note_impact(&mut self, hit: MoveHit, attempted_delta: Vec3) {
        self.impacts.push(PendingImpact {
            hit,
            attempted_delta,
        });
    }
}

/// Moves the capsule by `delta`, stopping at the first blocking hit and pulling
/// back by the collision skin. The applied delta is appended to `record`.
///
/// Returns the blocking hit, with `time` adjusted for the skin pullback, or
/// `None` if the full delta was applied.
pub fn safe_move(
    ctx: &MoveContext,
    record: &mut MovementRecord,
    name: &'static str,
    position: &mut Vec3,
    rotation: Quat,
    delta: Vec3,
    velocity_relevant: bool,
) -> Option<MoveHit> {
    if is_nearly_zero(delta) {
        return None;
    }
    let length = delta.length();
    let direction = delta / length;

    match ctx.sweep(&ctx.collider, *position, rotation, direction, length) {
        None => {
            *position += delta;
            record.append(name, delta, velocity_relevant);
            None
        }
        Some(mut hit) => {
            let advance = (hit.distance - COLLISION_SKIN).max(0.0);
            let moved = direction * advance;
            *position += moved;
            record.append(name, moved, velocity_relevant);

            hit.time = (advance / length).clamp(0.0, 1.0);
            hit.location = *position;
            Some(hit)
        }
    }
}

/// Applies an instantaneous teleport: position adopts the target, every cached
/// contact is dropped, and the full tick is handed back unconsumed. The
/// displacement is recorded as non-velocity-relevant so a teleport never reads
/// as speed.
pub fn apply_teleport(
    scratch: &mut SimScratch,
    sync: &mut SyncState,
    blackboard: &mut Blackboard,
    target: Vec3,
    step_ms: f32,
) -> TickEndState {
    let delta = target - sync.position;
    sync.position = target;
    scratch.record.append("teleport", delta, false);
    blackboard.invalidate_all();
    sync.base_info = None;
    TickEndState::stay(step_ms)
}

/// Adjustment that pushes the capsule out of a penetrating contact.
pub fn penetration_adjustment(hit: &MoveHit) -> Vec3 {
    hit.normal * (COLLISION_SKIN + PENETRATION_PULLBACK)
}

/// Attempts to move out of a penetration along `adjustment`, tolerating
/// residual overlap. The motion is recorded as non-velocity-relevant.
///
/// Returns whether any movement happened.
pub fn resolve_penetration(
    ctx: &MoveContext,
    record: &mut MovementRecord,
    position: &mut Vec3,
    rotation: Quat,
    adjustment: Vec3,
) -> bool {
    if is_nearly_zero(adjustment) {
        return false;
    }
    let length = adjustment.length();
    let direction = adjustment / length;

    let allowed = match ctx.sweep(&ctx.collider, *position, rotation, direction, length) {
        // A zero-distance hit here means we are wedged; still report the
        // attempt so the caller can retry next tick.
        Some(hit) => hit.distance.min(length),
        None => length,
    };
    if allowed <= f32::EPSILON {
        return false;
    }
    let moved = direction * allowed;
    *position += moved;
    record.append("penetration-resolve", moved, false);
    true
}
