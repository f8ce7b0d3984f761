use avian3d::prelude::*;
use bevy::prelude::*;

/// A resolved blocking hit from a capsule sweep or line trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveHit {
    /// The hit stopped the move (as opposed to a grazing touch).
    pub blocking: bool,
    /// The shape was already overlapping at the start of the sweep.
    pub start_penetrating: bool,
    /// Fraction of the attempted sweep completed before impact, 0..=1.
    pub time: f32,
    /// World distance traveled before impact.
    pub distance: f32,
    /// Contact point on the hit surface.
    pub point: Vec3,
    /// Surface normal at the contact point.
    pub normal: Vec3,
    /// Capsule center at the moment of impact.
    pub location: Vec3,
    pub entity: Entity,
}

impl MoveHit {
    /// Builds a hit from an Avian shape cast.
    ///
    /// `trace_dist` is the full sweep length the cast was asked for; it turns
    /// the reported distance back into a fraction.
    pub fn from_shape_cast(
        hit: &ShapeHitData,
        origin: Vec3,
        direction: Vec3,
        trace_dist: f32,
    ) -> Self {
        let start_penetrating = hit.distance <= f32::EPSILON;
        let time = if trace_dist > f32::EPSILON {
            (hit.distance / trace_dist).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            blocking: true,
            start_penetrating,
            time,
            distance: hit.distance,
            point: hit.point1,
            normal: hit.normal1,
            location: origin + direction * hit.distance,
            entity: hit.entity,
        }
    }

    /// Builds a hit from an Avian ray cast.
    pub fn from_ray_cast(
        hit: &RayHitData,
        origin: Vec3,
        direction: Vec3,
        trace_dist: f32,
    ) -> Self {
        let time = if trace_dist > f32::EPSILON {
            (hit.distance / trace_dist).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let point = origin + direction * hit.distance;
        Self {
            blocking: true,
            start_penetrating: false,
            time,
            distance: hit.distance,
            point,
            normal: hit.normal,
            location: point,
            entity: hit.entity,
        }
    }
}
