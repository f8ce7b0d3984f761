use bevy::prelude::*;

/// Moves and hits shorter than this are treated as zero.
pub const SMALL_MOVE_DISTANCE: f32 = 1e-3;

/// Returns true if the vector is shorter than the small-move threshold.
pub fn is_nearly_zero(v: Vec3) -> bool {
    v.length_squared() < SMALL_MOVE_DISTANCE * SMALL_MOVE_DISTANCE
}

/// Projects `v` onto the plane with unit normal `normal`.
pub fn project_onto_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Clamps `v` to a maximum length, preserving direction.
pub fn clamp_to_max_size(v: Vec3, max_size: f32) -> Vec3 {
    let len_sq = v.length_squared();
    if max_size > 0.0 && len_sq > max_size * max_size {
        v * (max_size / len_sq.sqrt())
    } else {
        v
    }
}

/// Computes the deflected portion of a blocked move: the component of
/// `delta * pct_to_move` tangent to the blocking surface.
pub fn compute_slide_delta(delta: Vec3, pct_to_move: f32, normal: Vec3) -> Vec3 {
    project_onto_plane(delta * pct_to_move, normal)
}

/// Adjusts a slide delta that hit a second surface so movement continues along
/// the crease formed by both surfaces.
///
/// `hit_time` is the fraction of the slide consumed before the second impact.
/// Returns zero when the crease direction would reverse the attempted move.
pub fn compute_two_wall_adjusted_delta(
    delta: Vec3,
    hit_time: f32,
    hit_normal: Vec3,
    old_normal: Vec3,
) -> Vec3 {
    let desired = delta * (1.0 - hit_time);

    // Nearly parallel walls: keep deflecting off the new surface.
    if hit_normal.dot(old_normal) >= 1.0 - 1e-4 {
        return project_onto_plane(desired, hit_normal);
    }

    let crease = hit_normal.cross(old_normal).normalize_or_zero();
    if crease == Vec3::ZERO {
        return project_onto_plane(desired, hit_normal);
    }

    let adjusted = crease * desired.dot(crease);
    if adjusted.dot(desired) <= 0.0 {
        Vec3::ZERO
    } else {
        adjusted
    }
}

/// Normalizes one angle in degrees to [-180, 180].
pub fn normalize_axis_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}

/// Splits a per-axis angular delta (degrees) into whole-turn winding and a
/// principal remainder in [-180, 180] per axis, such that
/// `winding + remainder == input` exactly (up to float rounding).
pub fn winding_and_remainder(angles: Vec3) -> (Vec3, Vec3) {
    let remainder = Vec3::new(
        normalize_axis_degrees(angles.x),
        normalize_axis_degrees(angles.y),
        normalize_axis_degrees(angles.z),
    );
    (angles - remainder, remainder)
}

/// Extracts a per-axis rotation (degrees; x = pitch, y = yaw, z = roll) from a
/// quaternion, in the same axis order used to rebuild it.
pub fn quat_to_degrees(q: Quat) -> Vec3 {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Builds a quaternion from per-axis degrees (x = pitch, y = yaw, z = roll).
pub fn degrees_to_quat(angles: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        angles.y.to_radians(),
        angles.x.to_radians(),
        angles.z.to_radians(),
    )
}

/// Derives a per-tick angular velocity (deg/s) that turns `prior_forward`
/// toward `intended_forward`, using only the principal remainder of the
/// rotation (whole turns are discarded so accumulated spin can't run away),
/// clamped per-axis to `turning_rate` when that rate is non-negative.
pub fn angular_velocity_toward(
    prior_forward: Vec3,
    intended_forward: Vec3,
    delta_seconds: f32,
    turning_rate: f32,
) -> Vec3 {
    if delta_seconds <= 0.0 {
        return Vec3::ZERO;
    }
    let from = prior_forward.normalize_or_zero();
    let to = intended_forward.normalize_or_zero();
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return Vec3::ZERO;
    }

    let delta_quat = Quat::from_rotation_arc(from, to);
    let (_winding, remainder) = winding_and_remainder(quat_to_degrees(delta_quat));

    let mut velocity = remainder / delta_seconds;
    if turning_rate >= 0.0 {
        velocity = velocity.clamp(Vec3::splat(-turning_rate), Vec3::splat(turning_rate));
    }
    velocity
}
