use avian3d::prelude::*;
use bevy::prelude::*;

use crate::physics::GameLayer;

/// All movement tunables, read-only during simulation.
///
/// Working units are centimeters and seconds. One component per character;
/// entities registered without one get the defaults (with a warning).
#[derive(Component, Clone, Debug)]
pub struct SharedMovementSettings {
    /// Max change in facing, degrees per second per axis. Negative = unlimited.
    pub turning_rate: f32,
    /// Multiplier on ground friction while realigning velocity to new input.
    pub turning_boost: f32,
    /// Minimum `normal . up` for a surface to count as walkable (~45 degrees).
    pub max_walk_slope_cosine: f32,
    /// How far below the capsule the floor probe sweeps.
    pub floor_sweep_distance: f32,
    /// Tallest ledge the character can step up onto.
    pub max_step_height: f32,
    /// Max ground speed.
    pub max_speed: f32,
    /// Ground acceleration toward input.
    pub acceleration: f32,
    /// Active deceleration while braking.
    pub deceleration: f32,
    /// Surface friction while moving under input.
    pub ground_friction: f32,
    /// Use `braking_friction` instead of `ground_friction` while braking.
    pub use_separate_braking_friction: bool,
    pub braking_friction: f32,
    /// Multiplier applied to whichever friction is used while braking.
    pub braking_friction_factor: f32,
    /// Upward speed applied by a jump impulse.
    pub jump_upwards_speed: f32,
    /// Gravity magnitude used while attaching when the input provides none.
    pub default_gravity_accel: f32,
    /// Fraction of zero-g acceleration available as steering while attaching.
    pub air_control_percentage: f32,
    /// How far the attaching probe searches for a surface to fall toward.
    pub max_attach_distance: f32,
    /// Max free-flight speed.
    pub zero_g_max_speed: f32,
    /// Zero-g linear acceleration toward input.
    pub zero_g_acceleration: f32,
    /// Per-tick velocity retention loss in zero-g (0 = drift forever).
    pub zero_g_deceleration: f32,
    /// Per-tick braking fraction while the dampening input is held in zero-g.
    pub linear_braking_scale: f32,
    /// Max change in orientation in zero-g, degrees per second per axis.
    pub zero_g_turning_rate: f32,
    /// Capsule dimensions used for all sweeps.
    pub capsule_radius: f32,
    pub capsule_half_height: f32,
    /// Layers the character collides with.
    pub collision_mask: LayerMask,
}

impl Default for SharedMovementSettings {
    fn default() -> Self {
        Self {
            turning_rate: 500.0,
            turning_boost: 8.0,
            max_walk_slope_cosine: 0.71,
            floor_sweep_distance: 400.0,
            max_step_height: 40.0,
            max_speed: 800.0,
            acceleration: 4000.0,
            deceleration: 4000.0,
            ground_friction: 8.0,
            use_separate_braking_friction: false,
            braking_friction: 8.0,
            braking_friction_factor: 2.0,
            jump_upwards_speed: 500.0,
            default_gravity_accel: 980.0,
            air_control_percentage: 0.4,
            max_attach_distance: 3000.0,
            zero_g_max_speed: 6400.0,
            zero_g_acceleration: 800.0,
            zero_g_deceleration: 0.0,
            linear_braking_scale: 0.025,
            zero_g_turning_rate: 500.0,
            capsule_radius: 30.0,
            capsule_half_height: 90.0,
            collision_mask: LayerMask::from(GameLayer::World),
        }
    }
}

impl SharedMovementSettings {
    /// Capsule collider matching the configured dimensions.
    pub fn capsule(&self) -> Collider {
        let cylinder_length =
            ((self.capsule_half_height - self.capsule_radius) * 2.0).max(0.01);
        Collider::capsule(self.capsule_radius, cylinder_length)
    }
}
