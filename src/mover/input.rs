use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// How `move_input` should be interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum MoveInputType {
    /// No movement intent this tick.
    #[default]
    None,
    /// A directional intent with strength 0..=1 of max speed.
    Intent,
    /// A literal world-space velocity request.
    Velocity,
}

/// The authored input block for one simulation tick.
///
/// The host writes this before each tick (from devices, AI, or a replay
/// stream); the plugin never mutates it. A character without the component
/// simulates with no intent.
#[derive(Component, Clone, Debug, Default, Serialize, Deserialize)]
pub struct CharacterInputs {
    pub move_input_type: MoveInputType,
    /// World-space movement input, interpreted per `move_input_type`.
    pub move_input: Vec3,
    /// Desired world-space facing direction. Zero = keep current facing.
    pub orientation_intent: Vec3,
    /// Raw angular velocity request in degrees per second
    /// (x = pitch, y = yaw, z = roll). Only zero-g consumes this directly.
    pub angular_velocity: Vec3,
    /// World-space gravity acceleration for airborne modes. Zero = use the
    /// character's default gravity along its own down.
    pub gravity_acceleration: Vec3,
    pub jump_pressed: bool,
    pub jump_just_pressed: bool,
    /// When set, the next tick teleports to this location.
    pub teleport_target: Option<Vec3>,
}

impl CharacterInputs {
    /// The movement intent as a direction with strength 0..=1.
    ///
    /// `max_speed` is used to normalize `Velocity`-typed input.
    pub fn move_intent(&self, max_speed: f32) -> Vec3 {
        match self.move_input_type {
            MoveInputType::None => Vec3::ZERO,
            MoveInputType::Intent => self.move_input.clamp_length_max(1.0),
            MoveInputType::Velocity => {
                if max_speed > f32::EPSILON {
                    (self.move_input / max_speed).clamp_length_max(1.0)
                } else {
                    Vec3::ZERO
                }
            }
        }
    }
}
