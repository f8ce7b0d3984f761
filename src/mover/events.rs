use bevy::prelude::*;

use super::state::ModeName;

/// Emitted once per blocking hit resolved during movement.
///
/// Consumers subscribe with `MessageReader<ImpactMessage>` to drive sounds,
/// effects, or gameplay reactions; the simulation itself ignores them.
#[derive(Message, Clone, Debug)]
pub struct ImpactMessage {
    /// The character that hit something.
    pub entity: Entity,
    /// Mode that was simulating when the hit happened.
    pub mode: ModeName,
    /// The surface that was hit.
    pub surface: Entity,
    pub point: Vec3,
    pub normal: Vec3,
    /// The move that was being attempted when blocked.
    pub attempted_delta: Vec3,
}

/// Emitted when an attaching character successfully lands on a surface.
#[derive(Message, Clone, Debug)]
pub struct AttachLanded {
    pub entity: Entity,
    /// Mode the character transitions into (walking).
    pub next_mode: ModeName,
    pub surface: Entity,
    pub floor_point: Vec3,
    pub floor_normal: Vec3,
}
