pub mod mover;
pub mod physics;

pub use mover::MoverPlugin;
pub use physics::PhysicsPlugin;

use bevy::prelude::*;

/// Unified plugin that adds physics setup and the character mover systems.
pub struct SpacewalkPlugin;

impl Plugin for SpacewalkPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PhysicsPlugin>() {
            app.add_plugins(PhysicsPlugin);
        }
        if !app.is_plugin_added::<MoverPlugin>() {
            app.add_plugins(MoverPlugin);
        }
    }
}

pub mod prelude {
    pub use crate::mover::{
        AttachLanded, Blackboard, CharacterInputs, DenyStepUp, DynamicBase, FloorResult,
        ImpactMessage, LayeredMove, LayeredMoveQueue, ModeName, MoveHit, MoveInputType,
        MovementMode, MoverPlugin, RelativeBaseInfo, SharedMovementSettings, SyncState,
        WalkableSlopeOverride,
    };
    pub use crate::physics::{GameLayer, PhysicsPlugin};
    pub use crate::SpacewalkPlugin;
}
