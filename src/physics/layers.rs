use avian3d::prelude::*;

/// Collision layers for the physics simulation
#[derive(PhysicsLayer, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Simulated characters
    Character,
    /// Static and dynamic world geometry
    World,
    /// Triggers and sensors
    Trigger,
}
