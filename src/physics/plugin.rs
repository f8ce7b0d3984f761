use avian3d::prelude::*;
use bevy::prelude::*;

/// Plugin that sets up the Avian3D physics engine
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(
            PhysicsPlugins::default()
                .with_length_unit(100.0), // 100 units = 1 meter (centimeter worlds)
        );

        // No ambient gravity: each movement mode owns gravity per character.
        app.insert_resource(Gravity(Vec3::ZERO));
    }
}
