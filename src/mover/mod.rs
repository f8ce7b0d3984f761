pub mod attaching;
pub mod events;
pub mod floor;
pub mod geometry;
pub mod height;
pub mod hit;
pub mod input;
pub mod layered;
pub mod plugin;
pub mod record;
pub mod safemove;
pub mod settings;
pub mod slide;
pub mod state;
pub mod stepup;
pub mod walking;
pub mod zero_g;

pub use events::{AttachLanded, ImpactMessage};
pub use floor::FloorResult;
pub use hit::MoveHit;
pub use input::{CharacterInputs, MoveInputType};
pub use layered::{LayeredMove, LayeredMoveQueue};
pub use plugin::MoverPlugin;
pub use settings::SharedMovementSettings;
pub use state::{
    Blackboard, DenyStepUp, DynamicBase, ModeName, MovementMode, RelativeBaseInfo, SyncState,
    WalkableSlopeOverride,
};
