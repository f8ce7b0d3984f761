use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::floor::FloorResult;
use super::layered::LayeredMoveQueue;

/// Names of the built-in movement modes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ModeName {
    /// Moving along a walkable surface, oriented to its normal.
    #[default]
    Walking,
    /// Free flight with no ambient gravity.
    ZeroG,
    /// Airborne, accelerating toward the nearest surface within attach range.
    Attaching,
}

/// The active movement mode of a character.
///
/// Inserting this component registers the entity with the mover tick. The
/// companion state components are added automatically; `SharedMovementSettings`
/// is resolved to defaults (with a warning) if the host doesn't provide one.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug, Default, Deref, DerefMut)]
#[require(SyncState, Blackboard, LayeredMoveQueue)]
pub struct MovementMode(pub ModeName);

/// Authoritative per-character movement state.
///
/// Everything the simulation needs to re-run a tick lives here (plus the tick's
/// `CharacterInputs`); replaying a stored input stream over a stored `SyncState`
/// reproduces the same positions, orientations, and velocities.
#[derive(Component, Clone, Debug, Serialize, Deserialize)]
pub struct SyncState {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    /// Dynamic surface the character is standing on, if any.
    pub base_info: Option<RelativeBaseInfo>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            base_info: None,
        }
    }
}

impl SyncState {
    /// The character's current up direction (local +Y of its orientation).
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// The character's current facing direction (local -Z of its orientation).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

/// Contact bookkeeping for standing on a dynamic base.
///
/// The contact point is stored in the base's local space so the character can
/// ride the base without accumulating drift. While the character is stationary
/// on the same base the stored local point is frozen rather than recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeBaseInfo {
    pub base: Entity,
    pub contact_local_position: Vec3,
}

/// Velocities a mode proposes before collision resolution.
///
/// Producing this must not mutate any state; the same inputs always yield the
/// same proposal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProposedMove {
    pub linear_velocity: Vec3,
    /// Degrees per second: x = pitch, y = yaw, z = roll.
    pub angular_velocity: Vec3,
    /// When set, the tick teleports to this location instead of moving.
    pub target_location: Option<Vec3>,
}

/// What a mode's simulation step hands back to the orchestrator.
#[derive(Clone, Copy, Debug)]
pub struct TickEndState {
    /// Mode to run next. `None` (or the current mode) ends the tick.
    pub next_mode: Option<ModeName>,
    /// Unconsumed simulation time, handed to `next_mode` within the same tick.
    pub remaining_ms: f32,
}

impl TickEndState {
    pub fn finished() -> Self {
        Self {
            next_mode: None,
            remaining_ms: 0.0,
        }
    }

    /// Stay in the current mode with time left unconsumed. The orchestrator
    /// does not re-dispatch a staying mode, so the refund is purely accounting.
    pub fn stay(remaining_ms: f32) -> Self {
        Self {
            next_mode: None,
            remaining_ms,
        }
    }

    pub fn handoff(next_mode: ModeName, remaining_ms: f32) -> Self {
        Self {
            next_mode: Some(next_mode),
            remaining_ms,
        }
    }
}

/// Per-character cache shared between modes across ticks.
///
/// Slots are advisory: any of them may be invalidated at any time and modes
/// must cope with an empty slot (typically by re-querying).
#[derive(Component, Clone, Debug, Default)]
pub struct Blackboard {
    last_floor: Option<FloorResult>,
    last_base: Option<RelativeBaseInfo>,
}

impl Blackboard {
    pub fn set_last_floor(&mut self, floor: FloorResult) {
        self.last_floor = Some(floor);
    }

    pub fn try_get_last_floor(&self) -> Option<&FloorResult> {
        self.last_floor.as_ref()
    }

    pub fn invalidate_last_floor(&mut self) {
        self.last_floor = None;
    }

    pub fn set_last_base(&mut self, base: RelativeBaseInfo) {
        self.last_base = Some(base);
    }

    pub fn try_get_last_base(&self) -> Option<&RelativeBaseInfo> {
        self.last_base.as_ref()
    }

    pub fn invalidate_last_base(&mut self) {
        self.last_base = None;
    }

    pub fn invalidate_all(&mut self) {
        self.last_floor = None;
        self.last_base = None;
    }
}

/// Per-surface slope override: replaces the character's walkable slope
/// threshold when testing hits against this entity.
#[derive(Component, Clone, Copy, Debug)]
pub struct WalkableSlopeOverride {
    /// Minimum `normal . up` for this surface to count as walkable.
    pub walkable_slope_cosine: f32,
}

/// Marker: characters may not step up onto this surface.
#[derive(Component, Default)]
pub struct DenyStepUp;

/// Marker: this entity can carry characters standing on it. Walkable floors on
/// a `DynamicBase` record a local contact point in `SyncState::base_info`.
#[derive(Component, Default)]
pub struct DynamicBase;
