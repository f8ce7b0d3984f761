use avian3d::prelude::*;
use bevy::prelude::*;

use super::attaching;
use super::events::{AttachLanded, ImpactMessage};
use super::input::CharacterInputs;
use super::layered::LayeredMoveQueue;
use super::safemove::{BaseTransformQuery, MoveContext, SimScratch, SurfaceQuery};
use super::settings::SharedMovementSettings;
use super::state::{Blackboard, ModeName, MovementMode, SyncState};
use super::walking;
use super::zero_g;

/// Upper bound on same-tick mode handoffs. Walking -> attaching -> zero-g is
/// the longest legitimate chain; anything deeper is a mode ping-ponging bug.
const MAX_MODE_CHAIN: usize = 4;

/// Remaining time below this is considered consumed.
const TIME_EPSILON_MS: f32 = 0.01;

/// Plugin that simulates every entity carrying a `MovementMode`.
pub struct MoverPlugin;

impl Plugin for MoverPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ImpactMessage>();
        app.add_message::<AttachLanded>();

        app.add_systems(FixedUpdate, (resolve_shared_settings, mover_tick).chain());
    }
}

/// Characters registered without settings get the defaults. Loud but not
/// fatal: a missing component is a host bug, not a reason to stop simulating.
fn resolve_shared_settings(
    mut commands: Commands,
    unresolved: Query<Entity, (With<MovementMode>, Without<SharedMovementSettings>)>,
) {
    for entity in &unresolved {
        warn!("character {entity} has no SharedMovementSettings, inserting defaults");
        commands
            .entity(entity)
            .insert(SharedMovementSettings::default());
    }
}

/// The per-tick orchestrator.
///
/// For each character: adopt external transform edits into the sync state,
/// then dispatch the active mode. A mode may end early and name a successor;
/// the successor runs within the same tick on the unconsumed milliseconds, so
/// consumed + remaining always equals the full tick. Resolved impacts and
/// landings are published after each dispatch.
fn mover_tick(
    time: Res<Time>,
    spatial: SpatialQuery,
    surfaces: SurfaceQuery,
    bases: BaseTransformQuery,
    mut actors: Query<(
        Entity,
        &mut Transform,
        &mut SyncState,
        &mut MovementMode,
        &mut Blackboard,
        &mut LayeredMoveQueue,
        &SharedMovementSettings,
        Option<&CharacterInputs>,
    )>,
    mut impacts: MessageWriter<ImpactMessage>,
    mut landings: MessageWriter<AttachLanded>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let step_ms = dt * 1000.0;

    let default_inputs = CharacterInputs::default();

    for (entity, mut transform, mut sync, mut mode, mut blackboard, mut layered, settings, inputs) in
        &mut actors
    {
        sync.position = transform.translation;
        sync.orientation = transform.rotation;

        let inputs = inputs.unwrap_or(&default_inputs);

        let ctx = MoveContext {
            entity,
            spatial: &spatial,
            surfaces: &surfaces,
            bases: &bases,
            collider: settings.capsule(),
            radius: settings.capsule_radius,
            half_height: settings.capsule_half_height,
            filter: SpatialQueryFilter::default()
                .with_mask(settings.collision_mask)
                .with_excluded_entities([entity]),
        };

        let mut remaining_ms = step_ms;
        for _ in 0..MAX_MODE_CHAIN {
            if remaining_ms <= TIME_EPSILON_MS {
                break;
            }
            let slice_ms = remaining_ms;
            let slice_secs = slice_ms / 1000.0;

            let mut proposed = match **mode {
                ModeName::Walking => walking::generate_move(
                    settings,
                    inputs,
                    &sync,
                    blackboard.try_get_last_floor(),
                    slice_secs,
                ),
                ModeName::ZeroG => zero_g::generate_move(settings, inputs, &sync, slice_secs),
                ModeName::Attaching => {
                    attaching::generate_move(settings, inputs, &sync, slice_secs)
                }
            };
            for layered_move in layered.drain() {
                proposed.linear_velocity = layered_move.apply(proposed.linear_velocity, sync.up());
            }

            let mut scratch = SimScratch::default();
            let end = match **mode {
                ModeName::Walking => walking::simulate(
                    &ctx,
                    &mut scratch,
                    settings,
                    inputs,
                    &proposed,
                    &mut sync,
                    &mut blackboard,
                    &mut layered,
                    slice_secs,
                    slice_ms,
                ),
                ModeName::ZeroG => zero_g::simulate(
                    &ctx,
                    &mut scratch,
                    &proposed,
                    &mut sync,
                    &mut blackboard,
                    slice_secs,
                    slice_ms,
                ),
                ModeName::Attaching => attaching::simulate(
                    &ctx,
                    &mut scratch,
                    settings,
                    &proposed,
                    &mut sync,
                    &mut blackboard,
                    slice_secs,
                    slice_ms,
                ),
            };

            for impact in &scratch.impacts {
                impacts.write(ImpactMessage {
                    entity,
                    mode: **mode,
                    surface: impact.hit.entity,
                    point: impact.hit.point,
                    normal: impact.hit.normal,
                    attempted_delta: impact.attempted_delta,
                });
            }
            if let Some(landing) = scratch.landed {
                landings.write(AttachLanded {
                    entity,
                    next_mode: end.next_mode.unwrap_or(ModeName::Walking),
                    surface: landing.entity,
                    floor_point: landing.point,
                    floor_normal: landing.normal,
                });
            }

            remaining_ms = end.remaining_ms.clamp(0.0, remaining_ms);
            match end.next_mode {
                Some(next) if next != **mode => {
                    **mode = next;
                    if next == ModeName::ZeroG {
                        blackboard.invalidate_all();
                    }
                }
                _ => break,
            }
        }

        transform.translation = sync.position;
        transform.rotation = sync.orientation;
    }
}
