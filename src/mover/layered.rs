use bevy::prelude::*;

use super::geometry::project_onto_plane;

/// A one-shot velocity modifier mixed into the next proposed move.
#[derive(Clone, Copy, Debug)]
pub enum LayeredMove {
    /// Replaces the velocity component along `up` with an upward burst,
    /// keeping the lateral component. This is how jumps launch.
    JumpImpulse { upwards_speed: f32 },
}

impl LayeredMove {
    /// Mixes this move into a proposed velocity.
    pub fn apply(&self, velocity: Vec3, up: Vec3) -> Vec3 {
        match *self {
            LayeredMove::JumpImpulse { upwards_speed } => {
                project_onto_plane(velocity, up) + up * upwards_speed
            }
        }
    }
}

/// Pending layered moves for a character. Each queued move is consumed by
/// exactly one mode dispatch.
#[derive(Component, Default, Debug)]
pub struct LayeredMoveQueue {
    moves: Vec<LayeredMove>,
}

impl LayeredMoveQueue {
    pub fn queue(&mut self, layered_move: LayeredMove) {
        self.moves.push(layered_move);
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Takes all pending moves, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<LayeredMove> {
        std::mem::take(&mut self.moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_impulse_replaces_only_the_up_component() {
        let velocity = Vec3::new(3.0, -10.0, 1.0);
        let jumped = LayeredMove::JumpImpulse {
            upwards_speed: 500.0,
        }
        .apply(velocity, Vec3::Y);

        assert_eq!(jumped, Vec3::new(3.0, 500.0, 1.0));
    }

    #[test]
    fn jump_impulse_follows_arbitrary_up() {
        let up = Vec3::X;
        let velocity = Vec3::new(-50.0, 2.0, 0.0);
        let jumped = LayeredMove::JumpImpulse {
            upwards_speed: 500.0,
        }
        .apply(velocity, up);

        assert_eq!(jumped, Vec3::new(500.0, 2.0, 0.0));
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut queue = LayeredMoveQueue::default();
        queue.queue(LayeredMove::JumpImpulse {
            upwards_speed: 1.0,
        });
        assert!(!queue.is_empty());
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
