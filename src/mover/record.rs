use bevy::prelude::*;

/// One named position change within a tick.
#[derive(Clone, Copy, Debug)]
pub struct MovementSubstep {
    pub name: &'static str,
    pub delta: Vec3,
    /// Whether this delta counts toward the character's effective velocity.
    pub velocity_relevant: bool,
}

/// Append-only log of the position changes made during one tick.
///
/// The effective velocity reported at the end of a tick is derived from the
/// relevant substeps only; corrective motion (height maintenance, penetration
/// resolution) is recorded as non-relevant so it never feeds back into speed.
#[derive(Debug, Default)]
pub struct MovementRecord {
    substeps: Vec<MovementSubstep>,
    relevancy_override: Option<bool>,
}

impl MovementRecord {
    /// Appends a substep. While a relevancy lock is active the lock wins over
    /// the caller's flag.
    pub fn append(&mut self, name: &'static str, delta: Vec3, velocity_relevant: bool) {
        let velocity_relevant = self.relevancy_override.unwrap_or(velocity_relevant);
        self.substeps.push(MovementSubstep {
            name,
            delta,
            velocity_relevant,
        });
    }

    /// Forces the relevancy of all subsequently appended substeps.
    pub fn lock_relevancy(&mut self, relevant: bool) {
        self.relevancy_override = Some(relevant);
    }

    pub fn unlock_relevancy(&mut self) {
        self.relevancy_override = None;
    }

    /// Appends every substep of `other`, preserving its recorded relevancy.
    pub fn absorb(&mut self, other: MovementRecord) {
        self.substeps.extend(other.substeps);
    }

    pub fn substeps(&self) -> &[MovementSubstep] {
        &self.substeps
    }

    /// Sum of velocity-relevant deltas.
    pub fn relevant_delta(&self) -> Vec3 {
        self.substeps
            .iter()
            .filter(|s| s.velocity_relevant)
            .map(|s| s.delta)
            .sum()
    }

    /// Sum of all deltas, relevant or not.
    pub fn total_delta(&self) -> Vec3 {
        self.substeps.iter().map(|s| s.delta).sum()
    }

    /// Velocity implied by the relevant deltas over `delta_seconds`.
    pub fn effective_velocity(&self, delta_seconds: f32) -> Vec3 {
        if delta_seconds > f32::EPSILON {
            self.relevant_delta() / delta_seconds
        } else {
            Vec3::ZERO
        }
    }
}
