//! Pluggable step algorithms for the optimizer.
//!
//! An algorithm implements exactly one piece of physics-free logic: given the
//! current forces, produce the next position vector. Any internal memory an
//! algorithm keeps between steps (velocities, adaptive time steps, curvature
//! estimates) must be fully captured by `snapshot`/`restore`; resuming the
//! numeric iteration without that memory silently degrades convergence and
//! is therefore not supported.

mod fire;
mod steepest_descent;

pub use fire::Fire;
pub use steepest_descent::SteepestDescent;

use super::error::EngineError;
use crate::core::models::system::System;
use nalgebra::Vector3;

/// Optimizer-wide default for the per-step displacement cap, in position
/// units.
pub const DEFAULT_MAXSTEP: f64 = 0.2;

/// A concrete step-taking strategy.
pub trait StepAlgorithm<S: System> {
    /// Short name used in log records and provenance descriptions.
    fn name(&self) -> &'static str;

    /// Resets the internal memory to its fresh-start state. Called once at
    /// construction when no restart record is available.
    fn initialize(&mut self) {}

    /// Moves the system to its next configuration given the current forces.
    ///
    /// `forces` is evaluated at the current positions, one entry per movable
    /// particle. Implementations honoring a displacement cap must scale the
    /// whole update, not clip components.
    fn step(&mut self, system: &mut S, forces: &[Vector3<f64>]) -> Result<(), EngineError>;

    /// Serializes the full internal memory for restart persistence.
    fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Replaces the internal memory with a previously serialized record.
    fn restore(&mut self, record: serde_json::Value) -> Result<(), serde_json::Error>;
}

/// Scales a trial displacement so its largest per-particle norm does not
/// exceed `maxstep`.
pub(crate) fn cap_displacement(displacement: &mut [Vector3<f64>], maxstep: f64) {
    let longest = displacement
        .iter()
        .map(|d| d.norm())
        .fold(0.0f64, f64::max);
    if longest > maxstep {
        let scale = maxstep / longest;
        for d in displacement.iter_mut() {
            *d *= scale;
        }
    }
}
