use super::provider::{EnergyForceProvider, ProviderError};
use nalgebra::Vector3;

/// Capability interface for system states that expose a curvature estimate.
///
/// Constrained and transition-state search variants use the sign of the
/// curvature along the search mode as an additional convergence requirement.
/// Ordinary minimization systems do not implement this.
pub trait Curvature {
    /// The current curvature estimate along the relevant mode.
    fn curvature(&self) -> f64;
}

/// The system-state handle the engine operates on.
///
/// The engine treats the state as opaque except for the accessors below: a
/// position vector (one entry per movable particle), the current potential
/// energy, and the current forces. The state is owned externally; the engine
/// holds a mutable borrow for the duration of one run and mutates positions
/// only through a step algorithm's output.
///
/// The number of movable degrees of freedom is fixed for the lifetime of a
/// run: `set_positions` must be called with exactly `positions().len()`
/// entries.
pub trait System {
    /// Current positions, one per movable particle.
    fn positions(&self) -> &[Vector3<f64>];

    /// Replaces all positions. The slice length must match `positions()`.
    fn set_positions(&mut self, positions: &[Vector3<f64>]);

    /// Current potential energy, honoring the requested force-consistency
    /// variant.
    fn potential_energy(&mut self, force_consistent: bool) -> Result<f64, ProviderError>;

    /// Current forces, one per movable particle, ordered like `positions()`.
    fn forces(&mut self) -> Result<Vec<Vector3<f64>>, ProviderError>;

    /// Returns the curvature capability if this state exposes one.
    fn curvature_probe(&self) -> Option<&dyn Curvature> {
        None
    }

    /// Number of movable particles.
    fn len(&self) -> usize {
        self.positions().len()
    }

    fn is_empty(&self) -> bool {
        self.positions().is_empty()
    }
}

/// A point-particle system backed by an [`EnergyForceProvider`].
///
/// Energy and force evaluations are cached and invalidated whenever the
/// positions change, so repeated queries at the same configuration cost one
/// provider call.
pub struct ParticleSystem<P> {
    positions: Vec<Vector3<f64>>,
    provider: P,
    cached_forces: Option<Vec<Vector3<f64>>>,
    cached_energy: Option<(bool, f64)>,
}

impl<P: EnergyForceProvider> ParticleSystem<P> {
    pub fn new(positions: Vec<Vector3<f64>>, provider: P) -> Self {
        Self {
            positions,
            provider,
            cached_forces: None,
            cached_energy: None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn invalidate_caches(&mut self) {
        self.cached_forces = None;
        self.cached_energy = None;
    }
}

impl<P: EnergyForceProvider> System for ParticleSystem<P> {
    fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    fn set_positions(&mut self, positions: &[Vector3<f64>]) {
        assert_eq!(
            positions.len(),
            self.positions.len(),
            "the degree-of-freedom count is immutable for the lifetime of a run"
        );
        self.positions.copy_from_slice(positions);
        self.invalidate_caches();
    }

    fn potential_energy(&mut self, force_consistent: bool) -> Result<f64, ProviderError> {
        if let Some((cached_variant, energy)) = self.cached_energy {
            if cached_variant == force_consistent {
                return Ok(energy);
            }
        }
        let energy = self.provider.energy(&self.positions, force_consistent)?;
        self.cached_energy = Some((force_consistent, energy));
        Ok(energy)
    }

    fn forces(&mut self) -> Result<Vec<Vector3<f64>>, ProviderError> {
        if let Some(forces) = &self.cached_forces {
            return Ok(forces.clone());
        }
        let forces = self.provider.forces(&self.positions)?;
        self.cached_forces = Some(forces.clone());
        Ok(forces)
    }
}
