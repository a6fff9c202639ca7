use nalgebra::Vector3;
use thiserror::Error;

/// Errors reported by an [`EnergyForceProvider`] during evaluation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider cannot supply the requested variant of a property.
    ///
    /// This is the only provider failure the engine ever absorbs, and it does
    /// so in exactly one place: force-consistency auto-detection. Everywhere
    /// else it propagates and aborts the run like any other failure.
    #[error("property '{property}' is not implemented by this provider")]
    NotImplemented { property: &'static str },

    /// The underlying calculation failed (e.g. the backing simulation engine
    /// crashed or produced unusable output).
    #[error("energy/force evaluation failed: {0}")]
    Calculation(String),
}

/// The external calculator contract.
///
/// Given a set of particle positions, a provider computes the scalar potential
/// energy and the per-particle force vectors. Providers are typically backed
/// by an external simulation engine; whether that engine is serial or
/// parallel is opaque to this crate.
///
/// The returned force vector must contain one entry per position, in the same
/// order as the input slice.
pub trait EnergyForceProvider {
    /// Computes the potential energy of the configuration.
    ///
    /// When `force_consistent` is true, the energy must be computed with the
    /// same approximations used to derive the forces (as opposed to an
    /// independently extrapolated value). Providers that do not support the
    /// force-consistent variant must return
    /// [`ProviderError::NotImplemented`].
    fn energy(
        &mut self,
        positions: &[Vector3<f64>],
        force_consistent: bool,
    ) -> Result<f64, ProviderError>;

    /// Computes the force acting on each particle.
    fn forces(&mut self, positions: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>, ProviderError>;
}
