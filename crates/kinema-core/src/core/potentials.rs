use super::models::provider::{EnergyForceProvider, ProviderError};
use nalgebra::Vector3;

/// An isotropic harmonic well centered on a reference configuration.
///
/// `E = 1/2 k Σ |x_i - x0_i|^2`, `F_i = -k (x_i - x0_i)`. The well is exactly
/// force-consistent, so both energy variants return the same value. Useful as
/// an analytic fixture for exercising the run-loop against a potential with a
/// known minimum.
pub struct HarmonicWell {
    spring_constant: f64,
    reference: Vec<Vector3<f64>>,
}

impl HarmonicWell {
    pub fn new(spring_constant: f64, reference: Vec<Vector3<f64>>) -> Self {
        Self {
            spring_constant,
            reference,
        }
    }

    /// A well with its minimum at the origin for every particle.
    pub fn at_origin(spring_constant: f64, particles: usize) -> Self {
        Self::new(spring_constant, vec![Vector3::zeros(); particles])
    }
}

impl EnergyForceProvider for HarmonicWell {
    fn energy(
        &mut self,
        positions: &[Vector3<f64>],
        _force_consistent: bool,
    ) -> Result<f64, ProviderError> {
        let energy = positions
            .iter()
            .zip(&self.reference)
            .map(|(x, x0)| 0.5 * self.spring_constant * (x - x0).norm_squared())
            .sum();
        Ok(energy)
    }

    fn forces(&mut self, positions: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>, ProviderError> {
        Ok(positions
            .iter()
            .zip(&self.reference)
            .map(|(x, x0)| -self.spring_constant * (x - x0))
            .collect())
    }
}
