use super::{DEFAULT_MAXSTEP, StepAlgorithm, cap_displacement};
use crate::core::models::system::System;
use crate::engine::error::EngineError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Plain steepest descent: move a fixed fraction of the force, capped by the
/// per-step displacement limit. Stateless between steps, which makes it a
/// useful baseline and the simplest possible restart payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteepestDescent {
    alpha: f64,
    maxstep: f64,
}

impl SteepestDescent {
    pub fn new(alpha: f64, maxstep: f64) -> Self {
        Self { alpha, maxstep }
    }
}

impl Default for SteepestDescent {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            maxstep: DEFAULT_MAXSTEP,
        }
    }
}

impl<S: System> StepAlgorithm<S> for SteepestDescent {
    fn name(&self) -> &'static str {
        "SteepestDescent"
    }

    fn step(&mut self, system: &mut S, forces: &[Vector3<f64>]) -> Result<(), EngineError> {
        let mut displacement: Vec<Vector3<f64>> =
            forces.iter().map(|f| self.alpha * f).collect();
        cap_displacement(&mut displacement, self.maxstep);

        let new_positions: Vec<Vector3<f64>> = system
            .positions()
            .iter()
            .zip(&displacement)
            .map(|(x, d)| x + d)
            .collect();
        system.set_positions(&new_positions);
        Ok(())
    }

    fn snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn restore(&mut self, record: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(record)?;
        Ok(())
    }
}
