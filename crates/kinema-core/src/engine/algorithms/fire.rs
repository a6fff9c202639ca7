use super::{DEFAULT_MAXSTEP, StepAlgorithm};
use crate::core::models::system::System;
use crate::engine::error::EngineError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// FIRE (fast inertial relaxation engine) minimizer.
///
/// Integrates a damped fictitious dynamics: velocities are mixed toward the
/// force direction while the motion keeps going downhill, and are zeroed
/// with a reduced time step whenever the power `F·v` turns negative. The
/// velocity vector, the adaptive time step, and the mixing factor are all
/// part of the restart memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fire {
    dt: f64,
    dt_max: f64,
    n_min: usize,
    f_inc: f64,
    f_dec: f64,
    a_start: f64,
    f_alpha: f64,
    maxstep: f64,

    velocities: Option<Vec<Vector3<f64>>>,
    mixing: f64,
    downhill_steps: usize,
}

impl Fire {
    pub fn new(dt: f64, maxstep: f64) -> Self {
        Self {
            dt,
            maxstep,
            ..Self::default()
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl Default for Fire {
    fn default() -> Self {
        Self {
            dt: 0.1,
            dt_max: 1.0,
            n_min: 5,
            f_inc: 1.1,
            f_dec: 0.5,
            a_start: 0.1,
            f_alpha: 0.99,
            maxstep: DEFAULT_MAXSTEP,
            velocities: None,
            mixing: 0.1,
            downhill_steps: 0,
        }
    }
}

fn dot(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x.dot(y)).sum()
}

impl<S: System> StepAlgorithm<S> for Fire {
    fn name(&self) -> &'static str {
        "FIRE"
    }

    fn initialize(&mut self) {
        self.velocities = None;
        self.mixing = self.a_start;
        self.downhill_steps = 0;
    }

    fn step(&mut self, system: &mut S, forces: &[Vector3<f64>]) -> Result<(), EngineError> {
        if let Some(velocities) = self.velocities.as_mut() {
            let power = dot(forces, velocities);
            if power > 0.0 {
                let v_norm = dot(velocities, velocities).sqrt();
                let f_norm = dot(forces, forces).sqrt();
                for (v, f) in velocities.iter_mut().zip(forces) {
                    *v = (1.0 - self.mixing) * *v + self.mixing * v_norm / f_norm * f;
                }
                if self.downhill_steps > self.n_min {
                    self.dt = (self.dt * self.f_inc).min(self.dt_max);
                    self.mixing *= self.f_alpha;
                }
                self.downhill_steps += 1;
            } else {
                velocities.iter_mut().for_each(|v| *v = Vector3::zeros());
                self.mixing = self.a_start;
                self.dt *= self.f_dec;
                self.downhill_steps = 0;
            }
        }

        let velocities = self
            .velocities
            .get_or_insert_with(|| vec![Vector3::zeros(); forces.len()]);
        for (v, f) in velocities.iter_mut().zip(forces) {
            *v += self.dt * f;
        }

        let mut displacement: Vec<Vector3<f64>> =
            velocities.iter().map(|v| self.dt * v).collect();
        let norm = dot(&displacement, &displacement).sqrt();
        if norm > self.maxstep {
            let scale = self.maxstep / norm;
            for d in displacement.iter_mut() {
                *d *= scale;
            }
        }

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
