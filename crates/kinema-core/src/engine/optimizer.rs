use super::algorithms::StepAlgorithm;
use super::dynamics::{Dynamics, Iteration, RunState};
use super::error::EngineError;
use super::logger::OptimizationLogger;
use super::restart;
use super::trajectory::TrajectorySink;
use crate::core::models::provider::ProviderError;
use crate::core::models::system::System;
use nalgebra::Vector3;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Force-consistency policy for energy queries.
///
/// `Auto` is resolved exactly once, at construction: the provider is probed
/// for a force-consistent energy, and the outcome is committed for the
/// remainder of the run. The policy is never re-probed, even if the
/// provider's capabilities change mid-run, so log output stays consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForceConsistency {
    Auto,
    ForceConsistent,
    #[default]
    Extrapolated,
}

/// Provenance description of an optimizer, for logging and run metadata.
/// Not sufficient to reconstruct the optimizer.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizerInfo {
    pub algorithm: &'static str,
    pub fmax: Option<f64>,
    pub max_steps: usize,
    pub restart: Option<PathBuf>,
}

/// Force-based structure relaxation driver.
///
/// Specializes the generic [`Dynamics`] run-loop with a convergence
/// predicate on the maximum per-atom force magnitude, a text log of each
/// step, and restart persistence for the step algorithm's internal memory.
/// The actual coordinate update is delegated to the supplied
/// [`StepAlgorithm`].
pub struct Optimizer<'a, S: System> {
    system: &'a mut S,
    state: RunState<S>,
    algorithm: Box<dyn StepAlgorithm<S>>,
    fmax: Option<f64>,
    force_consistency: ForceConsistency,
    restart: Option<PathBuf>,
    write_restart: bool,
    logger: Option<OptimizationLogger>,
}

impl<'a, S: System + 'static> Optimizer<'a, S> {
    /// Starts building an optimizer around an externally owned system.
    pub fn builder(
        system: &'a mut S,
        algorithm: Box<dyn StepAlgorithm<S>>,
    ) -> OptimizerBuilder<'a, S> {
        OptimizerBuilder::new(system, algorithm)
    }
}

impl<'a, S: System> Optimizer<'a, S> {
    /// Sets the convergence threshold (and optionally a step budget), then
    /// runs to completion. Returns the final convergence flag.
    pub fn run(&mut self, fmax: f64, steps: Option<usize>) -> Result<bool, EngineError> {
        self.prepare(fmax, steps);
        Dynamics::run(self)
    }

    /// Sets the convergence threshold (and optionally a step budget), then
    /// returns the cooperative iteration for the caller to drive.
    pub fn irun(&mut self, fmax: f64, steps: Option<usize>) -> Iteration<'_, Self> {
        self.prepare(fmax, steps);
        Dynamics::irun(self)
    }

    fn prepare(&mut self, fmax: f64, steps: Option<usize>) {
        self.fmax = Some(fmax);
        if let Some(steps) = steps {
            self.state.max_steps = steps;
        }
    }

    /// The resolved force-consistency flag (never `Auto` after
    /// construction).
    pub fn force_consistent(&self) -> bool {
        self.force_consistency == ForceConsistency::ForceConsistent
    }

    pub fn algorithm(&self) -> &dyn StepAlgorithm<S> {
        self.algorithm.as_ref()
    }

    /// Provenance description of this optimizer.
    pub fn info(&self) -> OptimizerInfo {
        OptimizerInfo {
            algorithm: self.algorithm.name(),
            fmax: self.fmax,
            max_steps: self.state.max_steps,
            restart: self.restart.clone(),
        }
    }

    /// Convergence test against precomputed forces: every per-atom squared
    /// force magnitude must lie below `fmax^2`, and, when the system exposes
    /// a curvature estimate, the curvature must be negative.
    pub fn check_convergence(&self, forces: &[Vector3<f64>]) -> Result<bool, EngineError> {
        let fmax = self.fmax.ok_or_else(|| {
            EngineError::Configuration(
                "convergence threshold not set; call run() or irun() with an fmax".into(),
            )
        })?;
        let max_force_sq = forces
            .iter()
            .map(|f| f.norm_squared())
            .fold(0.0f64, f64::max);
        let forces_ok = max_force_sq < fmax * fmax;

        if let Some(probe) = self.system.curvature_probe() {
            return Ok(forces_ok && probe.curvature() < 0.0);
        }
        Ok(forces_ok)
    }

    /// Writes an algorithm restart record, if persistence is enabled and
    /// this process is the designated writer. All other cases are a no-op.
    pub fn dump(&self, payload: &serde_json::Value) -> Result<(), EngineError> {
        if !self.write_restart {
            return Ok(());
        }
        let Some(path) = &self.restart else {
            return Ok(());
        };
        restart::write_record(path, payload)
    }

    /// Reads the restart record back from the configured path.
    pub fn load(&self) -> Result<serde_json::Value, EngineError> {
        let path = self.restart.as_ref().ok_or_else(|| {
            EngineError::Configuration("no restart path configured".into())
        })?;
        restart::read_record(path)
    }

    fn log_forces(&mut self, forces: &[Vector3<f64>]) -> Result<(), EngineError> {
        let Some(logger) = self.logger.as_mut() else {
            return Ok(());
        };
        let fmax = forces
            .iter()
            .map(|f| f.norm_squared())
            .fold(0.0f64, f64::max)
            .sqrt();
        let force_consistent = self.force_consistency == ForceConsistency::ForceConsistent;
        let energy = self.system.potential_energy(force_consistent)?;
        logger.log(self.algorithm.name(), self.state.nsteps, energy, fmax)
    }
}

impl<'a, S: System> Dynamics for Optimizer<'a, S> {
    type System = S;

    fn components(&mut self) -> (&mut S, &mut RunState<S>) {
        (&mut *self.system, &mut self.state)
    }

    fn run_state(&self) -> &RunState<S> {
        &self.state
    }

    fn step(&mut self) -> Result<(), EngineError> {
        let forces = self.system.forces()?;
        self.algorithm.step(&mut *self.system, &forces)?;

        if self.restart.is_some() && self.write_restart {
            let snapshot = self.algorithm.snapshot().map_err(|source| {
                EngineError::Internal(format!("could not encode restart record: {source}"))
            })?;
            self.dump(&snapshot)?;
        }
        Ok(())
    }

    fn converged(&mut self) -> Result<bool, EngineError> {
        let forces = self.system.forces()?;
        self.check_convergence(&forces)
    }

    fn log(&mut self) -> Result<(), EngineError> {
        let forces = self.system.forces()?;
        self.log_forces(&forces)
    }
}

/// Builder for [`Optimizer`]; validates the configuration, resolves the
/// force-consistency policy, and restores persisted algorithm memory before
/// the first step.
pub struct OptimizerBuilder<'a, S: System> {
    system: &'a mut S,
    algorithm: Box<dyn StepAlgorithm<S>>,
    restart: Option<PathBuf>,
    logfile: Option<Box<dyn Write>>,
    trajectory: Option<Box<dyn TrajectorySink<S>>>,
    write_restart: bool,
    force_consistency: ForceConsistency,
    max_steps: Option<usize>,
}

impl<'a, S: System + 'static> OptimizerBuilder<'a, S> {
    pub fn new(system: &'a mut S, algorithm: Box<dyn StepAlgorithm<S>>) -> Self {
        Self {
            system,
            algorithm,
            restart: None,
            logfile: None,
            trajectory: None,
            write_restart: true,
            force_consistency: ForceConsistency::default(),
            max_steps: None,
        }
    }

    /// Path for restart persistence. If the file exists at build time the
    /// algorithm memory is restored from it; otherwise the algorithm starts
    /// fresh and the file is written after every step.
    pub fn restart(mut self, path: impl Into<PathBuf>) -> Self {
        self.restart = Some(path.into());
        self
    }

    /// Sink for the optimization text log.
    pub fn logfile(mut self, sink: Box<dyn Write>) -> Self {
        self.logfile = Some(sink);
        self
    }

    /// Trajectory sink, attached as the first observer with interval 1.
    pub fn trajectory(mut self, sink: Box<dyn TrajectorySink<S>>) -> Self {
        self.trajectory = Some(sink);
        self
    }

    /// Whether this process is the designated restart writer. In a
    /// multi-process run exactly one rank sets this to true, decided
    /// externally before construction; all others no-op on `dump`.
    pub fn write_restart(mut self, write: bool) -> Self {
        self.write_restart = write;
        self
    }

    pub fn force_consistency(mut self, policy: ForceConsistency) -> Self {
        self.force_consistency = policy;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn build(self) -> Result<Optimizer<'a, S>, EngineError> {
        let OptimizerBuilder {
            system,
            mut algorithm,
            restart,
            logfile,
            trajectory,
            write_restart,
            force_consistency,
            max_steps,
        } = self;

        match &restart {
            Some(path) if path.exists() => {
                let record = restart::read_record(path)?;
                algorithm
                    .restore(record)
                    .map_err(|source| EngineError::Restart {
                        path: path.clone(),
                        source,
                    })?;
                info!(path = %path.display(), "restored algorithm memory from restart file");
            }
            _ => algorithm.initialize(),
        }

        let force_consistency = match force_consistency {
            ForceConsistency::Auto => {
                let resolved = resolve_force_consistency(system)?;
                debug!(?resolved, "force-consistency policy resolved");
                resolved
            }
            policy => policy,
        };

        let mut state = RunState::new();
        if let Some(max_steps) = max_steps {
            state.max_steps = max_steps;
        }

        let mut optimizer = Optimizer {
            system,
            state,
            algorithm,
            fmax: None,
            force_consistency,
            restart,
            write_restart,
            logger: logfile.map(OptimizationLogger::new),
        };

        if let Some(mut sink) = trajectory {
            optimizer.attach(1, move |system: &S| sink.write_frame(system));
        }

        Ok(optimizer)
    }
}

/// Probes the provider once for a force-consistent energy. A
/// "not implemented" reply downgrades the policy permanently; any other
/// provider failure propagates.
fn resolve_force_consistency<S: System>(system: &mut S) -> Result<ForceConsistency, EngineError> {
    match system.potential_energy(true) {
        Ok(_) => Ok(ForceConsistency::ForceConsistent),
        Err(ProviderError::NotImplemented { .. }) => Ok(ForceConsistency::Extrapolated),
        Err(source) => Err(source.into()),
    }
}
