use crate::core::models::system::System;
use crate::engine::algorithms::{Fire, StepAlgorithm, SteepestDescent};
use crate::engine::dynamics::{DEFAULT_MAX_STEPS, Dynamics};
use crate::engine::error::EngineError;
use crate::engine::optimizer::{ForceConsistency, Optimizer};
use crate::engine::trajectory::JsonTrajectory;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Step algorithm selector for the relaxation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    SteepestDescent,
    Fire,
}

#[derive(Debug, Clone)]
pub struct RelaxConfig {
    pub fmax: f64,
    pub max_steps: usize,
    pub algorithm: AlgorithmKind,
    pub restart_path: Option<PathBuf>,
    pub write_restart: bool,
    pub trajectory_path: Option<PathBuf>,
    pub append_trajectory: bool,
    pub logfile_path: Option<PathBuf>,
    pub force_consistency: ForceConsistency,
}

#[derive(Default)]
pub struct RelaxConfigBuilder {
    fmax: Option<f64>,
    max_steps: Option<usize>,
    algorithm: Option<AlgorithmKind>,
    restart_path: Option<PathBuf>,
    write_restart: Option<bool>,
    trajectory_path: Option<PathBuf>,
    append_trajectory: Option<bool>,
    logfile_path: Option<PathBuf>,
    force_consistency: Option<ForceConsistency>,
}

impl RelaxConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fmax(mut self, fmax: f64) -> Self {
        self.fmax = Some(fmax);
        self
    }
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
    pub fn algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = Some(algorithm);
        self
    }
    pub fn restart_path(mut self, path: PathBuf) -> Self {
        self.restart_path = Some(path);
        self
    }
    pub fn write_restart(mut self, write: bool) -> Self {
        self.write_restart = Some(write);
        self
    }
    pub fn trajectory_path(mut self, path: PathBuf) -> Self {
        self.trajectory_path = Some(path);
        self
    }
    pub fn append_trajectory(mut self, append: bool) -> Self {
        self.append_trajectory = Some(append);
        self
    }
    pub fn logfile_path(mut self, path: PathBuf) -> Self {
        self.logfile_path = Some(path);
        self
    }
    pub fn force_consistency(mut self, policy: ForceConsistency) -> Self {
        self.force_consistency = Some(policy);
        self
    }

    pub fn build(self) -> Result<RelaxConfig, EngineError> {
        Ok(RelaxConfig {
            fmax: self.fmax.ok_or_else(|| {
                EngineError::Configuration("missing required parameter: fmax".into())
            })?,
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            algorithm: self.algorithm.unwrap_or(AlgorithmKind::Fire),
            restart_path: self.restart_path,
            write_restart: self.write_restart.unwrap_or(true),
            trajectory_path: self.trajectory_path,
            append_trajectory: self.append_trajectory.unwrap_or(false),
            logfile_path: self.logfile_path,
            force_consistency: self.force_consistency.unwrap_or_default(),
        })
    }
}

/// Outcome summary of a relaxation run.
#[derive(Debug, Clone)]
pub struct RelaxReport {
    pub converged: bool,
    pub steps_taken: usize,
    pub final_energy: f64,
    pub final_fmax: f64,
}

/// Relaxes the system in place until the maximum per-atom force drops below
/// `config.fmax` or the step budget runs out.
#[instrument(skip_all, name = "relax_workflow")]
pub fn run<S: System + 'static>(
    system: &mut S,
    config: &RelaxConfig,
) -> Result<RelaxReport, EngineError> {
    info!(
        algorithm = ?config.algorithm,
        fmax = config.fmax,
        max_steps = config.max_steps,
        "starting relaxation"
    );

    let algorithm: Box<dyn StepAlgorithm<S>> = match config.algorithm {
        AlgorithmKind::SteepestDescent => Box::new(SteepestDescent::default()),
        AlgorithmKind::Fire => Box::new(Fire::default()),
    };

    let mut builder = Optimizer::builder(system, algorithm)
        .write_restart(config.write_restart)
        .force_consistency(config.force_consistency);
    if let Some(path) = &config.restart_path {
        builder = builder.restart(path);
    }
    if let Some(path) = &config.logfile_path {
        let sink = OpenOptions::new().create(true).append(true).open(path)?;
        builder = builder.logfile(Box::new(sink));
    }
    if let Some(path) = &config.trajectory_path {
        let sink = JsonTrajectory::create(path, config.append_trajectory)?;
        builder = builder.trajectory(Box::new(sink));
    }

    let mut optimizer = builder.build()?;
    let converged = optimizer.run(config.fmax, Some(config.max_steps))?;
    let steps_taken = optimizer.nsteps();
    let force_consistent = optimizer.force_consistent();
    drop(optimizer);

    let forces = system.forces()?;
    let final_fmax = forces
        .iter()
        .map(|f| f.norm_squared())
        .fold(0.0f64, f64::max)
        .sqrt();
    let final_energy = system.potential_energy(force_consistent)?;

    info!(converged, steps_taken, final_fmax, "relaxation finished");
    Ok(RelaxReport {
        converged,
        steps_taken,
        final_energy,
        final_fmax,
    })
}
