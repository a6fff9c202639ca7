use super::error::EngineError;
use crate::core::models::system::System;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Sink receiving the system state at every observer-triggered point.
///
/// A sink is exclusively owned by one dynamics driver for the duration of a
/// run; two concurrent drivers must not share one output path.
pub trait TrajectorySink<S: System> {
    fn write_frame(&mut self, system: &S) -> Result<(), EngineError>;
}

/// One recorded configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub positions: Vec<[f64; 3]>,
}

/// Line-delimited JSON trajectory file, one frame per line.
///
/// Whether an existing file is appended to or truncated is decided at
/// construction and does not change mid-run.
pub struct JsonTrajectory {
    writer: BufWriter<File>,
}

impl JsonTrajectory {
    pub fn create(path: impl AsRef<Path>, append: bool) -> Result<Self, EngineError> {
        let file = if append {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Reads every frame of a trajectory file back.
    pub fn read_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>, EngineError> {
        let reader = BufReader::new(File::open(path)?);
        let mut frames = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str(&line).map_err(|source| {
                EngineError::Internal(format!("corrupt trajectory line: {source}"))
            })?;
            frames.push(frame);
        }
        Ok(frames)
    }
}

impl<S: System> TrajectorySink<S> for JsonTrajectory {
    fn write_frame(&mut self, system: &S) -> Result<(), EngineError> {
        let frame = Frame {
            positions: system
                .positions()
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect(),
        };
        let line = serde_json::to_string(&frame)
            .map_err(|source| EngineError::Internal(format!("could not encode frame: {source}")))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::ParticleSystem;
    use crate::core::potentials::HarmonicWell;
    use nalgebra::Vector3;
    use tempfile::tempdir;

    fn one_particle_at(x: f64) -> ParticleSystem<HarmonicWell> {
        ParticleSystem::new(
            vec![Vector3::new(x, 0.0, 0.0)],
            HarmonicWell::at_origin(1.0, 1),
        )
    }

    #[test]
    fn frames_round_trip_through_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.traj");

        let mut sink = JsonTrajectory::create(&path, false).unwrap();
        sink.write_frame(&one_particle_at(0.5)).unwrap();
        sink.write_frame(&one_particle_at(0.25)).unwrap();
        drop(sink);

        let frames = JsonTrajectory::read_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert!((frames[0].positions[0][0] - 0.5).abs() < 1e-12);
        assert!((frames[1].positions[0][0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn truncate_mode_discards_previous_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.traj");

        let mut sink = JsonTrajectory::create(&path, false).unwrap();
        sink.write_frame(&one_particle_at(0.5)).unwrap();
        drop(sink);

        let mut sink = JsonTrajectory::create(&path, false).unwrap();
        sink.write_frame(&one_particle_at(0.1)).unwrap();
        drop(sink);

        let frames = JsonTrajectory::read_frames(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert!((frames[0].positions[0][0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn append_mode_preserves_previous_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.traj");

        let mut sink = JsonTrajectory::create(&path, false).unwrap();
        sink.write_frame(&one_particle_at(0.5)).unwrap();
        drop(sink);

        let mut sink = JsonTrajectory::create(&path, true).unwrap();
        sink.write_frame(&one_particle_at(0.1)).unwrap();
        drop(sink);

        let frames = JsonTrajectory::read_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
    }
}
