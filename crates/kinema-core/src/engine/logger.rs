use super::error::EngineError;
use chrono::Local;
use std::io::Write;

/// Append-only text log of an optimization run.
///
/// The first record is preceded by a column header; every record carries the
/// driver name, the step index, the wall-clock time, the current energy
/// (under the resolved force-consistency policy), and the maximum per-atom
/// force magnitude. The sink is flushed after every record so the log stays
/// usable while the run is still going.
pub struct OptimizationLogger {
    sink: Box<dyn Write>,
    wrote_header: bool,
}

impl OptimizationLogger {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self {
            sink,
            wrote_header: false,
        }
    }

    pub fn log(
        &mut self,
        name: &str,
        nsteps: usize,
        energy: f64,
        fmax: f64,
    ) -> Result<(), EngineError> {
        if !self.wrote_header {
            writeln!(
                self.sink,
                "{:width$}  {:>4} {:>8} {:>15}  {:>12}",
                "",
                "Step",
                "Time",
                "Energy",
                "fmax",
                width = name.len()
            )?;
            self.wrote_header = true;
        }

        let time = Local::now().format("%H:%M:%S");
        writeln!(
            self.sink,
            "{}: {:>4} {} {:>15.6} {:>15.6}",
            name, nsteps, time, energy, fmax
        )?;
        self.sink.flush()?;
        Ok(())
    }
}
