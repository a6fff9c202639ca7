use super::error::EngineError;

/// A registered callback with its trigger cadence.
///
/// Interval semantics follow the run-loop convention:
/// - `interval > 0`: fire at every step where `nsteps % interval == 0`,
///   which includes step 0;
/// - `interval <= 0`: fire exactly once, at the step where
///   `nsteps == |interval|`.
///
/// Observers fire in insertion order and are never isolated from each other:
/// the first error aborts the run.
pub struct ObserverEntry<S> {
    callback: Box<dyn FnMut(&S) -> Result<(), EngineError>>,
    interval: i64,
}

impl<S> ObserverEntry<S> {
    pub fn new<F>(interval: i64, callback: F) -> Self
    where
        F: FnMut(&S) -> Result<(), EngineError> + 'static,
    {
        Self {
            callback: Box::new(callback),
            interval,
        }
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Whether this entry triggers at the given step count.
    pub fn is_due(&self, nsteps: usize) -> bool {
        if self.interval > 0 {
            nsteps % self.interval as usize == 0
        } else {
            nsteps == self.interval.unsigned_abs() as usize
        }
    }

    pub(crate) fn call(&mut self, system: &S) -> Result<(), EngineError> {
        (self.callback)(system)
    }
}
