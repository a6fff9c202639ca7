use super::error::EngineError;
use super::observer::ObserverEntry;
use crate::core::models::system::System;

/// Step budget used when no explicit limit is set.
pub const DEFAULT_MAX_STEPS: usize = 100_000_000;

/// Mutable per-run bookkeeping shared by every dynamics driver: the monotonic
/// step counter, the step budget, and the observer list.
pub struct RunState<S> {
    pub(crate) nsteps: usize,
    pub(crate) max_steps: usize,
    pub(crate) observers: Vec<ObserverEntry<S>>,
}

impl<S> RunState<S> {
    pub fn new() -> Self {
        Self {
            nsteps: 0,
            max_steps: DEFAULT_MAX_STEPS,
            observers: Vec::new(),
        }
    }

    pub fn nsteps(&self) -> usize {
        self.nsteps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }
}

impl<S> Default for RunState<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The suspension point a continuing iteration has just reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial forces are computed but nothing has been logged yet; the
    /// driver may inspect or mutate the system before the step-0 log.
    PostInitialForces,
    /// A step was taken; its log/observer calls have not happened yet.
    PostStep,
}

/// Result of advancing an [`Iteration`] by one suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// The run continues; the payload names the phase just reached.
    Continue(Phase),
    /// Terminal: the convergence predicate is satisfied.
    Converged,
    /// Terminal: the step budget is exhausted without convergence.
    BudgetExhausted,
}

enum Stage {
    Start,
    PendingInitialLog,
    PendingStepLog,
    Finished(bool),
}

/// Cooperative, resumable iteration over a dynamics run.
///
/// This is the explicit-state replacement for a generator: each
/// [`poll`](Iteration::poll) call advances the run to the next suspension
/// point and returns control to the caller, which makes it possible to
/// interleave several independent drivers one step at a time on a single
/// thread. No other suspension points exist, and there is no implicit
/// concurrency.
///
/// Polling a finished iteration keeps returning the terminal [`Poll`] value.
pub struct Iteration<'d, D: Dynamics> {
    driver: &'d mut D,
    stage: Stage,
}

impl<'d, D: Dynamics> Iteration<'d, D> {
    fn new(driver: &'d mut D) -> Self {
        Self {
            driver,
            stage: Stage::Start,
        }
    }

    /// Advances the run to the next suspension point.
    ///
    /// Ordering guarantees: the initial force evaluation happens before the
    /// first log/observer calls; every step strictly happens before its
    /// corresponding log/observer calls; observers complete sequentially in
    /// insertion order. Errors from the step algorithm, the provider, the
    /// log sink, or any observer abort the iteration and propagate
    /// unmodified.
    pub fn poll(&mut self) -> Result<Poll, EngineError> {
        match self.stage {
            Stage::Start => {
                let (system, _) = self.driver.components();
                system.forces()?;
                self.stage = Stage::PendingInitialLog;
                Ok(Poll::Continue(Phase::PostInitialForces))
            }
            Stage::PendingInitialLog => {
                if self.driver.run_state().nsteps == 0 {
                    self.driver.log()?;
                    self.driver.call_observers()?;
                }
                self.advance()
            }
            Stage::PendingStepLog => {
                self.driver.log()?;
                self.driver.call_observers()?;
                self.advance()
            }
            Stage::Finished(converged) => Ok(terminal(converged)),
        }
    }

    /// Checks the convergence predicate and budget, then takes one step.
    fn advance(&mut self) -> Result<Poll, EngineError> {
        if self.driver.converged()? {
            self.stage = Stage::Finished(true);
            return Ok(terminal(true));
        }
        if self.driver.run_state().nsteps >= self.driver.run_state().max_steps {
            self.stage = Stage::Finished(false);
            return Ok(terminal(false));
        }

        self.driver.step()?;
        self.driver.components().1.nsteps += 1;
        self.stage = Stage::PendingStepLog;
        Ok(Poll::Continue(Phase::PostStep))
    }
}

fn terminal(converged: bool) -> Poll {
    if converged {
        Poll::Converged
    } else {
        Poll::BudgetExhausted
    }
}

/// Generic run-loop shared by structure optimizers and molecular dynamics
/// drivers.
///
/// A driver supplies the run state, the system handle, and (usually) a
/// `step` implementation; the trait's provided methods contribute observer
/// management and the iteration protocol. `converged` and `log` have
/// do-nothing defaults so that drivers without a convergence criterion (e.g.
/// thermostats) need not override them.
pub trait Dynamics {
    type System: System;

    /// Split-borrow accessor used by the provided methods: the system handle
    /// and the run state, mutably and disjointly.
    fn components(&mut self) -> (&mut Self::System, &mut RunState<Self::System>);

    fn run_state(&self) -> &RunState<Self::System>;

    /// Computes the next state of the system.
    ///
    /// The default reports the missing step algorithm as a fatal
    /// configuration error at the first call, not at construction.
    fn step(&mut self) -> Result<(), EngineError> {
        Err(EngineError::Configuration(
            "no step algorithm supplied for this dynamics driver".into(),
        ))
    }

    /// Convergence predicate; always false unless a driver defines one.
    fn converged(&mut self) -> Result<bool, EngineError> {
        Ok(false)
    }

    /// Writes one log record for the current step; no-op by default.
    fn log(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Number of completed steps.
    fn nsteps(&self) -> usize {
        self.run_state().nsteps
    }

    /// Appends an observer with the given trigger interval.
    fn attach<F>(&mut self, interval: i64, observer: F)
    where
        Self: Sized,
        F: FnMut(&Self::System) -> Result<(), EngineError> + 'static,
    {
        let (_, state) = self.components();
        state.observers.push(ObserverEntry::new(interval, observer));
    }

    /// Inserts an observer at an explicit position in the call order, e.g.
    /// to make a trajectory writer fire before a custom logger.
    fn insert_observer<F>(&mut self, position: usize, interval: i64, observer: F)
    where
        Self: Sized,
        F: FnMut(&Self::System) -> Result<(), EngineError> + 'static,
    {
        let (_, state) = self.components();
        state
            .observers
            .insert(position, ObserverEntry::new(interval, observer));
    }

    /// Invokes every observer whose trigger rule matches the current step
    /// count, in insertion order. Calls are not deduplicated: invoking this
    /// twice at the same step count fires matching observers twice.
    fn call_observers(&mut self) -> Result<(), EngineError> {
        let (system, state) = self.components();
        let nsteps = state.nsteps;
        for entry in &mut state.observers {
            if entry.is_due(nsteps) {
                entry.call(system)?;
            }
        }
        Ok(())
    }

    /// Starts (or resumes, if the step counter is non-zero) the cooperative
    /// iteration over this run.
    fn irun(&mut self) -> Iteration<'_, Self>
    where
        Self: Sized,
    {
        Iteration::new(self)
    }

    /// Drains the iteration to completion and returns the final convergence
    /// flag.
    fn run(&mut self) -> Result<bool, EngineError>
    where
        Self: Sized,
    {
        let mut iteration = self.irun();
        loop {
            match iteration.poll()? {
                Poll::Continue(_) => {}
                Poll::Converged => return Ok(true),
                Poll::BudgetExhausted => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::provider::{EnergyForceProvider, ProviderError};
    use crate::core::models::system::ParticleSystem;
    use nalgebra::Vector3;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Still;

    impl EnergyForceProvider for Still {
        fn energy(&mut self, _: &[Vector3<f64>], _: bool) -> Result<f64, ProviderError> {
            Ok(0.0)
        }

        fn forces(&mut self, positions: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>, ProviderError> {
            Ok(vec![Vector3::zeros(); positions.len()])
        }
    }

    fn still_system() -> ParticleSystem<Still> {
        ParticleSystem::new(vec![Vector3::zeros()], Still)
    }

    /// Driver with a no-op step and a step-count based convergence rule.
    struct TestDriver {
        system: ParticleSystem<Still>,
        state: RunState<ParticleSystem<Still>>,
        converge_at: Option<usize>,
    }

    impl TestDriver {
        fn new(max_steps: usize, converge_at: Option<usize>) -> Self {
            let mut state = RunState::new();
            state.max_steps = max_steps;
            Self {
                system: still_system(),
                state,
                converge_at,
            }
        }
    }

    impl Dynamics for TestDriver {
        type System = ParticleSystem<Still>;

        fn components(&mut self) -> (&mut Self::System, &mut RunState<Self::System>) {
            (&mut self.system, &mut self.state)
        }

        fn run_state(&self) -> &RunState<Self::System> {
            &self.state
        }

        fn step(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn converged(&mut self) -> Result<bool, EngineError> {
            Ok(self
                .converge_at
                .is_some_and(|threshold| self.state.nsteps >= threshold))
        }
    }

    /// Driver that does not override `step`.
    struct InertDriver {
        system: ParticleSystem<Still>,
        state: RunState<ParticleSystem<Still>>,
    }

    impl Dynamics for InertDriver {
        type System = ParticleSystem<Still>;

        fn components(&mut self) -> (&mut Self::System, &mut RunState<Self::System>) {
            (&mut self.system, &mut self.state)
        }

        fn run_state(&self) -> &RunState<Self::System> {
            &self.state
        }
    }

    #[test]
    fn missing_step_algorithm_is_reported_at_first_run_not_at_construction() {
        let mut driver = InertDriver {
            system: still_system(),
            state: RunState::new(),
        };

        let result = driver.run();

        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn first_poll_suspends_after_initial_forces() {
        let mut driver = TestDriver::new(10, None);
        let mut iteration = driver.irun();

        assert!(matches!(
            iteration.poll().unwrap(),
            Poll::Continue(Phase::PostInitialForces)
        ));
        assert!(matches!(
            iteration.poll().unwrap(),
            Poll::Continue(Phase::PostStep)
        ));
    }

    #[test]
    fn converged_at_step_zero_terminates_without_stepping() {
        let mut driver = TestDriver::new(10, Some(0));
        let mut iteration = driver.irun();

        assert!(matches!(
            iteration.poll().unwrap(),
            Poll::Continue(Phase::PostInitialForces)
        ));
        assert_eq!(iteration.poll().unwrap(), Poll::Converged);
        drop(iteration);

        assert_eq!(driver.nsteps(), 0);
    }

    #[test]
    fn poll_count_is_budget_plus_two_when_never_converging() {
        for budget in [0usize, 1, 4] {
            let mut driver = TestDriver::new(budget, None);
            let mut iteration = driver.irun();

            for _ in 0..budget + 1 {
                assert!(matches!(iteration.poll().unwrap(), Poll::Continue(_)));
            }
            assert_eq!(iteration.poll().unwrap(), Poll::BudgetExhausted);
            // Terminal results are sticky.
            assert_eq!(iteration.poll().unwrap(), Poll::BudgetExhausted);
            drop(iteration);

            assert_eq!(driver.nsteps(), budget);
        }
    }

    #[test]
    fn run_reports_budget_exhaustion_as_not_converged() {
        let mut driver = TestDriver::new(3, None);
        assert!(!driver.run().unwrap());
        assert_eq!(driver.nsteps(), 3);
    }

    #[test]
    fn run_reports_convergence() {
        let mut driver = TestDriver::new(10, Some(2));
        assert!(driver.run().unwrap());
        assert_eq!(driver.nsteps(), 2);
    }

    fn counting_observer(
        counter: &Rc<RefCell<usize>>,
    ) -> impl FnMut(&ParticleSystem<Still>) -> Result<(), EngineError> + 'static {
        let counter = Rc::clone(counter);
        move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn positive_interval_observer_fires_on_multiples_within_the_run() {
        let mut driver = TestDriver::new(5, None);
        let count = Rc::new(RefCell::new(0));
        driver.attach(2, counting_observer(&count));

        driver.run().unwrap();

        // Steps logged: 0..=5; interval 2 matches 0, 2, 4.
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn non_positive_interval_observer_fires_exactly_once() {
        let mut driver = TestDriver::new(5, None);
        let count = Rc::new(RefCell::new(0));
        driver.attach(-3, counting_observer(&count));

        driver.run().unwrap();

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn observer_past_the_budget_never_fires() {
        let mut driver = TestDriver::new(2, None);
        let count = Rc::new(RefCell::new(0));
        driver.attach(-7, counting_observer(&count));

        driver.run().unwrap();

        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn call_observers_is_not_deduplicated() {
        let mut driver = TestDriver::new(5, None);
        let count = Rc::new(RefCell::new(0));
        driver.attach(1, counting_observer(&count));

        driver.call_observers().unwrap();
        driver.call_observers().unwrap();

        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn insert_observer_controls_call_order() {
        let mut driver = TestDriver::new(0, None);
        let order = Rc::new(RefCell::new(Vec::new()));

        let appended = Rc::clone(&order);
        driver.attach(1, move |_| {
            appended.borrow_mut().push("appended");
            Ok(())
        });
        let inserted = Rc::clone(&order);
        driver.insert_observer(0, 1, move |_| {
            inserted.borrow_mut().push("inserted");
            Ok(())
        });

        driver.call_observers().unwrap();

        assert_eq!(*order.borrow(), vec!["inserted", "appended"]);
    }

    #[test]
    fn observer_errors_abort_the_run() {
        let mut driver = TestDriver::new(5, None);
        driver.attach(1, |_| Err(EngineError::Internal("observer exploded".into())));

        let result = driver.run();

        assert!(matches!(result, Err(EngineError::Internal(_))));
    }
}
