//! Optimizer driver which submits a program to the solver.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::program::LinearProgram;
use crate::solver::{Assignment, MilpSolver, SolveOutcome};

/// Submits assembled programs to a solver backend and reports the raw outcome.
///
/// The selector never retries and never changes the program. With a timeout configured the solve runs on
/// a separate thread; if no result arrives in time the outcome is `SolverError`. The abandoned solve keeps
/// running to completion in the background and its result is dropped.
///
/// Clones share a counter of live solver threads. Once it reaches the limit (see
/// [`Selector::with_max_solver_threads`]) further solves fail with `SolverError` instead of starting a thread.
#[derive(Clone)]
pub struct Selector {
    solver: Arc<dyn MilpSolver>,
    timeout: Option<Duration>,
    solver_threads: Arc<AtomicUsize>,
    max_solver_threads: usize,
}

/// Default limit of live solver threads per selector.
pub const DEFAULT_MAX_SOLVER_THREADS: usize = 64;

impl Selector {
    pub fn new(solver: Arc<dyn MilpSolver>) -> Self {
        Self {
            solver,
            timeout: None,
            solver_threads: Arc::new(AtomicUsize::new(0)),
            max_solver_threads: DEFAULT_MAX_SOLVER_THREADS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Limits the number of solver threads alive at once, including abandoned ones.
    pub fn with_max_solver_threads(mut self, max_solver_threads: usize) -> Self {
        self.max_solver_threads = max_solver_threads.max(1);
        self
    }

    /// Number of solver threads which are still running.
    pub fn running_solver_threads(&self) -> usize {
        self.solver_threads.load(Ordering::SeqCst)
    }

    pub fn integrality_tolerance(&self) -> f64 {
        self.solver.integrality_tolerance()
    }

    pub fn solve(&self, program: &LinearProgram) -> SolveOutcome {
        if program.variables().is_empty() {
            return solve_empty(program);
        }

        let start = Instant::now();
        let outcome = match self.timeout {
            None => run_guarded(self.solver.as_ref(), program),
            Some(timeout) => self.solve_with_timeout(program, timeout),
        };
        debug!(
            "solver returned {:?} in {:.3}s",
            outcome.status,
            start.elapsed().as_secs_f64()
        );
        outcome
    }

    fn solve_with_timeout(&self, program: &LinearProgram, timeout: Duration) -> SolveOutcome {
        if self.solver_threads.fetch_add(1, Ordering::SeqCst) >= self.max_solver_threads {
            self.solver_threads.fetch_sub(1, Ordering::SeqCst);
            warn!("{} solver threads are still running", self.max_solver_threads);
            return SolveOutcome::error(format!(
                "too many solver threads still running (limit {})",
                self.max_solver_threads
            ));
        }

        let (sender, receiver) = mpsc::channel();
        let solver = self.solver.clone();
        let program = program.clone();
        let solver_threads = self.solver_threads.clone();
        let spawned = thread::Builder::new()
            .name("placement-solver".to_string())
            .spawn(move || {
                let outcome = run_guarded(solver.as_ref(), &program);
                solver_threads.fetch_sub(1, Ordering::SeqCst);
                // receiver may be gone after a timeout
                let _ = sender.send(outcome);
            });
        if let Err(e) = spawned {
            self.solver_threads.fetch_sub(1, Ordering::SeqCst);
            return SolveOutcome::error(format!("can't start solver thread: {}", e));
        }

        match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                warn!("solver timed out after {:?}", timeout);
                SolveOutcome::error(format!("solver timed out after {:?}", timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                SolveOutcome::error("solver thread exited without result".to_string())
            }
        }
    }
}

fn run_guarded(solver: &dyn MilpSolver, program: &LinearProgram) -> SolveOutcome {
    catch_unwind(AssertUnwindSafe(|| solver.solve(program)))
        .unwrap_or_else(|_| SolveOutcome::error("solver panicked".to_string()))
}

/// Program without variables (empty catalog): the only point is the empty assignment.
fn solve_empty(program: &LinearProgram) -> SolveOutcome {
    if program.constraints().iter().all(|c| c.is_satisfied(|_| 0., 0.)) {
        SolveOutcome::optimal(Assignment::new(), 0.)
    } else {
        SolveOutcome::infeasible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{ComparisonOp, ConstraintKind};
    use crate::solver::SolveStatus;

    struct SleepySolver(Duration);

    impl MilpSolver for SleepySolver {
        fn solve(&self, _program: &LinearProgram) -> SolveOutcome {
            thread::sleep(self.0);
            SolveOutcome::infeasible()
        }
    }

    struct PanickingSolver;

    impl MilpSolver for PanickingSolver {
        fn solve(&self, _program: &LinearProgram) -> SolveOutcome {
            panic!("backend crashed");
        }
    }

    fn single_variable_program() -> LinearProgram {
        let mut program = LinearProgram::new();
        let x = program.add_selection_variable("h1", 1.);
        program.add_constraint(ConstraintKind::Cardinality, vec![(x, 1.)], ComparisonOp::Ge, 1.);
        program
    }

    #[test]
    fn test_timeout_maps_to_solver_error() {
        let selector =
            Selector::new(Arc::new(SleepySolver(Duration::from_millis(500)))).with_timeout(Duration::from_millis(10));
        let outcome = selector.solve(&single_variable_program());
        assert_eq!(outcome.status, SolveStatus::SolverError);
        assert!(outcome.assignment.is_none());
        assert!(outcome.detail.unwrap().contains("timed out"));
    }

    #[test]
    fn test_abandoned_solves_are_limited() {
        let selector = Selector::new(Arc::new(SleepySolver(Duration::from_millis(300))))
            .with_timeout(Duration::from_millis(10))
            .with_max_solver_threads(1);
        let first = selector.solve(&single_variable_program());
        assert!(first.detail.unwrap().contains("timed out"));
        assert_eq!(selector.running_solver_threads(), 1);

        // the clone shares the limit
        let second = selector.clone().solve(&single_variable_program());
        assert_eq!(second.status, SolveStatus::SolverError);
        assert!(second.detail.unwrap().contains("still running"));

        thread::sleep(Duration::from_millis(600));
        assert_eq!(selector.running_solver_threads(), 0);
        let third = selector.solve(&single_variable_program());
        assert!(third.detail.unwrap().contains("timed out"));
    }

    #[test]
    fn test_result_within_timeout_is_kept() {
        let selector =
            Selector::new(Arc::new(SleepySolver(Duration::from_millis(1)))).with_timeout(Duration::from_secs(10));
        assert_eq!(
            selector.solve(&single_variable_program()).status,
            SolveStatus::Infeasible
        );
    }

    #[test]
    fn test_panic_maps_to_solver_error() {
        let outcome = Selector::new(Arc::new(PanickingSolver)).solve(&single_variable_program());
        assert_eq!(outcome.status, SolveStatus::SolverError);

        let outcome = Selector::new(Arc::new(PanickingSolver))
            .with_timeout(Duration::from_secs(10))
            .solve(&single_variable_program());
        assert_eq!(outcome.status, SolveStatus::SolverError);
    }

    #[test]
    fn test_empty_program() {
        let selector = Selector::new(Arc::new(PanickingSolver));
        let mut program = LinearProgram::new();
        program.add_constraint(ConstraintKind::Cardinality, vec![], ComparisonOp::Le, 1.);
        assert_eq!(selector.solve(&program).status, SolveStatus::Optimal);
        program.add_constraint(ConstraintKind::NonEmpty, vec![], ComparisonOp::Ge, 1.);
        assert_eq!(selector.solve(&program).status, SolveStatus::Infeasible);
    }
}
