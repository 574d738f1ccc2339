//! MILP solving capability consumed by the optimizer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::options::ConfigValue;
use crate::error::{PlacementError, Result};
use crate::program::{LinearProgram, VarId};
use crate::solvers::microlp_solver::MicrolpSolver;

/// Status reported by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    SolverError,
}

/// Variable values returned by a solver, keyed by variable id.
pub type Assignment = BTreeMap<VarId, f64>;

/// Result of one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Present only for `Optimal`.
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
    /// Human-readable detail for non-optimal outcomes.
    pub detail: Option<String>,
}

impl SolveOutcome {
    pub fn optimal(assignment: Assignment, objective: f64) -> Self {
        Self {
            status: SolveStatus::Optimal,
            assignment: Some(assignment),
            objective: Some(objective),
            detail: None,
        }
    }

    pub fn infeasible() -> Self {
        Self::without_solution(SolveStatus::Infeasible, None)
    }

    pub fn unbounded() -> Self {
        Self::without_solution(SolveStatus::Unbounded, None)
    }

    pub fn error(detail: String) -> Self {
        Self::without_solution(SolveStatus::SolverError, Some(detail))
    }

    fn without_solution(status: SolveStatus, detail: Option<String>) -> Self {
        Self {
            status,
            assignment: None,
            objective: None,
            detail,
        }
    }
}

/// Trait for MILP solver backends.
///
/// The solver minimizes the program objective subject to all of its constraints and must return a value for
/// every declared variable when the status is `Optimal`. Binary variables are expected to take values in
/// {0, 1} up to [`MilpSolver::integrality_tolerance`]. An optimum must be global, not local.
///
/// Implementations hold no per-solve state, so one instance can serve concurrent decisions.
pub trait MilpSolver: Send + Sync {
    fn solve(&self, program: &LinearProgram) -> SolveOutcome;

    /// Maximum distance from 0 or 1 at which a binary value is still treated as integral.
    fn integrality_tolerance(&self) -> f64 {
        1e-6
    }
}

/// Creates solver from config string like `Microlp[tolerance=1e-6]`.
pub fn solver_resolver(config_str: &str) -> Result<Box<dyn MilpSolver>> {
    let value = ConfigValue::parse(config_str);
    match value.name.as_str() {
        "Microlp" => {
            let mut solver = MicrolpSolver::new();
            if let Some(tolerance) = value.option::<f64>("tolerance")? {
                solver = solver.with_tolerance(tolerance);
            }
            Ok(Box::new(solver))
        }
        _ => Err(PlacementError::Config(format!("can't resolve solver: {}", config_str))),
    }
}
