//! Solver backend built on the pure-Rust `microlp` crate.

use microlp::{OptimizationDirection, Problem};

use crate::program::{ComparisonOp, LinearProgram, VarKind};
use crate::solver::{Assignment, MilpSolver, SolveOutcome};

/// Solves placement programs with the microlp simplex and branch-and-bound implementation.
#[derive(Debug, Clone)]
pub struct MicrolpSolver {
    tolerance: f64,
}

impl MicrolpSolver {
    pub fn new() -> Self {
        Self { tolerance: 1e-6 }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpSolver for MicrolpSolver {
    fn solve(&self, program: &LinearProgram) -> SolveOutcome {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<microlp::Variable> = program
            .variables()
            .iter()
            .map(|v| match v.kind {
                VarKind::Binary => problem.add_binary_var(v.objective),
                VarKind::NonNegative => problem.add_var(v.objective, (0., f64::INFINITY)),
            })
            .collect();

        for constraint in program.constraints() {
            let op = match constraint.op {
                ComparisonOp::Eq => microlp::ComparisonOp::Eq,
                ComparisonOp::Le => microlp::ComparisonOp::Le,
                ComparisonOp::Ge => microlp::ComparisonOp::Ge,
            };
            problem.add_constraint(
                constraint.terms.iter().map(|(var, coef)| (vars[var.index()], *coef)),
                op,
                constraint.rhs,
            );
        }

        match problem.solve() {
            Ok(solution) => {
                // values are reported in the order of variable creation
                let assignment: Assignment = program
                    .variable_ids()
                    .zip(solution.iter().map(|(_, value)| *value))
                    .collect();
                SolveOutcome::optimal(assignment, solution.objective())
            }
            Err(microlp::Error::Infeasible) => SolveOutcome::infeasible(),
            Err(microlp::Error::Unbounded) => SolveOutcome::unbounded(),
            #[allow(unreachable_patterns)]
            Err(e) => SolveOutcome::error(e.to_string()),
        }
    }

    fn integrality_tolerance(&self) -> f64 {
        self.tolerance
    }
}
