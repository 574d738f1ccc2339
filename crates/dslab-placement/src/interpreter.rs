//! Interpretation of solver output into a placement decision.

use log::{debug, error};

use crate::catalog::Catalog;
use crate::decision::Decision;
use crate::error::{PlacementError, Result};
use crate::feasibility::{check, FeasibilityVerdict};
use crate::objective::{cost, ObjectiveWeights};
use crate::program::LinearProgram;
use crate::request::PlacementRequest;
use crate::solver::{SolveOutcome, SolveStatus};

/// Relative tolerance of the objective cross-check, against the larger of the cost and the objective scale.
const OBJECTIVE_TOLERANCE: f64 = 1e-6;

/// Maps raw solver output back to candidate ids and validates it.
pub struct DecisionInterpreter<'a> {
    catalog: &'a Catalog,
    request: &'a PlacementRequest,
    weights: &'a ObjectiveWeights,
    tolerance: f64,
}

impl<'a> DecisionInterpreter<'a> {
    /// `tolerance` is the integrality tolerance documented by the solver.
    pub fn new(
        catalog: &'a Catalog,
        request: &'a PlacementRequest,
        weights: &'a ObjectiveWeights,
        tolerance: f64,
    ) -> Self {
        Self {
            catalog,
            request,
            weights,
            tolerance,
        }
    }

    pub fn interpret(&self, outcome: SolveOutcome, program: &LinearProgram) -> Result<Decision> {
        if outcome.status != SolveStatus::Optimal {
            debug!("solve finished with status {:?}", outcome.status);
            return Ok(Decision::rejected(outcome.status, outcome.detail));
        }
        let assignment = outcome.assignment.ok_or_else(|| {
            PlacementError::SolverContractViolation("optimal outcome without assignment".to_string())
        })?;

        let mut selected = Vec::new();
        // selection variables are visited in candidate id order
        for (name, var) in program.selection_variables() {
            let value = *assignment.get(&var).ok_or_else(|| {
                PlacementError::SolverContractViolation(format!("no value for selection variable of {}", name))
            })?;
            if (value - 1.).abs() <= self.tolerance {
                selected.push(name.to_string());
            } else if value.abs() > self.tolerance {
                return Err(PlacementError::SolverContractViolation(format!(
                    "selection variable of {} has non-binary value {}",
                    name, value
                )));
            }
        }

        self.validate(&selected)?;

        let expected: f64 = selected
            .iter()
            .filter_map(|name| self.catalog.get(name))
            .map(|c| cost(c, self.request, self.weights))
            .sum();
        if let Some(objective) = outcome.objective {
            let scale = program.objective_scale();
            let objective = objective * scale;
            if (objective - expected).abs() > OBJECTIVE_TOLERANCE * expected.abs().max(scale) {
                error!("solver objective {} differs from selection cost {}", objective, expected);
                return Err(PlacementError::InvariantViolation(format!(
                    "solver objective {} differs from cost {} of selection {:?}",
                    objective, expected, selected
                )));
            }
        }

        Ok(Decision::Placed {
            selected,
            objective: expected,
        })
    }

    fn validate(&self, selected: &[String]) -> Result<()> {
        if !self.request.accepts_selection_count(selected.len()) {
            return Err(PlacementError::InvariantViolation(format!(
                "{} candidates selected, policy {} (allow_empty = {})",
                selected.len(),
                self.request.selection_count_policy,
                self.request.allow_empty
            )));
        }
        for name in selected {
            let candidate = self.catalog.get(name).ok_or_else(|| {
                PlacementError::InvariantViolation(format!("selected candidate {} is not in catalog", name))
            })?;
            let verdict = check(candidate, self.request);
            if verdict != FeasibilityVerdict::Success {
                return Err(PlacementError::InvariantViolation(format!(
                    "selected candidate {} is not feasible: {:?}",
                    name, verdict
                )));
            }
        }
        Ok(())
    }
}
