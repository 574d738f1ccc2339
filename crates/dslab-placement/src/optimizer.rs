//! Placement optimizer combining assembly, solving and interpretation.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{info, warn};

use crate::assembler::ConstraintAssembler;
use crate::catalog::Catalog;
use crate::config::PlacementConfig;
use crate::decision::Decision;
use crate::error::Result;
use crate::interpreter::DecisionInterpreter;
use crate::objective::ObjectiveWeights;
use crate::request::PlacementRequest;
use crate::selector::Selector;
use crate::solvers::microlp_solver::MicrolpSolver;

/// Decision together with the raw values of the selection variables.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub decision: Decision,
    /// Selection variable value per candidate in id order, `None` when the solver returned no solution.
    pub values: IndexMap<String, Option<f64>>,
}

/// Selects hypervisors for placement requests.
///
/// Each call to [`PlacementOptimizer::decide`] builds a fresh program for the given catalog and request,
/// so one optimizer can be shared between threads and used for concurrent decisions.
#[derive(Clone)]
pub struct PlacementOptimizer {
    selector: Selector,
    weights: ObjectiveWeights,
}

impl PlacementOptimizer {
    pub fn new(selector: Selector, weights: ObjectiveWeights) -> Self {
        Self { selector, weights }
    }

    /// Creates optimizer which uses microlp without timeout.
    pub fn with_weights(weights: ObjectiveWeights) -> Self {
        Self::new(Selector::new(Arc::new(MicrolpSolver::new())), weights)
    }

    pub fn from_config(config: &PlacementConfig) -> Result<Self> {
        config.weights.validate()?;
        Ok(Self::new(config.build_selector()?, config.weights))
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn decide(&self, catalog: &Catalog, request: &PlacementRequest) -> Result<Decision> {
        Ok(self.decide_with_report(catalog, request)?.decision)
    }

    pub fn decide_with_report(&self, catalog: &Catalog, request: &PlacementRequest) -> Result<DecisionReport> {
        self.weights.validate()?;
        request.validate()?;
        info!(
            "placing vcpu={} ram={} feature={:?} policy={} over {} candidates",
            request.required_vcpu,
            request.required_ram,
            request.required_feature,
            request.selection_count_policy,
            catalog.get_candidate_count()
        );

        let program = ConstraintAssembler::new(catalog, request, &self.weights).assemble();
        let outcome = self.selector.solve(&program);

        let values = program
            .selection_variables()
            .map(|(name, var)| {
                let value = outcome.assignment.as_ref().and_then(|a| a.get(&var).copied());
                (name.to_string(), value)
            })
            .collect();

        let interpreter =
            DecisionInterpreter::new(catalog, request, &self.weights, self.selector.integrality_tolerance());
        let decision = interpreter.interpret(outcome, &program)?;
        match &decision {
            Decision::Placed { selected, objective } => info!("selected {:?} with cost {}", selected, objective),
            Decision::Rejected { status, detail } => {
                warn!("no placement: {:?} {}", status, detail.as_deref().unwrap_or(""))
            }
        }
        Ok(DecisionReport { decision, values })
    }
}
