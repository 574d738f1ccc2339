//! Assembly of the placement program from catalog, request and objective weights.

use log::debug;

use crate::catalog::{Catalog, HypervisorCandidate};
use crate::feasibility::{passes, FeasibilityDimension};
use crate::objective::{selection_coefficient, ObjectiveWeights};
use crate::program::{ComparisonOp, ConstraintKind, LinearProgram, VarId, VarKind};
use crate::request::{PlacementRequest, SelectionCountPolicy};

/// Builds the binary program of one decision.
///
/// The program contains one selection variable per candidate and, per candidate and resource dimension,
/// one auxiliary slack variable `d` bound by `d >= (capacity - required) * x` and
/// `d >= (required - capacity) * x`. At the optimum `d` equals `|capacity - required| * x`, which keeps the
/// absolute value of the objective linear.
///
/// Capacities may come in any unit, e.g. RAM in bytes. To keep the solver numerically stable each resource
/// dimension is divided by its largest value in the catalog and request, so slack coefficients lie in
/// `[-1, 1]`, and the objective is divided by its largest coefficient. The scale is stored in the program.
pub struct ConstraintAssembler<'a> {
    catalog: &'a Catalog,
    request: &'a PlacementRequest,
    weights: &'a ObjectiveWeights,
}

impl<'a> ConstraintAssembler<'a> {
    pub fn new(catalog: &'a Catalog, request: &'a PlacementRequest, weights: &'a ObjectiveWeights) -> Self {
        Self {
            catalog,
            request,
            weights,
        }
    }

    pub fn assemble(&self) -> LinearProgram {
        let mut program = LinearProgram::new();
        let vcpu_scale = self.dimension_scale(FeasibilityDimension::Vcpu);
        let ram_scale = self.dimension_scale(FeasibilityDimension::Ram);
        let objective_scale = self
            .catalog
            .iter()
            .map(|c| selection_coefficient(c, self.weights).abs())
            .fold(self.weights.alpha * vcpu_scale.max(ram_scale), f64::max)
            .max(1.);
        program.set_objective_scale(objective_scale);

        for candidate in self.catalog.iter() {
            let x = program.add_selection_variable(
                &candidate.name,
                selection_coefficient(candidate, self.weights) / objective_scale,
            );
            self.add_slack(&mut program, candidate, x, FeasibilityDimension::Vcpu, vcpu_scale);
            self.add_slack(&mut program, candidate, x, FeasibilityDimension::Ram, ram_scale);
        }

        let selection: Vec<(VarId, f64)> = program.selection_variables().map(|(_, x)| (x, 1.)).collect();
        let (op, count) = match self.request.selection_count_policy {
            SelectionCountPolicy::AtLeast(k) => (ComparisonOp::Ge, k),
            SelectionCountPolicy::AtMost(k) => (ComparisonOp::Le, k),
            SelectionCountPolicy::Exactly(k) => (ComparisonOp::Eq, k),
        };
        program.add_constraint(ConstraintKind::Cardinality, selection.clone(), op, count as f64);
        if self.request.needs_non_empty_constraint() {
            program.add_constraint(ConstraintKind::NonEmpty, selection, ComparisonOp::Ge, 1.);
        }

        for dimension in FeasibilityDimension::ALL {
            let failing: Vec<(VarId, f64)> = self
                .catalog
                .iter()
                .filter(|c| !passes(dimension, c, self.request))
                .filter_map(|c| program.selection_variable(&c.name))
                .map(|x| (x, 1.))
                .collect();
            if failing.is_empty() {
                continue;
            }
            debug!("{} candidates excluded by {:?} constraint", failing.len(), dimension);
            program.add_constraint(ConstraintKind::Exclusion(dimension), failing, ComparisonOp::Eq, 0.);
        }

        debug!(
            "assembled program: {} variables, {} constraints, policy {}, scales vcpu={} ram={} objective={}",
            program.variables().len(),
            program.constraints().len(),
            self.request.selection_count_policy,
            vcpu_scale,
            ram_scale,
            objective_scale
        );
        program
    }

    /// Largest value of the dimension among capacities and the requirement, at least 1.
    fn dimension_scale(&self, dimension: FeasibilityDimension) -> f64 {
        let (required, capacities): (f64, Vec<f64>) = match dimension {
            FeasibilityDimension::Vcpu => (
                self.request.required_vcpu as f64,
                self.catalog.iter().map(|c| c.vcpu_capacity as f64).collect(),
            ),
            FeasibilityDimension::Ram => (
                self.request.required_ram as f64,
                self.catalog.iter().map(|c| c.ram_capacity as f64).collect(),
            ),
            FeasibilityDimension::Feature => return 1.,
        };
        capacities.into_iter().fold(required, f64::max).max(1.)
    }

    /// Adds `d` in units of `scale`, so its objective coefficient is `alpha * scale` before objective scaling.
    fn add_slack(
        &self,
        program: &mut LinearProgram,
        candidate: &HypervisorCandidate,
        x: VarId,
        dimension: FeasibilityDimension,
        scale: f64,
    ) {
        let (label, diff) = match dimension {
            FeasibilityDimension::Vcpu => (
                "vcpu",
                candidate.vcpu_capacity as f64 - self.request.required_vcpu as f64,
            ),
            FeasibilityDimension::Ram => ("ram", candidate.ram_capacity as f64 - self.request.required_ram as f64),
            FeasibilityDimension::Feature => return,
        };
        let diff = diff / scale;
        let d = program.add_variable(
            format!("d_{}_{}", label, candidate.name),
            VarKind::NonNegative,
            self.weights.alpha * scale / program.objective_scale(),
        );
        let kind = ConstraintKind::Linearization(dimension);
        program.add_constraint(kind, vec![(d, 1.), (x, -diff)], ComparisonOp::Ge, 0.);
        program.add_constraint(kind, vec![(d, 1.), (x, diff)], ComparisonOp::Ge, 0.);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HypervisorCandidate;
    use crate::feasibility::is_structurally_feasible;
    use crate::request::FeatureRequirement;

    fn catalog() -> Catalog {
        Catalog::from_candidates(vec![
            HypervisorCandidate::new("H1", 128, 128, 3).with_feature(true),
            HypervisorCandidate::new("H2", 108, 64, 2),
            HypervisorCandidate::new("H3", 10, 32, 5).with_feature(true),
        ])
        .unwrap()
    }

    #[test]
    fn test_program_shape() {
        let catalog = catalog();
        let request = PlacementRequest::new(100, 33, SelectionCountPolicy::AtLeast(2));
        let weights = ObjectiveWeights::default();
        let program = ConstraintAssembler::new(&catalog, &request, &weights).assemble();

        // one selection and two slack variables per candidate
        assert_eq!(program.variables().len(), 9);
        assert_eq!(program.selection_count(), 3);
        assert_eq!(program.constraints_of(ConstraintKind::Cardinality).count(), 1);
        assert_eq!(program.constraints_of(ConstraintKind::NonEmpty).count(), 0);
        assert_eq!(
            program
                .constraints_of(ConstraintKind::Linearization(FeasibilityDimension::Vcpu))
                .count(),
            3 * 2
        );
        // H3 fails both vcpu and ram, feature is not requested
        assert_eq!(
            program
                .constraints_of(ConstraintKind::Exclusion(FeasibilityDimension::Vcpu))
                .count(),
            1
        );
        assert_eq!(
            program
                .constraints_of(ConstraintKind::Exclusion(FeasibilityDimension::Feature))
                .count(),
            0
        );
        // largest slack coefficient alpha * 128 is the objective scale
        assert_eq!(program.objective_scale(), 128.);
        let h1 = program.selection_variable("H1").unwrap();
        assert_eq!(program.variable(h1).objective, 6. / 128.);
    }

    #[test]
    fn test_coefficients_are_normalized_for_byte_capacities() {
        let gib = 1u64 << 30;
        let catalog = Catalog::from_candidates(
            (1..=6).map(|i| HypervisorCandidate::new(&format!("h{}", i), 16 * i, 64 * gib * i as u64, i as i32)),
        )
        .unwrap();
        let request = PlacementRequest::new(20, 100 * gib, SelectionCountPolicy::AtLeast(2));
        let weights = ObjectiveWeights::default();
        let program = ConstraintAssembler::new(&catalog, &request, &weights).assemble();

        for constraint in program.constraints() {
            assert!(constraint.terms.iter().all(|(_, coef)| coef.abs() <= 1.));
        }
        assert!(program.variables().iter().all(|v| v.objective.abs() <= 1.));
        assert_eq!(program.objective_scale(), (384 * gib) as f64);

        // scaled objective of the slack and selection variables gives back the real cost
        let h2 = catalog.get("h2").unwrap();
        let x = program.selection_variable("h2").unwrap();
        let values = |var: VarId| {
            if var == x {
                1.
            } else if program.variable(var).name == "d_vcpu_h2" {
                12. / 96.
            } else if program.variable(var).name == "d_ram_h2" {
                28. / 384.
            } else {
                0.
            }
        };
        let real = program.objective_value(values) * program.objective_scale();
        let expected = crate::objective::cost(h2, &request, &weights);
        assert!((real - expected).abs() <= 1e-6 * expected);
    }

    #[test]
    fn test_exclusion_agrees_with_filter() {
        let catalog = catalog();
        let requests = vec![
            PlacementRequest::new(100, 33, SelectionCountPolicy::AtLeast(2)),
            PlacementRequest::new(1, 1, SelectionCountPolicy::AtMost(1)).with_feature(FeatureRequirement::Present),
            PlacementRequest::new(1, 1, SelectionCountPolicy::AtMost(1)).with_feature(FeatureRequirement::Absent),
            PlacementRequest::new(500, 500, SelectionCountPolicy::Exactly(1)),
        ];
        let weights = ObjectiveWeights::default();
        for request in requests {
            let program = ConstraintAssembler::new(&catalog, &request, &weights).assemble();
            for candidate in catalog.iter() {
                let x = program.selection_variable(&candidate.name).unwrap();
                assert_eq!(
                    is_structurally_feasible(candidate, &request),
                    !program.is_forced_to_zero(x),
                    "disagreement for {} and {:?}",
                    candidate.name,
                    request
                );
            }
        }
    }

    #[test]
    fn test_non_empty_constraint_for_at_most() {
        let catalog = catalog();
        let request = PlacementRequest::new(1, 1, SelectionCountPolicy::AtMost(1));
        let weights = ObjectiveWeights::default();
        let program = ConstraintAssembler::new(&catalog, &request, &weights).assemble();
        assert_eq!(program.constraints_of(ConstraintKind::NonEmpty).count(), 1);

        let request = request.with_allow_empty(true);
        let program = ConstraintAssembler::new(&catalog, &request, &weights).assemble();
        assert_eq!(program.constraints_of(ConstraintKind::NonEmpty).count(), 0);
    }
}
