//! Objective weights and per-candidate cost.

use serde::{Deserialize, Serialize};

use crate::catalog::HypervisorCandidate;
use crate::error::{PlacementError, Result};
use crate::request::PlacementRequest;

/// Weights of the minimized objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Weight of the absolute resource slack (vCPU and RAM).
    pub alpha: f64,
    /// Weight of the candidate priority.
    pub beta: f64,
    /// Constant subtracted per selected candidate.
    ///
    /// A large bonus makes every selection profitable, so the solver selects as many candidates as the
    /// cardinality policy allows. Zero disables the incentive.
    pub bonus_per_selection: f64,
}

impl ObjectiveWeights {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            bonus_per_selection: 0.,
        }
    }

    pub fn with_bonus(mut self, bonus_per_selection: f64) -> Self {
        self.bonus_per_selection = bonus_per_selection;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("bonus_per_selection", self.bonus_per_selection),
        ] {
            if !value.is_finite() || value < 0. {
                return Err(PlacementError::InvalidWeights(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self::new(1.0, 2.0)
    }
}

/// Absolute vCPU slack between candidate capacity and requirement.
pub fn vcpu_slack(candidate: &HypervisorCandidate, request: &PlacementRequest) -> f64 {
    (candidate.vcpu_capacity as f64 - request.required_vcpu as f64).abs()
}

/// Absolute RAM slack between candidate capacity and requirement.
pub fn ram_slack(candidate: &HypervisorCandidate, request: &PlacementRequest) -> f64 {
    (candidate.ram_capacity as f64 - request.required_ram as f64).abs()
}

/// Part of the cost which does not depend on resource slack.
/// This is the coefficient of the selection variable in the linearized objective.
pub fn selection_coefficient(candidate: &HypervisorCandidate, weights: &ObjectiveWeights) -> f64 {
    weights.beta * candidate.priority as f64 - weights.bonus_per_selection
}

/// Cost of selecting the candidate, defined for every candidate regardless of feasibility.
pub fn cost(candidate: &HypervisorCandidate, request: &PlacementRequest, weights: &ObjectiveWeights) -> f64 {
    weights.alpha * vcpu_slack(candidate, request)
        + weights.alpha * ram_slack(candidate, request)
        + selection_coefficient(candidate, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SelectionCountPolicy;

    #[test]
    fn test_cost() {
        let request = PlacementRequest::new(100, 33, SelectionCountPolicy::AtLeast(2));
        let weights = ObjectiveWeights::default();
        // |128 - 100| + |128 - 33| + 2 * 3
        assert_eq!(cost(&HypervisorCandidate::new("h1", 128, 128, 3), &request, &weights), 129.);
        // |10 - 100| + |32 - 33| + 2 * 5
        assert_eq!(cost(&HypervisorCandidate::new("h3", 10, 32, 5), &request, &weights), 101.);

        let weights = weights.with_bonus(2000.);
        assert_eq!(
            cost(&HypervisorCandidate::new("h2", 108, 64, 2), &request, &weights),
            8. + 31. + 4. - 2000.
        );
    }

    #[test]
    fn test_validate() {
        assert!(ObjectiveWeights::default().validate().is_ok());
        assert!(ObjectiveWeights::new(-1., 2.).validate().is_err());
        assert!(ObjectiveWeights::new(1., f64::NAN).validate().is_err());
        assert!(ObjectiveWeights::new(1., 2.).with_bonus(f64::INFINITY).validate().is_err());
    }
}
