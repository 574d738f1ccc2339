//! Placement decision.

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, Result};
use crate::solver::SolveStatus;

/// Output of one placement decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Selected candidate ids, sorted by id.
    Placed { selected: Vec<String>, objective: f64 },
    /// The solver did not report an optimum. The status tells infeasibility apart from solver failures.
    Rejected { status: SolveStatus, detail: Option<String> },
}

impl Decision {
    pub fn rejected(status: SolveStatus, detail: Option<String>) -> Self {
        Decision::Rejected { status, detail }
    }

    pub fn status(&self) -> SolveStatus {
        match self {
            Decision::Placed { .. } => SolveStatus::Optimal,
            Decision::Rejected { status, .. } => *status,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, Decision::Placed { .. })
    }

    /// Returns true if no selection satisfies the constraints.
    pub fn is_infeasible(&self) -> bool {
        self.status() == SolveStatus::Infeasible
    }

    /// Selected ids, empty for rejected decisions.
    pub fn selected(&self) -> &[String] {
        match self {
            Decision::Placed { selected, .. } => selected,
            Decision::Rejected { .. } => &[],
        }
    }

    /// Converts rejected decisions into the matching error.
    pub fn into_result(self) -> Result<Vec<String>> {
        match self {
            Decision::Placed { selected, .. } => Ok(selected),
            Decision::Rejected { status, detail } => Err(match status {
                SolveStatus::Infeasible => PlacementError::NoFeasibleCandidate,
                SolveStatus::Unbounded => PlacementError::Unbounded,
                SolveStatus::SolverError => PlacementError::SolverError(detail.unwrap_or_default()),
                SolveStatus::Optimal => PlacementError::InvariantViolation(
                    "rejected decision carries optimal status".to_string(),
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let placed = Decision::Placed {
            selected: vec!["H1".to_string(), "H2".to_string()],
            objective: 178.,
        };
        assert_eq!(placed.into_result().unwrap(), vec!["H1", "H2"]);
        assert_eq!(
            Decision::rejected(SolveStatus::Infeasible, None).into_result(),
            Err(PlacementError::NoFeasibleCandidate)
        );
        assert_eq!(
            Decision::rejected(SolveStatus::SolverError, Some("timeout".to_string())).into_result(),
            Err(PlacementError::SolverError("timeout".to_string()))
        );
        assert_eq!(
            Decision::rejected(SolveStatus::Unbounded, None).into_result(),
            Err(PlacementError::Unbounded)
        );
        let bad = Decision::rejected(SolveStatus::Optimal, None).into_result();
        assert!(bad.unwrap_err().is_defect());
    }

    #[test]
    fn test_json_keeps_order_and_status() {
        let placed = Decision::Placed {
            selected: vec!["a".to_string(), "b".to_string()],
            objective: 1.5,
        };
        let json = serde_json::to_string(&placed).unwrap();
        assert_eq!(json, r#"{"outcome":"placed","selected":["a","b"],"objective":1.5}"#);

        let rejected = Decision::rejected(SolveStatus::Infeasible, None);
        let json = serde_json::to_string(&rejected).unwrap();
        let parsed: Decision = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_infeasible());
    }
}
