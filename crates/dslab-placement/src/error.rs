//! Error types of the placement optimizer.

use thiserror::Error;

/// Errors produced while building or interpreting a placement decision.
///
/// The first three variants describe outcomes where no valid placement exists or the solver could not
/// produce one. The contract and invariant variants indicate a defect in the model or in the solver backend
/// and must never be treated as an ordinary "no placement" answer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlacementError {
    /// No selection satisfies the hard constraints together with the cardinality policy.
    #[error("no feasible candidate set for request")]
    NoFeasibleCandidate,

    /// The solver reported an unbounded objective.
    #[error("placement program is unbounded")]
    Unbounded,

    /// Transport or resource failure of the solving capability (including timeouts).
    #[error("solver error: {0}")]
    SolverError(String),

    /// Solver reported an optimum but returned values outside {0, 1} or omitted a variable.
    #[error("solver contract violation: {0}")]
    SolverContractViolation(String),

    /// Post-hoc validation of an optimal solution failed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid objective weights: {0}")]
    InvalidWeights(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("report error: {0}")]
    Report(String),
}

impl PlacementError {
    /// Returns true if the error points to a bug in the optimizer or the solver rather than to the input.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            PlacementError::SolverContractViolation(_) | PlacementError::InvariantViolation(_)
        )
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, PlacementError>;
