//! Binary program built for a single decision.
//!
//! A [`LinearProgram`] owns every variable and constraint of one solve. Variables are addressed by
//! [`VarId`] indices into the program's own arena, so ids of different programs never alias and nothing
//! outlives the decision that created it.
//!
//! Objective coefficients may be stored divided by a positive [`LinearProgram::objective_scale`] to keep them
//! in a range the solver handles well. Multiplying a solver objective by the scale gives the real cost.

use std::collections::BTreeMap;

use crate::feasibility::FeasibilityDimension;

/// Index of a variable inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Takes values in {0, 1}.
    Binary,
    /// Continuous variable in `[0, +inf)`.
    NonNegative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    /// Coefficient in the minimized objective.
    pub objective: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Le,
    Ge,
}

/// Origin of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Cardinality,
    NonEmpty,
    Exclusion(FeasibilityDimension),
    Linearization(FeasibilityDimension),
}

/// `sum(coef * var) <op> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(VarId, f64)>,
    pub op: ComparisonOp,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Evaluates the constraint for the given variable values.
    pub fn is_satisfied(&self, value: impl Fn(VarId) -> f64, tolerance: f64) -> bool {
        let lhs: f64 = self.terms.iter().map(|(var, coef)| coef * value(*var)).sum();
        match self.op {
            ComparisonOp::Eq => (lhs - self.rhs).abs() <= tolerance,
            ComparisonOp::Le => lhs <= self.rhs + tolerance,
            ComparisonOp::Ge => lhs >= self.rhs - tolerance,
        }
    }
}

/// Minimization program over binary selection variables and auxiliary non-negative variables.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    selection: BTreeMap<String, VarId>,
    objective_scale: f64,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            selection: BTreeMap::new(),
            objective_scale: 1.,
        }
    }

    /// Sets the factor that converts program objective values back to real costs.
    pub fn set_objective_scale(&mut self, scale: f64) {
        assert!(scale.is_finite() && scale > 0., "objective scale must be positive, got {}", scale);
        self.objective_scale = scale;
    }

    pub fn objective_scale(&self) -> f64 {
        self.objective_scale
    }

    /// Adds variable and returns its id.
    pub fn add_variable(&mut self, name: String, kind: VarKind, objective: f64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable { name, kind, objective });
        id
    }

    /// Adds the binary selection variable of a candidate.
    /// Returns the existing variable if the candidate already has one.
    pub fn add_selection_variable(&mut self, candidate: &str, objective: f64) -> VarId {
        if let Some(var) = self.selection.get(candidate) {
            return *var;
        }
        let var = self.add_variable(format!("x_{}", candidate), VarKind::Binary, objective);
        self.selection.insert(candidate.to_string(), var);
        var
    }

    pub fn add_constraint(&mut self, kind: ConstraintKind, terms: Vec<(VarId, f64)>, op: ComparisonOp, rhs: f64) {
        self.constraints.push(LinearConstraint { kind, terms, op, rhs });
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Iterates over ids of all variables in creation order.
    pub fn variable_ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.variables.len()).map(VarId)
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Returns constraints of the specified kind.
    pub fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.kind == kind)
    }

    /// Iterates over `(candidate, variable)` pairs in candidate id order.
    pub fn selection_variables(&self) -> impl Iterator<Item = (&str, VarId)> {
        self.selection.iter().map(|(name, var)| (name.as_str(), *var))
    }

    pub fn selection_variable(&self, candidate: &str) -> Option<VarId> {
        self.selection.get(candidate).copied()
    }

    pub fn selection_count(&self) -> usize {
        self.selection.len()
    }

    /// Returns true if some exclusion constraint pins the variable to zero.
    pub fn is_forced_to_zero(&self, var: VarId) -> bool {
        self.constraints.iter().any(|c| {
            matches!(c.kind, ConstraintKind::Exclusion(_))
                && c.op == ComparisonOp::Eq
                && c.rhs == 0.
                && c.terms.iter().all(|(_, coef)| *coef > 0.)
                && c.terms.iter().any(|(v, _)| *v == var)
        })
    }

    /// Computes objective value for the given variable values, in program units.
    pub fn objective_value(&self, value: impl Fn(VarId) -> f64) -> f64 {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| v.objective * value(VarId(i)))
            .sum()
    }
}

impl Default for LinearProgram {
    fn default() -> Self {
        Self::new()
    }
}
