//! Numeric constraint solving
//!
//! A [`ConstraintSolver`] owns a set of bounded [`Variable`]s and linear
//! [`Constraint`]s over them. [`ConstraintSolver::solve`] runs a
//! priority-ordered relaxation heuristic; [`ConstraintSolver::solve_exact`]
//! hands the same system to the kasuari Cassowary solver.

mod cassowary;
mod relax;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use relax::ConstraintSolver;

/// Standard strengths. Any value in `[0, 1]` is accepted.
pub mod strength {
    pub const REQUIRED: f64 = 1.0;
    pub const STRONG: f64 = 0.75;
    pub const MEDIUM: f64 = 0.5;
    pub const WEAK: f64 = 0.25;
}

/// Handle to a variable, only meaningful to the solver that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId {
    pub(crate) solver: usize,
    pub(crate) index: usize,
}

impl VariableId {
    /// Position of the variable in its solver
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A solver-owned variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: VariableId,
    name: String,
    pub(crate) value: f64,
    min: f64,
    max: f64,
    initial: f64,
}

impl Variable {
    pub(crate) fn new(id: VariableId, name: String, value: f64, min: f64, max: f64) -> Self {
        let value = value.clamp(min, max);
        Self {
            id,
            name,
            value,
            min,
            max,
            initial: value,
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub(crate) fn initial(&self) -> f64 {
        self.initial
    }

    pub(crate) fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Whether the variable has room to move in the direction of `delta`
    pub(crate) fn can_move(&self, delta: f64) -> bool {
        if delta > 0.0 {
            self.value < self.max
        } else if delta < 0.0 {
            self.value > self.min
        } else {
            false
        }
    }
}

/// Relation a constraint expresses between `Σ coefficient·variable` and its
/// constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Equal,
    LessEqual,
    GreaterEqual,
    Fixed,
    Minimize,
    Maximize,
}

impl ConstraintKind {
    /// Objectives never count as violated
    pub fn is_objective(&self) -> bool {
        matches!(self, Self::Minimize | Self::Maximize)
    }
}

/// A linear constraint over solver variables
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    kind: ConstraintKind,
    variables: Vec<VariableId>,
    coefficients: Vec<f64>,
    constant: f64,
    strength: f64,
}

impl Constraint {
    /// Create a constraint, rejecting malformed input
    pub fn new(
        kind: ConstraintKind,
        variables: Vec<VariableId>,
        coefficients: Vec<f64>,
        constant: f64,
        strength: f64,
    ) -> Result<Self, SolverError> {
        if variables.len() != coefficients.len() {
            return Err(SolverError::CoefficientMismatch {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(SolverError::InvalidStrength(strength));
        }
        if !constant.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolverError::NonFinite);
        }
        if kind == ConstraintKind::Fixed && variables.len() != 1 {
            return Err(SolverError::FixedArity(variables.len()));
        }

        Ok(Self {
            kind,
            variables,
            coefficients,
            constant,
            strength,
        })
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn variables(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// `Σ coefficient·value`, with `value` giving each variable's current value
    pub fn evaluate(&self, value: impl Fn(VariableId) -> f64) -> f64 {
        self.variables
            .iter()
            .zip(&self.coefficients)
            .map(|(id, coefficient)| coefficient * value(*id))
            .sum()
    }

    /// Whether the constraint holds within `epsilon`
    pub fn is_satisfied(&self, value: impl Fn(VariableId) -> f64, epsilon: f64) -> bool {
        let current = self.evaluate(value);
        match self.kind {
            ConstraintKind::Equal | ConstraintKind::Fixed => {
                (current - self.constant).abs() <= epsilon
            }
            ConstraintKind::LessEqual => current <= self.constant + epsilon,
            ConstraintKind::GreaterEqual => current >= self.constant - epsilon,
            ConstraintKind::Minimize | ConstraintKind::Maximize => true,
        }
    }
}

/// Errors from building or solving a constraint system
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("constraint has {variables} variables but {coefficients} coefficients")]
    CoefficientMismatch { variables: usize, coefficients: usize },

    #[error("strength {0} is outside [0, 1]")]
    InvalidStrength(f64),

    #[error("FIXED constraints take exactly one variable, got {0}")]
    FixedArity(usize),

    #[error("constraint contains a non-finite number")]
    NonFinite,

    #[error("variable {0:?} does not belong to this solver")]
    UnknownVariable(VariableId),

    #[error("variable '{name}' has bounds [{min}, {max}]")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("Unsatisfiable constraints: {0}")]
    Unsatisfiable(String),

    #[error("Internal solver error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> VariableId {
        VariableId { solver: 0, index }
    }

    #[test]
    fn test_coefficient_length_must_match() {
        let err = Constraint::new(
            ConstraintKind::Equal,
            vec![id(0), id(1)],
            vec![1.0],
            10.0,
            strength::REQUIRED,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SolverError::CoefficientMismatch {
                variables: 2,
                coefficients: 1
            }
        );
    }

    #[test]
    fn test_strength_range() {
        let err = Constraint::new(ConstraintKind::Equal, vec![id(0)], vec![1.0], 1.0, 1.5)
            .unwrap_err();
        assert_eq!(err, SolverError::InvalidStrength(1.5));
    }

    #[test]
    fn test_fixed_takes_one_variable() {
        let err = Constraint::new(
            ConstraintKind::Fixed,
            vec![id(0), id(1)],
            vec![1.0, 1.0],
            1.0,
            strength::REQUIRED,
        )
        .unwrap_err();
        assert_eq!(err, SolverError::FixedArity(2));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = Constraint::new(
            ConstraintKind::LessEqual,
            vec![id(0)],
            vec![f64::NAN],
            1.0,
            strength::WEAK,
        )
        .unwrap_err();
        assert_eq!(err, SolverError::NonFinite);
    }

    #[test]
    fn test_satisfaction_by_kind() {
        let values = |v: VariableId| if v.index == 0 { 3.0 } else { 4.0 };
        let make = |kind, constant| {
            Constraint::new(kind, vec![id(0), id(1)], vec![1.0, 2.0], constant, 1.0).unwrap()
        };

        assert_eq!(make(ConstraintKind::Equal, 11.0).evaluate(values), 11.0);
        assert!(make(ConstraintKind::Equal, 11.0).is_satisfied(values, 1e-6));
        assert!(!make(ConstraintKind::Equal, 11.1).is_satisfied(values, 1e-6));
        assert!(make(ConstraintKind::LessEqual, 11.0).is_satisfied(values, 1e-6));
        assert!(!make(ConstraintKind::LessEqual, 10.0).is_satisfied(values, 1e-6));
        assert!(make(ConstraintKind::GreaterEqual, 5.0).is_satisfied(values, 1e-6));
        assert!(make(ConstraintKind::Maximize, 1e9).is_satisfied(values, 1e-6));
    }

    #[test]
    fn test_variable_movement() {
        let v = Variable::new(id(0), "w".to_string(), 0.0, 0.0, 10.0);
        assert!(v.can_move(1.0));
        assert!(!v.can_move(-1.0));
        assert!(!v.can_move(0.0));
        assert_eq!(v.clamp(12.0), 10.0);
    }
}
