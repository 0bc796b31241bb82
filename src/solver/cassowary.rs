//! Exact backend on top of the kasuari Cassowary solver
//!
//! Bounds become required inequalities, current values become weak edit
//! suggestions, and objectives become weak equalities pulling toward their
//! constant.

use kasuari::{
    AddConstraintError, Expression, Solver as KasuariSolver, Strength,
    Variable as KasuariVariable, WeightedRelation::*,
};

use super::{Constraint, ConstraintKind, SolverError, Variable};

fn to_strength(strength: f64) -> Strength {
    if strength >= 1.0 {
        Strength::REQUIRED
    } else if strength >= 0.66 {
        Strength::STRONG
    } else if strength >= 0.33 {
        Strength::MEDIUM
    } else {
        Strength::WEAK
    }
}

fn convert_error(e: AddConstraintError, desc: &str) -> SolverError {
    match e {
        AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable(format!(
            "cannot satisfy {}: conflicts with existing constraints",
            desc
        )),
        AddConstraintError::DuplicateConstraint => {
            SolverError::Internal(format!("duplicate constraint: {}", desc))
        }
        AddConstraintError::InternalSolverError(msg) => {
            SolverError::Internal(format!("{} while adding {}", msg, desc))
        }
    }
}

fn describe(constraint: &Constraint, variables: &[Variable]) -> String {
    let terms = constraint
        .variables()
        .iter()
        .zip(constraint.coefficients())
        .map(|(id, c)| format!("{}*{}", c, variables[id.index].name()))
        .collect::<Vec<_>>()
        .join(" + ");
    let relation = match constraint.kind() {
        ConstraintKind::Equal | ConstraintKind::Fixed => "=",
        ConstraintKind::LessEqual => "<=",
        ConstraintKind::GreaterEqual => ">=",
        ConstraintKind::Minimize => "~min",
        ConstraintKind::Maximize => "~max",
    };
    format!("{} {} {}", terms, relation, constraint.constant())
}

/// Solve the system and return one value per variable, in creation order
pub(super) fn solve(
    variables: &[Variable],
    constraints: &[Constraint],
) -> Result<Vec<f64>, SolverError> {
    let mut solver = KasuariSolver::new();
    let kvars: Vec<KasuariVariable> = variables.iter().map(|_| KasuariVariable::new()).collect();

    for (var, kvar) in variables.iter().zip(&kvars) {
        let expr: Expression = (*kvar).into();
        if var.min().is_finite() {
            solver
                .add_constraint(expr.clone() | GE(Strength::REQUIRED) | var.min())
                .map_err(|e| convert_error(e, &format!("{} >= {}", var.name(), var.min())))?;
        }
        if var.max().is_finite() {
            solver
                .add_constraint(expr | LE(Strength::REQUIRED) | var.max())
                .map_err(|e| convert_error(e, &format!("{} <= {}", var.name(), var.max())))?;
        }
    }

    for constraint in constraints {
        let expr = constraint
            .variables()
            .iter()
            .zip(constraint.coefficients())
            .fold(Expression::from_constant(0.0), |acc, (id, coefficient)| {
                acc + *coefficient * Expression::from(kvars[id.index])
            });
        let constant = constraint.constant();
        let strength = to_strength(constraint.strength());
        let kc = match constraint.kind() {
            ConstraintKind::Equal | ConstraintKind::Fixed => expr | EQ(strength) | constant,
            ConstraintKind::LessEqual => expr | LE(strength) | constant,
            ConstraintKind::GreaterEqual => expr | GE(strength) | constant,
            ConstraintKind::Minimize | ConstraintKind::Maximize => {
                expr | EQ(Strength::WEAK) | constant
            }
        };
        solver
            .add_constraint(kc)
            .map_err(|e| convert_error(e, &describe(constraint, variables)))?;
    }

    // Anchor every variable at its current value so free variables stay put
    for (var, kvar) in variables.iter().zip(&kvars) {
        if !var.value().is_finite() {
            continue;
        }
        solver
            .add_edit_variable(*kvar, Strength::WEAK)
            .map_err(|e| SolverError::Internal(format!("Failed to add edit variable: {}", e)))?;
        solver
            .suggest_value(*kvar, var.value())
            .map_err(|e| SolverError::Internal(format!("Failed to suggest value: {}", e)))?;
    }

    // kasuari only reports variables whose value moved away from zero
    let mut values = vec![0.0; variables.len()];
    for (kvar, value) in solver.fetch_changes() {
        if let Some(index) = kvars.iter().position(|k| k == kvar) {
            values[index] = *value;
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::VariableId;

    fn var(index: usize, name: &str, value: f64, min: f64, max: f64) -> Variable {
        Variable::new(VariableId { solver: 0, index }, name.to_string(), value, min, max)
    }

    #[test]
    fn test_bounds_hold() {
        let variables = vec![var(0, "w", 0.0, 0.0, 30.0)];
        let constraints = vec![Constraint::new(
            ConstraintKind::Equal,
            vec![variables[0].id()],
            vec![1.0],
            50.0,
            0.5,
        )
        .unwrap()];
        let values = solve(&variables, &constraints).unwrap();
        assert!((values[0] - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_conflicting_required_constraints() {
        let variables = vec![var(0, "x", 0.0, f64::NEG_INFINITY, f64::INFINITY)];
        let id = variables[0].id();
        let constraints = vec![
            Constraint::new(ConstraintKind::Fixed, vec![id], vec![1.0], 10.0, 1.0).unwrap(),
            Constraint::new(ConstraintKind::Fixed, vec![id], vec![1.0], 20.0, 1.0).unwrap(),
        ];
        let err = solve(&variables, &constraints).unwrap_err();
        assert!(matches!(err, SolverError::Unsatisfiable(_)));
    }
}
