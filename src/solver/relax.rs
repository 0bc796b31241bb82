//! Priority-ordered relaxation solver

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::LayoutConfig;

use super::{cassowary, strength, Constraint, ConstraintKind, SolverError, Variable, VariableId};

static NEXT_SOLVER_ID: AtomicUsize = AtomicUsize::new(0);

fn next_solver_id() -> usize {
    NEXT_SOLVER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Owns variables and constraints and relaxes the variables toward a
/// feasible assignment.
///
/// The heuristic is best effort: [`solve`](Self::solve) reports whether every
/// constraint ended up satisfied and callers must check it.
#[derive(Debug)]
pub struct ConstraintSolver {
    id: usize,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    config: LayoutConfig,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintSolver {
    pub fn new() -> Self {
        Self::with_config(LayoutConfig::default())
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            id: next_solver_id(),
            variables: Vec::new(),
            constraints: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Create an unbounded variable
    pub fn create_variable(&mut self, name: impl Into<String>, value: f64) -> VariableId {
        let id = self.next_variable_id();
        self.variables.push(Variable::new(
            id,
            name.into(),
            value,
            f64::NEG_INFINITY,
            f64::INFINITY,
        ));
        id
    }

    /// Create a variable restricted to `[min, max]`; the starting value is
    /// clamped into range
    pub fn create_bounded_variable(
        &mut self,
        name: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<VariableId, SolverError> {
        let name = name.into();
        if min.is_nan() || max.is_nan() || min > max {
            return Err(SolverError::InvalidBounds { name, min, max });
        }
        if value.is_nan() {
            return Err(SolverError::NonFinite);
        }
        let id = self.next_variable_id();
        self.variables.push(Variable::new(id, name, value, min, max));
        Ok(id)
    }

    fn next_variable_id(&self) -> VariableId {
        VariableId {
            solver: self.id,
            index: self.variables.len(),
        }
    }

    fn check_owned(&self, id: VariableId) -> Result<(), SolverError> {
        if id.solver == self.id && id.index < self.variables.len() {
            Ok(())
        } else {
            Err(SolverError::UnknownVariable(id))
        }
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.check_owned(id).ok()?;
        self.variables.get(id.index)
    }

    pub fn value(&self, id: VariableId) -> Option<f64> {
        self.variable(id).map(Variable::value)
    }

    /// Look a variable up by the name it was created with
    pub fn find(&self, name: &str) -> Option<VariableId> {
        self.variables.iter().find(|v| v.name() == name).map(Variable::id)
    }

    /// Overwrite a variable's current value, clamped to its bounds
    pub fn set_value(&mut self, id: VariableId, value: f64) -> Result<(), SolverError> {
        self.check_owned(id)?;
        if value.is_nan() {
            return Err(SolverError::NonFinite);
        }
        let var = &mut self.variables[id.index];
        var.value = var.clamp(value);
        Ok(())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        for id in constraint.variables() {
            self.check_owned(*id)?;
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// `Σ coefficient·variable = constant`
    pub fn add_equal(
        &mut self,
        variables: &[VariableId],
        coefficients: &[f64],
        constant: f64,
        strength: f64,
    ) -> Result<(), SolverError> {
        self.add_linear(ConstraintKind::Equal, variables, coefficients, constant, strength)
    }

    /// `Σ coefficient·variable <= constant`
    pub fn add_less_equal(
        &mut self,
        variables: &[VariableId],
        coefficients: &[f64],
        constant: f64,
        strength: f64,
    ) -> Result<(), SolverError> {
        self.add_linear(ConstraintKind::LessEqual, variables, coefficients, constant, strength)
    }

    /// `Σ coefficient·variable >= constant`
    pub fn add_greater_equal(
        &mut self,
        variables: &[VariableId],
        coefficients: &[f64],
        constant: f64,
        strength: f64,
    ) -> Result<(), SolverError> {
        self.add_linear(ConstraintKind::GreaterEqual, variables, coefficients, constant, strength)
    }

    /// Pin `variable` to `value`
    pub fn add_fixed(&mut self, variable: VariableId, value: f64) -> Result<(), SolverError> {
        self.add_linear(
            ConstraintKind::Fixed,
            &[variable],
            &[1.0],
            value,
            strength::REQUIRED,
        )
    }

    fn add_linear(
        &mut self,
        kind: ConstraintKind,
        variables: &[VariableId],
        coefficients: &[f64],
        constant: f64,
        strength: f64,
    ) -> Result<(), SolverError> {
        let constraint = Constraint::new(
            kind,
            variables.to_vec(),
            coefficients.to_vec(),
            constant,
            strength,
        )?;
        self.add_constraint(constraint)
    }

    /// Whether every constraint currently holds
    pub fn is_satisfied(&self) -> bool {
        let epsilon = self.config.epsilon;
        self.constraints
            .iter()
            .all(|c| c.is_satisfied(|id| self.variables[id.index].value, epsilon))
    }

    /// Relax the variables toward satisfying every constraint.
    ///
    /// Constraints are visited strongest first. Returns `false` when some
    /// constraint still fails after `max_iterations` passes; the variables
    /// then hold the values of the last pass.
    pub fn solve(&mut self) -> bool {
        let mut order: Vec<usize> = (0..self.constraints.len()).collect();
        order.sort_by(|a, b| {
            self.constraints[*b]
                .strength()
                .total_cmp(&self.constraints[*a].strength())
        });

        let epsilon = self.config.epsilon;
        for pass in 0..self.config.max_iterations {
            let mut all_satisfied = true;
            for &index in &order {
                let constraint = &self.constraints[index];
                let variables = &mut self.variables;
                if constraint.is_satisfied(|id| variables[id.index].value, epsilon) {
                    continue;
                }
                all_satisfied = false;
                relax(variables, constraint);
            }
            if all_satisfied {
                tracing::trace!(passes = pass + 1, "relaxation converged");
                return true;
            }
        }

        let satisfied = self.is_satisfied();
        if !satisfied {
            tracing::debug!(
                iterations = self.config.max_iterations,
                constraints = self.constraints.len(),
                "relaxation did not converge"
            );
        }
        satisfied
    }

    /// Solve the same system with the exact Cassowary backend.
    ///
    /// Values are written back clamped to their bounds. Returns whether every
    /// constraint holds afterwards.
    pub fn solve_exact(&mut self) -> Result<bool, SolverError> {
        let values = cassowary::solve(&self.variables, &self.constraints)?;
        for (var, value) in self.variables.iter_mut().zip(values) {
            var.value = var.clamp(value);
        }
        Ok(self.is_satisfied())
    }

    /// Restore every variable to the value it was created with; constraints
    /// are kept
    pub fn reset(&mut self) {
        for var in &mut self.variables {
            var.value = var.initial();
        }
    }

    /// Remove every variable and constraint. Ids handed out before this call
    /// are no longer accepted.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.constraints.clear();
        self.id = next_solver_id();
    }

    pub(crate) fn snapshot(&self) -> Vec<f64> {
        self.variables.iter().map(Variable::value).collect()
    }

    pub(crate) fn restore(&mut self, values: &[f64]) {
        for (var, value) in self.variables.iter_mut().zip(values) {
            var.value = *value;
        }
    }
}

/// One adjustment step for a violated constraint
fn relax(variables: &mut [Variable], constraint: &Constraint) {
    let ids = constraint.variables();
    let coefficients = constraint.coefficients();

    if constraint.kind() == ConstraintKind::Fixed {
        let (Some(id), Some(&coefficient)) = (ids.first(), coefficients.first()) else {
            return;
        };
        if coefficient != 0.0 {
            let var = &mut variables[id.index];
            var.value = var.clamp(constraint.constant() / coefficient);
        }
        return;
    }
    if constraint.kind().is_objective() {
        return;
    }

    let current = constraint.evaluate(|id| variables[id.index].value);
    let difference = constraint.constant() - current;

    // Only variables that can move the sum toward the target take part
    let movable: Vec<(usize, f64)> = ids
        .iter()
        .zip(coefficients)
        .filter(|(id, coefficient)| {
            **coefficient != 0.0 && variables[id.index].can_move(difference / **coefficient)
        })
        .map(|(id, coefficient)| (id.index, *coefficient))
        .collect();
    if movable.is_empty() {
        return;
    }

    let share = difference / movable.len() as f64;
    for (index, coefficient) in movable {
        let var = &mut variables[index];
        var.value = var.clamp(var.value + share / coefficient);
    }
}
