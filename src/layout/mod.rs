//! Layout constraints for sized types
//!
//! A type that needs size or position information supplies a constraint
//! generator. The generator returns abstract [`ConstraintSpec`]s which
//! [`solve_layout`] turns into a solver system over named variables. The
//! variables `x`, `y`, `width`, and `height` always exist; `width` and
//! `height` are never negative.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::solver::{Constraint, ConstraintKind, ConstraintSolver, SolverError, VariableId};

/// Size information about the element a visualization is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerMetrics {
    pub client_width: Option<f64>,
    pub client_height: Option<f64>,
}

impl ContainerMetrics {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            client_width: Some(width),
            client_height: Some(height),
        }
    }

    /// A container whose size is not known
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Width and height, each falling back to `fallback` when unknown
    pub fn size_or(&self, fallback: (f64, f64)) -> (f64, f64) {
        (
            self.client_width.unwrap_or(fallback.0),
            self.client_height.unwrap_or(fallback.1),
        )
    }
}

/// What a constraint generator sees besides the properties
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub type_name: &'a str,
    /// The enclosing container, when the caller supplied one
    pub container: Option<&'a ContainerMetrics>,
}

/// An abstract layout constraint
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSpec {
    /// Size `width`/`height` to a container. `None` uses the enclosing
    /// container, then the configured default.
    FitToContainer { container: Option<ContainerMetrics> },

    /// Declare a variable, or move an existing one to `value`
    Variable {
        name: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// Pin a variable to a value
    Fixed {
        variable: String,
        value: f64,
        strength: f64,
    },

    /// `Σ coefficient·variable (kind) constant`
    Linear {
        kind: ConstraintKind,
        terms: Vec<(String, f64)>,
        constant: f64,
        strength: f64,
    },
}

impl ConstraintSpec {
    pub fn fit_to_container() -> Self {
        Self::FitToContainer { container: None }
    }

    pub fn fit_to(container: ContainerMetrics) -> Self {
        Self::FitToContainer {
            container: Some(container),
        }
    }

    pub fn variable(name: impl Into<String>, value: f64) -> Self {
        Self::Variable {
            name: name.into(),
            value,
            min: None,
            max: None,
        }
    }

    pub fn bounded(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self::Variable {
            name: name.into(),
            value,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn fixed(variable: impl Into<String>, value: f64) -> Self {
        Self::Fixed {
            variable: variable.into(),
            value,
            strength: crate::solver::strength::REQUIRED,
        }
    }

    pub fn linear(
        kind: ConstraintKind,
        terms: &[(&str, f64)],
        constant: f64,
        strength: f64,
    ) -> Self {
        Self::Linear {
            kind,
            terms: terms
                .iter()
                .map(|(name, coefficient)| (name.to_string(), *coefficient))
                .collect(),
            constant,
            strength,
        }
    }

    /// Required `Σ coefficient·variable = constant`
    pub fn equal(terms: &[(&str, f64)], constant: f64) -> Self {
        Self::linear(
            ConstraintKind::Equal,
            terms,
            constant,
            crate::solver::strength::REQUIRED,
        )
    }
}

/// Solved layout variables
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutSolution {
    pub values: BTreeMap<String, f64>,
    /// Variables some constraint or declaration mentioned
    pub constrained: BTreeSet<String>,
    /// `false` when no backend satisfied every constraint
    pub converged: bool,
}

impl LayoutSolution {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn x(&self) -> f64 {
        self.get("x").unwrap_or(0.0)
    }

    pub fn y(&self) -> f64 {
        self.get("y").unwrap_or(0.0)
    }

    pub fn width(&self) -> f64 {
        self.get("width").unwrap_or(0.0)
    }

    pub fn height(&self) -> f64 {
        self.get("height").unwrap_or(0.0)
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Whether the generated constraints touched `name`. The four built-in
    /// variables always have a value, this tells a solved zero from an
    /// untouched one.
    pub fn is_constrained(&self, name: &str) -> bool {
        self.constrained.contains(name)
    }
}

fn variable_id(solver: &mut ConstraintSolver, name: &str) -> VariableId {
    match solver.find(name) {
        Some(id) => id,
        None => solver.create_variable(name, 0.0),
    }
}

/// Build and solve the constraint system for one type.
///
/// Construction errors are returned. A system that cannot be satisfied is
/// not an error: the solution carries `converged == false` and the values of
/// the last relaxation pass.
pub fn solve_layout(
    constraints: &[ConstraintSpec],
    container: Option<&ContainerMetrics>,
    config: &EngineConfig,
) -> Result<LayoutSolution, SolverError> {
    let mut solver = ConstraintSolver::with_config(config.layout.clone());
    solver.create_variable("x", 0.0);
    solver.create_variable("y", 0.0);
    let width = solver.create_bounded_variable("width", 0.0, 0.0, f64::INFINITY)?;
    let height = solver.create_bounded_variable("height", 0.0, 0.0, f64::INFINITY)?;
    let mut constrained = BTreeSet::new();

    for spec in constraints {
        match spec {
            ConstraintSpec::FitToContainer { container: own } => {
                let enclosing = container.copied().unwrap_or_default();
                let own = own.unwrap_or_default();
                let w = own
                    .client_width
                    .or(enclosing.client_width)
                    .unwrap_or(config.default_container.0);
                let h = own
                    .client_height
                    .or(enclosing.client_height)
                    .unwrap_or(config.default_container.1);
                solver.add_fixed(width, w)?;
                solver.add_fixed(height, h)?;
                constrained.extend(["width".to_string(), "height".to_string()]);
            }
            ConstraintSpec::Variable {
                name,
                value,
                min,
                max,
            } => {
                match solver.find(name) {
                    Some(id) => solver.set_value(id, *value)?,
                    None => {
                        solver.create_bounded_variable(
                            name.as_str(),
                            *value,
                            min.unwrap_or(f64::NEG_INFINITY),
                            max.unwrap_or(f64::INFINITY),
                        )?;
                    }
                }
                constrained.insert(name.clone());
            }
            ConstraintSpec::Fixed {
                variable,
                value,
                strength,
            } => {
                let id = variable_id(&mut solver, variable);
                let constraint =
                    Constraint::new(ConstraintKind::Fixed, vec![id], vec![1.0], *value, *strength)?;
                solver.add_constraint(constraint)?;
                constrained.insert(variable.clone());
            }
            ConstraintSpec::Linear {
                kind,
                terms,
                constant,
                strength,
            } => {
                let ids = terms
                    .iter()
                    .map(|(name, _)| variable_id(&mut solver, name))
                    .collect();
                let coefficients = terms.iter().map(|(_, c)| *c).collect();
                let constraint = Constraint::new(*kind, ids, coefficients, *constant, *strength)?;
                solver.add_constraint(constraint)?;
                constrained.extend(terms.iter().map(|(name, _)| name.clone()));
            }
        }
    }

    let mut converged = solver.solve();
    if !converged {
        converged = fall_back(&mut solver, config);
    }
    if !converged {
        tracing::warn!(
            constraints = solver.constraints().len(),
            "layout constraints could not all be satisfied, keeping best-effort values"
        );
    }

    let values = solver
        .variables()
        .iter()
        .map(|v| (v.name().to_string(), v.value()))
        .collect();
    Ok(LayoutSolution {
        values,
        constrained,
        converged,
    })
}

/// Retry with the exact backend. Its values are kept only when they satisfy
/// every constraint.
fn fall_back(solver: &mut ConstraintSolver, config: &EngineConfig) -> bool {
    if !config.layout.exact_fallback {
        return false;
    }
    let relaxed = solver.snapshot();
    match solver.solve_exact() {
        Ok(true) => {
            tracing::debug!("exact solver satisfied the layout");
            return true;
        }
        Ok(false) => tracing::debug!("exact solver did not satisfy the layout either"),
        Err(err) => tracing::debug!(%err, "exact solver rejected the layout"),
    }
    solver.restore(&relaxed);
    false
}
