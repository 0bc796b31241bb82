//! Spec resolution - turns specs into renderables
//!
//! For each spec the builder:
//! 1. Passes already-resolved renderables through untouched
//! 2. Looks the type up in the registry
//! 3. Fills in defaults for absent properties and evaluates computed ones
//! 4. Runs the validation chain
//! 5. Solves the type's layout constraints, if it declares any
//! 6. Calls the implementation and keeps resolving until a renderable comes out
//!
//! Step 6 tracks the chain of types it has walked through; seeing a type twice
//! is an infinite loop and fails immediately.

mod validate;

use crate::engine::Engine;
use crate::error::BuildError;
use crate::layout::{solve_layout, ContainerMetrics, LayoutContext, LayoutSolution};
use crate::renderable::Renderable;
use crate::types::TypeDefinition;
use crate::value::{EvalContext, Props, Spec, Value, Visualization};

/// What an implementation sees besides its properties
pub struct BuildContext<'a> {
    engine: &'a Engine,
    type_name: &'a str,
    depth: usize,
    container: Option<ContainerMetrics>,
    layout: Option<LayoutSolution>,
}

impl<'a> BuildContext<'a> {
    /// The engine doing the resolving; implementations may register types
    /// through it
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// Name of the type whose implementation is running
    pub fn type_name(&self) -> &str {
        self.type_name
    }

    /// Nesting depth of this resolution
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Metrics of the enclosing container, when known
    pub fn container(&self) -> Option<&ContainerMetrics> {
        self.container.as_ref()
    }

    /// Solved layout variables, for types that declare constraints
    pub fn layout(&self) -> Option<&LayoutSolution> {
        self.layout.as_ref()
    }

    /// Resolve a nested child. Children of a sized type see its solved
    /// width and height as their container, on the axes its layout
    /// constrained.
    pub fn resolve(&self, viz: impl Into<Visualization>) -> Result<Renderable, BuildError> {
        resolve(self.engine, viz.into(), &self.child_scope(self.child_container()))
    }

    /// Resolve a nested child inside an explicit container
    pub fn resolve_in(
        &self,
        viz: impl Into<Visualization>,
        container: ContainerMetrics,
    ) -> Result<Renderable, BuildError> {
        resolve(self.engine, viz.into(), &self.child_scope(Some(container)))
    }

    /// Resolve a nested child given as a dynamic value
    pub fn resolve_value(&self, value: &Value) -> Result<Renderable, BuildError> {
        resolve_value(self.engine, value, &self.child_scope(self.child_container()))
    }

    /// Resolve a `children`-style property: absent or null yields nothing,
    /// an array resolves every entry, anything else is a single child
    pub fn resolve_children(&self, value: Option<&Value>) -> Result<Vec<Renderable>, BuildError> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| self.resolve_value(v)).collect(),
            Some(other) => self.resolve_value(other).map(|child| vec![child]),
        }
    }

    fn child_scope(&self, container: Option<ContainerMetrics>) -> Scope {
        Scope {
            depth: self.depth + 1,
            container,
        }
    }

    /// The solved size where the layout constrained it, axis by axis,
    /// otherwise the enclosing container
    fn child_container(&self) -> Option<ContainerMetrics> {
        let Some(layout) = &self.layout else {
            return self.container;
        };
        if !layout.is_constrained("width") && !layout.is_constrained("height") {
            return self.container;
        }
        let enclosing = self.container.unwrap_or_default();
        let axis = |name: &str, fallback: Option<f64>| {
            if layout.is_constrained(name) {
                layout.get(name)
            } else {
                fallback
            }
        };
        Some(ContainerMetrics {
            client_width: axis("width", enclosing.client_width),
            client_height: axis("height", enclosing.client_height),
        })
    }
}

/// Position of a resolution in the overall tree
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Scope {
    pub depth: usize,
    pub container: Option<ContainerMetrics>,
}

impl Scope {
    pub fn root(container: Option<ContainerMetrics>) -> Self {
        Self {
            depth: 0,
            container,
        }
    }
}

/// Resolve a dynamic value: null, non-objects and untyped objects are
/// rejected
pub(crate) fn resolve_value(
    engine: &Engine,
    value: &Value,
    scope: &Scope,
) -> Result<Renderable, BuildError> {
    let viz = Visualization::from_value(value)?;
    resolve(engine, viz, scope)
}

#[tracing::instrument(level = "debug", skip_all, fields(type_name = %viz.type_name(), depth = scope.depth))]
pub(crate) fn resolve(
    engine: &Engine,
    viz: Visualization,
    scope: &Scope,
) -> Result<Renderable, BuildError> {
    let spec = match viz {
        Visualization::Renderable(renderable) => return Ok(renderable),
        Visualization::Spec(spec) => spec,
    };
    if spec.type_name().trim().is_empty() {
        return Err(BuildError::spec_shape("spec is missing a 'type' string"));
    }

    let max_depth = engine.config().max_depth;
    let mut chain: Vec<String> = Vec::new();
    let mut outer_props: Option<Props> = None;
    let mut current = spec.clone();

    loop {
        let type_name = current.type_name().to_string();
        if chain.contains(&type_name) {
            chain.push(type_name);
            return Err(BuildError::InfiniteLoop { chain });
        }
        chain.push(type_name.clone());
        if scope.depth + chain.len() > max_depth {
            return Err(BuildError::DepthExceeded {
                type_name,
                limit: max_depth,
            });
        }

        let (props, output) = expand(engine, &current, scope)?;
        if outer_props.is_none() {
            outer_props = Some(props);
        }

        match output {
            Visualization::Renderable(renderable) => {
                return Ok(renderable.with_origin(spec, outer_props.unwrap_or_default()));
            }
            Visualization::Spec(next) => {
                if next.type_name().trim().is_empty() {
                    return Err(BuildError::contract(
                        type_name,
                        "returned a spec without a 'type'",
                    ));
                }
                tracing::trace!(from = %type_name, to = %next.type_name(), "resolving returned spec");
                current = next;
            }
        }
    }
}

/// Run one type's pipeline: defaults, computed values, validation, layout,
/// implementation
fn expand(
    engine: &Engine,
    spec: &Spec,
    scope: &Scope,
) -> Result<(Props, Visualization), BuildError> {
    let def = engine.lookup(spec.type_name())?;

    let mut props = spec.props().clone();
    apply_defaults(&def, &mut props);
    evaluate_computed(def.name(), &mut props)?;
    check_data(def.name(), &props)?;
    validate::validate(&def, &props)?;

    let layout = match def.layout() {
        Some(generator) => {
            let layout_ctx = LayoutContext {
                type_name: def.name(),
                container: scope.container.as_ref(),
            };
            let constraints = generator.generate(&props, &layout_ctx);
            let solution = solve_layout(&constraints, scope.container.as_ref(), engine.config())
                .map_err(|source| BuildError::Layout {
                    type_name: def.name().to_string(),
                    source,
                })?;
            Some(solution)
        }
        None => None,
    };

    let ctx = BuildContext {
        engine,
        type_name: def.name(),
        depth: scope.depth,
        container: scope.container,
        layout,
    };
    let output = def.implementation().call(&props, None, &ctx)?;
    Ok((props, output))
}

/// Insert defaults for absent properties; supplied values are never replaced
fn apply_defaults(def: &TypeDefinition, props: &mut Props) {
    for (name, default) in def.optional_props() {
        if !props.contains_key(name) {
            props.insert(name.clone(), default.clone());
        }
    }
}

fn evaluate_computed(type_name: &str, props: &mut Props) -> Result<(), BuildError> {
    if !props.values().any(|v| matches!(v, Value::Computed(_))) {
        return Ok(());
    }

    let snapshot = props.clone();
    for (property, value) in props.iter_mut() {
        let Value::Computed(computed) = value else {
            continue;
        };
        let ctx = EvalContext {
            type_name,
            property,
            props: &snapshot,
        };
        let evaluated = computed.evaluate(&ctx)?;
        if matches!(evaluated, Value::Computed(_)) {
            return Err(BuildError::spec_validation(
                type_name,
                format!("computed property '{}' produced another computed value", property),
            ));
        }
        *value = evaluated;
    }
    Ok(())
}

/// `data` reaches the core already materialized
fn check_data(type_name: &str, props: &Props) -> Result<(), BuildError> {
    match props.get("data") {
        None | Some(Value::Null) | Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(BuildError::spec_shape(format!(
            "'data' of '{}' must be an array, found {}",
            type_name,
            other.type_label()
        ))),
    }
}
