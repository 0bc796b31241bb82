//! Constraint solving, both standalone and through type layouts

use vizspec::solver::strength;
use vizspec::{
    ConstraintKind, ConstraintSolver, ConstraintSpec, ContainerMetrics, Engine, EngineConfig,
    LayoutConfig, PropertySchema, Renderable, Spec, TypeSpec, Value, Visualization,
};

const TOLERANCE: f64 = 1e-4;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn sum_with_one_fixed_term_converges() {
    let mut solver = ConstraintSolver::new();
    let x = solver
        .create_bounded_variable("x", 0.0, 0.0, f64::INFINITY)
        .unwrap();
    let y = solver
        .create_bounded_variable("y", 0.0, 0.0, f64::INFINITY)
        .unwrap();
    solver
        .add_equal(&[x, y], &[1.0, 1.0], 100.0, strength::REQUIRED)
        .unwrap();
    solver.add_fixed(x, 40.0).unwrap();

    assert!(solver.solve());
    assert_close(solver.value(x).unwrap(), 40.0);
    assert_close(solver.value(y).unwrap(), 60.0);
}

#[test]
fn unsatisfiable_system_reports_false() {
    let mut solver = ConstraintSolver::with_config(LayoutConfig::new().with_max_iterations(10));
    let x = solver.create_variable("x", 0.0);
    solver.add_fixed(x, 10.0).unwrap();
    solver
        .add_greater_equal(&[x], &[1.0], 20.0, strength::REQUIRED)
        .unwrap();

    assert!(!solver.solve());
    assert!(!solver.is_satisfied());
}

#[test]
fn clear_drops_everything() {
    let mut solver = ConstraintSolver::new();
    let x = solver.create_variable("x", 5.0);
    solver.add_fixed(x, 1.0).unwrap();
    solver.clear();

    assert!(solver.variables().is_empty());
    assert!(solver.constraints().is_empty());
    // Ids from before the clear belong to another solver now
    assert!(solver.add_fixed(x, 1.0).is_err());
}

fn define_panel(engine: &Engine) {
    engine
        .define(
            TypeSpec::new("panel")
                .property("sidebar", PropertySchema::optional().with_default(120.0))
                .layout(|props, _| {
                    let sidebar = props.get("sidebar").and_then(Value::as_f64).unwrap_or(0.0);
                    vec![
                        ConstraintSpec::fit_to_container(),
                        ConstraintSpec::bounded("sidebar", sidebar, 0.0, f64::INFINITY),
                        ConstraintSpec::bounded("main", 0.0, 0.0, f64::INFINITY),
                        ConstraintSpec::fixed("sidebar", sidebar),
                        ConstraintSpec::equal(
                            &[("sidebar", 1.0), ("main", 1.0), ("width", -1.0)],
                            0.0,
                        ),
                    ]
                })
                .implementation(|props, _, ctx| {
                    let layout = ctx.layout().cloned().unwrap_or_default();
                    Renderable::builder("panel")
                        .props(props.clone())
                        .prop("solvedWidth", layout.width())
                        .prop("solvedMain", layout.get("main").unwrap_or(f64::NAN))
                        .prop("converged", layout.converged())
                        .svg(|_, _, _| Ok(None))
                        .canvas(|_, _| Ok(true))
                        .build()
                        .map(Visualization::Renderable)
                }),
        )
        .unwrap();
}

fn number(r: &Renderable, key: &str) -> f64 {
    r.props().get(key).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

#[test]
fn layout_uses_enclosing_container() {
    let engine = Engine::new();
    define_panel(&engine);

    let r = engine
        .resolve_in(Spec::new("panel"), ContainerMetrics::new(500.0, 300.0))
        .unwrap();
    assert_eq!(r.props()["converged"], Value::Bool(true));
    assert_close(number(&r, "solvedWidth"), 500.0);
    assert_close(number(&r, "solvedMain"), 380.0);
}

#[test]
fn layout_falls_back_to_default_container() {
    let engine = Engine::with_config(EngineConfig::new().with_default_container(640.0, 480.0)).unwrap();
    define_panel(&engine);

    let r = engine.resolve(Spec::new("panel").with("sidebar", 40)).unwrap();
    assert_close(number(&r, "solvedWidth"), 640.0);
    assert_close(number(&r, "solvedMain"), 600.0);
}

/// A leaf that records the container it was resolved in as `w`/`h`
fn define_size_recorder(engine: &Engine) {
    engine
        .define(TypeSpec::new("sizeRecorder").implementation(|_, _, ctx| {
            let (w, h) = ctx
                .container()
                .map_or((f64::NAN, f64::NAN), |c| c.size_or((f64::NAN, f64::NAN)));
            Renderable::builder("sizeRecorder")
                .prop("w", w)
                .prop("h", h)
                .svg(|_, _, _| Ok(None))
                .canvas(|_, _| Ok(true))
                .build()
                .map(Visualization::Renderable)
        }))
        .unwrap();
}

fn define_wrapper(engine: &Engine, name: &str, constraints: Vec<ConstraintSpec>) {
    engine
        .define(
            TypeSpec::new(name)
                .layout(move |_, _| constraints.clone())
                .implementation(|_, _, ctx| {
                    ctx.resolve(Spec::new("sizeRecorder"))
                        .map(Visualization::Renderable)
                }),
        )
        .unwrap();
}

#[test]
fn children_see_the_solved_size_as_their_container() {
    let engine = Engine::new();
    define_size_recorder(&engine);
    define_wrapper(
        &engine,
        "box",
        vec![ConstraintSpec::fit_to(ContainerMetrics::new(90.0, 30.0))],
    );

    let r = engine.resolve(Spec::new("box")).unwrap();
    assert_close(number(&r, "w"), 90.0);
    assert_close(number(&r, "h"), 30.0);
}

#[test]
fn position_only_layout_passes_the_enclosing_container_through() {
    let engine = Engine::new();
    define_size_recorder(&engine);
    define_wrapper(&engine, "offset", vec![ConstraintSpec::fixed("x", 5.0)]);

    let r = engine
        .resolve_in(Spec::new("offset"), ContainerMetrics::new(500.0, 300.0))
        .unwrap();
    assert_close(number(&r, "w"), 500.0);
    assert_close(number(&r, "h"), 300.0);
}

#[test]
fn constraining_one_axis_keeps_the_other_from_the_container() {
    let engine = Engine::new();
    define_size_recorder(&engine);
    define_wrapper(&engine, "strip", vec![ConstraintSpec::fixed("height", 24.0)]);

    let r = engine
        .resolve_in(Spec::new("strip"), ContainerMetrics::new(500.0, 300.0))
        .unwrap();
    assert_close(number(&r, "w"), 500.0);
    assert_close(number(&r, "h"), 24.0);
}

#[test]
fn unconverged_layout_is_not_an_error() {
    let engine = Engine::with_config(
        EngineConfig::new().with_layout(
            LayoutConfig::new()
                .with_max_iterations(5)
                .with_exact_fallback(false),
        ),
    )
    .unwrap();
    engine
        .define(
            TypeSpec::new("impossible")
                .layout(|_, _| {
                    vec![
                        ConstraintSpec::fixed("x", 10.0),
                        ConstraintSpec::linear(
                            ConstraintKind::GreaterEqual,
                            &[("x", 1.0)],
                            20.0,
                            strength::REQUIRED,
                        ),
                    ]
                })
                .implementation(|props, _, ctx| {
                    let converged = ctx.layout().map_or(true, |l| l.converged());
                    Renderable::builder("impossible")
                        .props(props.clone())
                        .prop("converged", converged)
                        .svg(|_, _, _| Ok(None))
                        .canvas(|_, _| Ok(true))
                        .build()
                        .map(Visualization::Renderable)
                }),
        )
        .unwrap();

    let r = engine.resolve(Spec::new("impossible")).unwrap();
    assert_eq!(r.props()["converged"], Value::Bool(false));
}
