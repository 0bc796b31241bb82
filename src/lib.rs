//! vizspec - declarative visualization construction
//!
//! Visualizations are described as specs: a `type` name plus properties.
//! Types are registered at runtime through the `define` type, may extend
//! each other, and resolve recursively until a [`Renderable`] comes out that
//! can paint itself into SVG or onto a 2D canvas.
//!
//! # Example
//!
//! ```rust
//! use vizspec::render_json;
//!
//! let svg = render_json(r#"{"type": "rect", "width": 10, "height": 5}"#).unwrap();
//! assert!(svg.contains("<rect"));
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod primitives;
pub mod renderable;
pub mod renderer;
pub mod solver;
pub mod types;
pub mod value;

pub use builder::BuildContext;
pub use config::{ConfigError, EngineConfig, LayoutConfig, RenderConfig};
pub use engine::{build_viz, global, init_global, reset_global, Engine};
pub use error::{BuildError, ErrorKind};
pub use layout::{solve_layout, ConstraintSpec, ContainerMetrics, LayoutContext, LayoutSolution};
pub use renderable::{Renderable, RenderableBuilder};
pub use renderer::{
    render, Canvas2d, CommandCanvas, HostElement, RenderError, RenderHandle, RenderTarget,
    SvgConfig, SvgDocument,
};
pub use solver::{ConstraintKind, ConstraintSolver, SolverError};
pub use types::{PropertySchema, PropertyType, TypeDefinition, TypeRegistry, TypeSpec};
pub use value::{
    Computed, ConstraintGenerator, EvalContext, Function, Implementation, Predicate, Props, Spec,
    SpecValidator, Value, Visualization,
};

use thiserror::Error;

/// Errors that can occur during the document pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document is not valid JSON
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// A spec could not be resolved
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// A renderable could not be painted
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Resolve every spec of a JSON document.
///
/// The document is either one spec or an array of specs resolved in order,
/// so `define` entries earlier in the array can be used by later ones.
/// Resolution happens inside the configured default container.
pub fn resolve_document(
    engine: &Engine,
    document: serde_json::Value,
) -> Result<Vec<Renderable>, BuildError> {
    let (width, height) = engine.config().default_container;
    let container = ContainerMetrics::new(width, height);
    let entries = match document {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };
    entries
        .into_iter()
        .map(|entry| {
            let viz = Visualization::from_value(&Value::from(entry))?;
            engine.resolve_in(viz, container)
        })
        .collect()
}

/// Render a JSON document to SVG with default configuration
pub fn render_json(source: &str) -> Result<String, PipelineError> {
    render_json_with_config(source, &RenderConfig::default())
}

/// Render a JSON document to SVG.
///
/// The primitives are installed into a fresh engine, every spec is resolved,
/// and the renderables are painted in order into one `<svg>` sized to the
/// default container.
///
/// # Example
///
/// ```rust
/// use vizspec::{render_json_with_config, EngineConfig, RenderConfig, SvgConfig};
///
/// let config = RenderConfig::new()
///     .with_engine(EngineConfig::new().with_default_container(100.0, 50.0))
///     .with_svg(SvgConfig::compact());
///
/// let svg = render_json_with_config(r#"{"type": "frame"}"#, &config).unwrap();
/// assert!(svg.starts_with("<svg"));
/// assert!(svg.contains(r#"viewBox="0 0 100 50""#));
/// ```
pub fn render_json_with_config(source: &str, config: &RenderConfig) -> Result<String, PipelineError> {
    render_document(serde_json::from_str(source)?, config)
}

/// Render an already-parsed document to SVG, see [`render_json_with_config`]
pub fn render_document(
    document: serde_json::Value,
    config: &RenderConfig,
) -> Result<String, PipelineError> {
    let engine = Engine::with_config(config.engine.clone())?;
    primitives::install(&engine)?;
    let renderables = resolve_document(&engine, document)?;

    let (width, height) = config.engine.default_container;
    let mut doc = SvgDocument::new();
    let root = doc.root();
    doc.set_attribute(root, "width", width);
    doc.set_attribute(root, "height", height);
    doc.set_attribute(root, "viewBox", format!("0 0 {width} {height}"));
    for renderable in &renderables {
        render(renderable, RenderTarget::Svg(&mut doc, root))?;
    }
    Ok(doc.to_svg_string(&config.svg))
}

/// Render a JSON document onto a recording canvas and return the calls as
/// JSON
pub fn render_json_to_canvas(source: &str, config: &RenderConfig) -> Result<String, PipelineError> {
    render_document_to_canvas(serde_json::from_str(source)?, config)
}

pub fn render_document_to_canvas(
    document: serde_json::Value,
    config: &RenderConfig,
) -> Result<String, PipelineError> {
    let engine = Engine::with_config(config.engine.clone())?;
    primitives::install(&engine)?;
    let renderables = resolve_document(&engine, document)?;

    let (width, height) = config.engine.default_container;
    let mut canvas = CommandCanvas::with_size(width, height);
    for renderable in &renderables {
        render(renderable, RenderTarget::Canvas(&mut canvas))?;
    }
    Ok(canvas.to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact() -> RenderConfig {
        RenderConfig::new().with_svg(SvgConfig::compact())
    }

    #[test]
    fn test_render_single_spec() {
        let svg = render_json(r#"{"type": "circle", "r": 4}"#).unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"<circle cx="0" cy="0" r="4" fill="black" class="viz-circle"/>"#));
    }

    #[test]
    fn test_define_by_extension_in_document() {
        let svg = render_json_with_config(
            r#"[
                {"type": "define", "name": "redBox", "extend": "rect",
                 "properties": {"fill": {"default": "red"}, "width": {"default": 20}, "height": {"default": 10}}},
                {"type": "redBox"}
            ]"#,
            &compact(),
        )
        .unwrap();
        assert!(svg.contains(r#"<rect x="0" y="0" width="20" height="10" fill="red" class="rect"/>"#));
    }

    #[test]
    fn test_invalid_json() {
        let err = render_json("{").unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }

    #[test]
    fn test_unknown_type() {
        let err = render_json(r#"{"type": "nope"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "build error: Unknown visualization type: nope"
        );
    }

    #[test]
    fn test_untyped_spec() {
        let err = render_json(r#"{"width": 3}"#).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Build(ref e) if e.kind() == ErrorKind::SpecShape
        ));
    }

    #[test]
    fn test_canvas_output() {
        let json = render_json_to_canvas(
            r#"{"type": "rect", "width": 2, "height": 3, "fill": "blue"}"#,
            &RenderConfig::default(),
        )
        .unwrap();
        let commands: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            commands,
            serde_json::json!([
                { "op": "setFillStyle", "style": "blue" },
                { "op": "fillRect", "x": 0.0, "y": 0.0, "width": 2.0, "height": 3.0 }
            ])
        );
    }
}
