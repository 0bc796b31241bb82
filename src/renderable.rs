//! Resolved visualizations
//!
//! A [`Renderable`] is the terminal output of the builder. It carries its
//! resolved properties and one painter per backend; both painters are
//! required when it is built.

use std::fmt;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::BuildError;
use crate::renderer::{dispatch, Canvas2d, NodeId, RenderError, RenderHandle, RenderTarget, SvgDocument};
use crate::value::{Props, Spec, Value};

type SvgPainter = dyn Fn(&Props, &mut SvgDocument, NodeId) -> Result<Option<NodeId>, RenderError>;
type CanvasPainter = dyn Fn(&Props, &mut dyn Canvas2d) -> Result<bool, RenderError>;

/// The spec a renderable was resolved from, with that type's resolved
/// properties
#[derive(Debug)]
struct Origin {
    spec: Spec,
    props: Props,
}

struct Node {
    renderable_type: String,
    props: Props,
    origin: Option<Origin>,
    svg: Rc<SvgPainter>,
    canvas: Rc<CanvasPainter>,
}

/// A resolved, renderable visualization. Clones share the same node.
#[derive(Clone)]
pub struct Renderable(Rc<Node>);

impl Renderable {
    pub fn builder(renderable_type: impl Into<String>) -> RenderableBuilder {
        RenderableBuilder {
            renderable_type: renderable_type.into(),
            props: Props::new(),
            svg: None,
            canvas: None,
        }
    }

    /// A renderable that draws nothing
    pub fn empty() -> Self {
        Self(Rc::new(Node {
            renderable_type: "empty".to_string(),
            props: Props::new(),
            origin: None,
            svg: Rc::new(paint_nothing),
            canvas: Rc::new(draw_nothing),
        }))
    }

    /// Whether two handles point at the same resolved node
    pub fn ptr_eq(a: &Renderable, b: &Renderable) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn renderable_type(&self) -> &str {
        &self.0.renderable_type
    }

    /// Properties the painters see
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Look a property up on the spec this was resolved from, defaults
    /// included, then on the painted properties
    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.0
            .origin
            .as_ref()
            .and_then(|origin| origin.props.get(name))
            .or_else(|| self.0.props.get(name))
    }

    /// The spec this renderable was resolved from
    pub fn spec(&self) -> Option<&Spec> {
        self.0.origin.as_ref().map(|origin| &origin.spec)
    }

    pub(crate) fn with_origin(&self, spec: Spec, props: Props) -> Renderable {
        Renderable(Rc::new(Node {
            renderable_type: self.0.renderable_type.clone(),
            props: self.0.props.clone(),
            origin: Some(Origin { spec, props }),
            svg: self.0.svg.clone(),
            canvas: self.0.canvas.clone(),
        }))
    }

    /// Paint into `parent`, returning the element that was added
    pub fn render_to_svg(
        &self,
        doc: &mut SvgDocument,
        parent: NodeId,
    ) -> Result<Option<NodeId>, RenderError> {
        if !doc.contains(parent) {
            return Err(RenderError::UnknownNode(parent));
        }
        (self.0.svg)(&self.0.props, doc, parent)
    }

    /// Paint onto a 2D context; `false` when nothing could be drawn
    pub fn render_to_canvas(&self, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
        (self.0.canvas)(&self.0.props, ctx)
    }

    /// Render into any target, see [`dispatch::render`]
    pub fn render(&self, target: RenderTarget<'_>) -> Result<RenderHandle, RenderError> {
        dispatch::render(self, target)
    }

    /// Lay `partial` over the original spec and resolve again
    pub fn update(&self, engine: &Engine, partial: &Props) -> Result<Renderable, BuildError> {
        let spec = match self.spec() {
            Some(spec) => spec.merged(partial),
            None => Spec::from_props(self.renderable_type(), self.props().clone()).merged(partial),
        };
        engine.resolve(spec)
    }
}

fn paint_nothing(
    _props: &Props,
    _doc: &mut SvgDocument,
    _parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    Ok(None)
}

fn draw_nothing(_props: &Props, _ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    Ok(true)
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderable")
            .field("renderable_type", &self.0.renderable_type)
            .field("props", &self.0.props)
            .field("origin", &self.0.origin)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Renderable`]
pub struct RenderableBuilder {
    renderable_type: String,
    props: Props,
    svg: Option<Rc<SvgPainter>>,
    canvas: Option<Rc<CanvasPainter>>,
}

impl RenderableBuilder {
    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn svg(
        mut self,
        painter: impl Fn(&Props, &mut SvgDocument, NodeId) -> Result<Option<NodeId>, RenderError>
            + 'static,
    ) -> Self {
        self.svg = Some(Rc::new(painter));
        self
    }

    pub fn canvas(
        mut self,
        painter: impl Fn(&Props, &mut dyn Canvas2d) -> Result<bool, RenderError> + 'static,
    ) -> Self {
        self.canvas = Some(Rc::new(painter));
        self
    }

    /// Fails when either painter is missing
    pub fn build(self) -> Result<Renderable, BuildError> {
        let svg = self.svg.ok_or_else(|| {
            BuildError::contract(self.renderable_type.clone(), "renderable has no SVG painter")
        })?;
        let canvas = self.canvas.ok_or_else(|| {
            BuildError::contract(
                self.renderable_type.clone(),
                "renderable has no canvas painter",
            )
        })?;
        Ok(Renderable(Rc::new(Node {
            renderable_type: self.renderable_type,
            props: self.props,
            origin: None,
            svg,
            canvas,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::CommandCanvas;

    fn dot() -> Renderable {
        Renderable::builder("dot")
            .prop("r", 2)
            .svg(|props, doc, parent| {
                let node = doc.append(parent, "circle");
                doc.set_attribute(node, "r", props["r"].as_f64().unwrap_or(0.0));
                Ok(Some(node))
            })
            .canvas(|_, ctx| {
                ctx.begin_path();
                Ok(true)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_painter_is_a_contract_error() {
        let err = Renderable::builder("half")
            .svg(|_, _, _| Ok(None))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::ImplementationContract { .. }));
        assert!(err.to_string().contains("canvas painter"));

        let err = Renderable::builder("half")
            .canvas(|_, _| Ok(true))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("SVG painter"));
    }

    #[test]
    fn test_clones_share_identity() {
        let a = dot();
        let b = a.clone();
        assert!(Renderable::ptr_eq(&a, &b));
        assert!(!Renderable::ptr_eq(&a, &dot()));
    }

    #[test]
    fn test_origin_props_take_precedence() {
        let mut outer = Props::new();
        outer.insert("r".to_string(), Value::from(9));
        outer.insert("label".to_string(), Value::from("big"));
        let r = dot().with_origin(Spec::new("bigDot"), outer);

        assert_eq!(r.get_property("r"), Some(&Value::Number(9.0)));
        assert_eq!(r.get_property("label"), Some(&Value::from("big")));
        assert_eq!(r.props()["r"], Value::Number(2.0));
        assert_eq!(r.spec().map(Spec::type_name), Some("bigDot"));
    }

    #[test]
    fn test_painters_run() {
        let r = dot();
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let node = r.render_to_svg(&mut doc, root).unwrap().unwrap();
        assert_eq!(doc.attribute(node, "r"), Some("2"));

        let mut canvas = CommandCanvas::new();
        assert!(r.render_to_canvas(&mut canvas).unwrap());
        assert_eq!(canvas.commands().len(), 1);
    }
}
