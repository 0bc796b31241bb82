//! Built-in visual types
//!
//! These are ordinary types registered through `define`; user types can
//! extend or return any of them.
//!
//! | type     | required                 | optional (default)                                   |
//! |----------|--------------------------|------------------------------------------------------|
//! | `rect`   | `width`, `height`        | `x` (0), `y` (0), `fill` ("black"), `stroke`          |
//! | `circle` | `r`                      | `cx` (0), `cy` (0), `fill` ("black"), `stroke`        |
//! | `line`   | `x1`, `y1`, `x2`, `y2`   | `stroke` ("black"), `strokeWidth` (1)                |
//! | `text`   | `text`                   | `x` (0), `y` (0), `fontSize` (12), `fill` ("black")   |
//! | `group`  |                          | `x` (0), `y` (0), `children`                          |
//! | `frame`  |                          | `padding` (0), `background`, `children`               |
//!
//! `frame` sizes itself to its container and lays its children out in the
//! area left after padding.

use std::f64::consts::TAU;

use crate::builder::BuildContext;
use crate::engine::Engine;
use crate::error::BuildError;
use crate::layout::{ContainerMetrics, ConstraintSpec};
use crate::renderable::Renderable;
use crate::renderer::{Canvas2d, NodeId, RenderError, SvgDocument};
use crate::types::{PropertySchema, PropertyType, TypeSpec};
use crate::value::{Props, Spec, Value, Visualization};

const DEFAULT_FILL: &str = "black";

/// Register every built-in type
pub fn install(engine: &Engine) -> Result<(), BuildError> {
    for spec in [rect(), circle(), line(), text(), group(), frame()] {
        engine.define(spec)?;
    }
    tracing::debug!("installed primitive types");
    Ok(())
}

fn number(default: f64) -> PropertySchema {
    PropertySchema::optional()
        .with_default(default)
        .of_type(PropertyType::Number)
}

fn required_number() -> PropertySchema {
    PropertySchema::required().of_type(PropertyType::Number)
}

fn non_negative() -> PropertySchema {
    required_number().validated_by(|v| v.as_f64().map_or(false, |n| n >= 0.0))
}

fn color(default: Option<&str>) -> PropertySchema {
    let schema = PropertySchema::optional().of_type(PropertyType::String);
    match default {
        Some(default) => schema.with_default(default),
        None => schema,
    }
}

fn num(props: &Props, key: &str) -> f64 {
    props.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn string<'a>(props: &'a Props, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

fn children(props: &Props) -> impl Iterator<Item = &Renderable> {
    props
        .get("children")
        .and_then(Value::as_array)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_renderable)
}

/// Wrap painters around the resolved properties of a primitive
fn leaf(
    type_name: &'static str,
    props: &Props,
    svg: fn(&Props, &mut SvgDocument, NodeId) -> Result<Option<NodeId>, RenderError>,
    canvas: fn(&Props, &mut dyn Canvas2d) -> Result<bool, RenderError>,
) -> Result<Visualization, BuildError> {
    Renderable::builder(type_name)
        .props(props.clone())
        .svg(svg)
        .canvas(canvas)
        .build()
        .map(Visualization::Renderable)
}

fn rect() -> TypeSpec {
    TypeSpec::new("rect")
        .property("x", number(0.0))
        .property("y", number(0.0))
        .property("width", non_negative())
        .property("height", non_negative())
        .property("fill", color(Some(DEFAULT_FILL)))
        .property("stroke", color(None))
        .implementation(|props, _, _| leaf("rect", props, rect_svg, rect_canvas))
}

fn rect_svg(
    props: &Props,
    doc: &mut SvgDocument,
    parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let node = doc.append(parent, "rect");
    doc.add_class(node, "rect");
    for key in ["x", "y", "width", "height"] {
        doc.set_attribute(node, key, num(props, key));
    }
    if let Some(fill) = string(props, "fill") {
        doc.set_attribute(node, "fill", fill);
    }
    if let Some(stroke) = string(props, "stroke") {
        doc.set_attribute(node, "stroke", stroke);
    }
    Ok(Some(node))
}

fn rect_canvas(props: &Props, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    let (x, y) = (num(props, "x"), num(props, "y"));
    let (w, h) = (num(props, "width"), num(props, "height"));
    ctx.set_fill_style(string(props, "fill").unwrap_or(DEFAULT_FILL));
    ctx.fill_rect(x, y, w, h);
    if let Some(stroke) = string(props, "stroke") {
        ctx.set_stroke_style(stroke);
        ctx.stroke_rect(x, y, w, h);
    }
    Ok(true)
}

fn circle() -> TypeSpec {
    TypeSpec::new("circle")
        .property("cx", number(0.0))
        .property("cy", number(0.0))
        .property("r", non_negative())
        .property("fill", color(Some(DEFAULT_FILL)))
        .property("stroke", color(None))
        .implementation(|props, _, _| leaf("circle", props, circle_svg, circle_canvas))
}

fn circle_svg(
    props: &Props,
    doc: &mut SvgDocument,
    parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let node = doc.append(parent, "circle");
    doc.add_class(node, "circle");
    for key in ["cx", "cy", "r"] {
        doc.set_attribute(node, key, num(props, key));
    }
    if let Some(fill) = string(props, "fill") {
        doc.set_attribute(node, "fill", fill);
    }
    if let Some(stroke) = string(props, "stroke") {
        doc.set_attribute(node, "stroke", stroke);
    }
    Ok(Some(node))
}

fn circle_canvas(props: &Props, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    ctx.begin_path();
    ctx.arc(num(props, "cx"), num(props, "cy"), num(props, "r"), 0.0, TAU);
    ctx.set_fill_style(string(props, "fill").unwrap_or(DEFAULT_FILL));
    ctx.fill();
    if let Some(stroke) = string(props, "stroke") {
        ctx.set_stroke_style(stroke);
        ctx.stroke();
    }
    Ok(true)
}

fn line() -> TypeSpec {
    TypeSpec::new("line")
        .property("x1", required_number())
        .property("y1", required_number())
        .property("x2", required_number())
        .property("y2", required_number())
        .property("stroke", color(Some(DEFAULT_FILL)))
        .property("strokeWidth", number(1.0))
        .implementation(|props, _, _| leaf("line", props, line_svg, line_canvas))
}

fn line_svg(
    props: &Props,
    doc: &mut SvgDocument,
    parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let node = doc.append(parent, "line");
    doc.add_class(node, "line");
    for key in ["x1", "y1", "x2", "y2"] {
        doc.set_attribute(node, key, num(props, key));
    }
    doc.set_attribute(node, "stroke", string(props, "stroke").unwrap_or(DEFAULT_FILL));
    doc.set_attribute(node, "stroke-width", num(props, "strokeWidth"));
    Ok(Some(node))
}

fn line_canvas(props: &Props, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    ctx.begin_path();
    ctx.move_to(num(props, "x1"), num(props, "y1"));
    ctx.line_to(num(props, "x2"), num(props, "y2"));
    ctx.set_stroke_style(string(props, "stroke").unwrap_or(DEFAULT_FILL));
    ctx.set_line_width(num(props, "strokeWidth"));
    ctx.stroke();
    Ok(true)
}

fn text() -> TypeSpec {
    TypeSpec::new("text")
        .property("text", PropertySchema::required().of_type(PropertyType::String))
        .property("x", number(0.0))
        .property("y", number(0.0))
        .property("fontSize", number(12.0))
        .property("fill", color(Some(DEFAULT_FILL)))
        .implementation(|props, _, _| leaf("text", props, text_svg, text_canvas))
}

fn text_svg(
    props: &Props,
    doc: &mut SvgDocument,
    parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let node = doc.append(parent, "text");
    doc.add_class(node, "text");
    doc.set_attribute(node, "x", num(props, "x"));
    doc.set_attribute(node, "y", num(props, "y"));
    doc.set_attribute(node, "font-size", num(props, "fontSize"));
    if let Some(fill) = string(props, "fill") {
        doc.set_attribute(node, "fill", fill);
    }
    doc.set_text(node, string(props, "text").unwrap_or_default());
    Ok(Some(node))
}

fn text_canvas(props: &Props, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    ctx.set_font(&format!("{}px sans-serif", num(props, "fontSize")));
    ctx.set_fill_style(string(props, "fill").unwrap_or(DEFAULT_FILL));
    ctx.fill_text(
        string(props, "text").unwrap_or_default(),
        num(props, "x"),
        num(props, "y"),
    );
    Ok(true)
}

fn group() -> TypeSpec {
    TypeSpec::new("group")
        .property("x", number(0.0))
        .property("y", number(0.0))
        .property("children", PropertySchema::optional())
        .implementation(group_implementation)
}

fn group_implementation(
    props: &Props,
    _base: Option<Visualization>,
    ctx: &BuildContext<'_>,
) -> Result<Visualization, BuildError> {
    let resolved: Vec<Value> = ctx
        .resolve_children(props.get("children"))?
        .into_iter()
        .map(Value::from)
        .collect();
    let mut props = props.clone();
    props.insert("children".to_string(), Value::Array(resolved));
    leaf("group", &props, group_svg, group_canvas)
}

fn group_svg(
    props: &Props,
    doc: &mut SvgDocument,
    parent: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let node = doc.append(parent, "g");
    doc.add_class(node, "group");
    let (x, y) = (num(props, "x"), num(props, "y"));
    if x != 0.0 || y != 0.0 {
        doc.set_attribute(node, "transform", format!("translate({x},{y})"));
    }
    for child in children(props) {
        child.render_to_svg(doc, node)?;
    }
    Ok(Some(node))
}

fn group_canvas(props: &Props, ctx: &mut dyn Canvas2d) -> Result<bool, RenderError> {
    ctx.save();
    ctx.translate(num(props, "x"), num(props, "y"));
    let mut drew = true;
    for child in children(props) {
        drew &= child.render_to_canvas(ctx)?;
    }
    ctx.restore();
    Ok(drew)
}

fn frame() -> TypeSpec {
    TypeSpec::new("frame")
        .property(
            "padding",
            number(0.0).validated_by(|v| v.as_f64().map_or(false, |n| n >= 0.0)),
        )
        .property("background", color(None))
        .property("children", PropertySchema::optional())
        .layout(|_, _| vec![ConstraintSpec::fit_to_container()])
        .implementation(frame_implementation)
}

/// Resolve children inside the padded area and hand back a group
fn frame_implementation(
    props: &Props,
    _base: Option<Visualization>,
    ctx: &BuildContext<'_>,
) -> Result<Visualization, BuildError> {
    let layout = ctx
        .layout()
        .ok_or_else(|| BuildError::implementation("frame", "layout was not solved"))?;
    let padding = num(props, "padding");
    let inner = ContainerMetrics::new(
        (layout.width() - 2.0 * padding).max(0.0),
        (layout.height() - 2.0 * padding).max(0.0),
    );

    let place = |item: &Value| -> Result<Value, BuildError> {
        let child = ctx.resolve_in(Visualization::from_value(item)?, inner)?;
        Ok(Value::from(child))
    };
    let content: Vec<Value> = match props.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(place).collect::<Result<_, _>>()?,
        Some(item) => vec![place(item)?],
    };

    let mut parts = Vec::new();
    if let Some(background) = string(props, "background") {
        parts.push(Value::from(
            Spec::new("rect")
                .with("width", layout.width())
                .with("height", layout.height())
                .with("fill", background),
        ));
    }
    parts.push(Value::from(
        Spec::new("group")
            .with("x", padding)
            .with("y", padding)
            .with("children", content),
    ));
    Ok(Visualization::Spec(Spec::new("group").with("children", parts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{CanvasCommand, CommandCanvas, SvgConfig};
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        Engine::with_primitives().unwrap()
    }

    fn svg_of(renderable: &Renderable) -> String {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        renderable.render_to_svg(&mut doc, root).unwrap();
        doc.to_svg_string(&SvgConfig::compact())
    }

    #[test]
    fn test_all_primitives_registered() {
        let engine = engine();
        for name in ["rect", "circle", "line", "text", "group", "frame"] {
            assert!(engine.has_type(name), "{name} missing");
        }
    }

    #[test]
    fn test_rect_defaults() {
        let engine = engine();
        let r = engine
            .resolve(Spec::new("rect").with("width", 10).with("height", 5))
            .unwrap();
        assert_eq!(r.get_property("fill"), Some(&Value::from("black")));
        assert_eq!(
            svg_of(&r),
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect x="0" y="0" width="10" height="5" fill="black" class="rect"/></svg>"#
        );
    }

    #[test]
    fn test_negative_size_rejected() {
        let engine = engine();
        let err = engine
            .resolve(Spec::new("rect").with("width", -1).with("height", 5))
            .unwrap_err();
        assert_eq!(err.to_string(), "width failed validation");
    }

    #[test]
    fn test_text_is_escaped() {
        let engine = engine();
        let r = engine
            .resolve(Spec::new("text").with("text", "a < b").with("y", 10))
            .unwrap();
        assert!(svg_of(&r).contains(">a &lt; b</text>"));
    }

    #[test]
    fn test_group_translates_children_on_canvas() {
        let engine = engine();
        let g = engine
            .resolve(
                Spec::new("group").with("x", 5).with(
                    "children",
                    vec![Value::from(Spec::new("circle").with("r", 1))],
                ),
            )
            .unwrap();
        let mut canvas = CommandCanvas::new();
        assert!(g.render_to_canvas(&mut canvas).unwrap());
        let commands = canvas.commands();
        assert_eq!(commands.first(), Some(&CanvasCommand::Save));
        assert_eq!(commands[1], CanvasCommand::Translate { x: 5.0, y: 0.0 });
        assert_eq!(commands.last(), Some(&CanvasCommand::Restore));
    }

    #[test]
    fn test_frame_children_see_padded_container() {
        let engine = engine();
        engine
            .define(TypeSpec::new("fill").implementation(|_, _, ctx| {
                let (w, h) = ctx.container().map_or((0.0, 0.0), |c| c.size_or((0.0, 0.0)));
                Ok(Visualization::Spec(
                    Spec::new("rect").with("width", w).with("height", h),
                ))
            }))
            .unwrap();

        let frame = engine
            .resolve_in(
                Spec::new("frame")
                    .with("padding", 10)
                    .with("children", vec![Value::from(Spec::new("fill"))]),
                ContainerMetrics::new(200.0, 100.0),
            )
            .unwrap();
        assert_eq!(
            svg_of(&frame),
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg"><g class="group"><g transform="translate(10,10)" class="group">"#,
                r#"<rect x="0" y="0" width="180" height="80" fill="black" class="rect"/></g></g></svg>"#
            )
        );
    }
}
