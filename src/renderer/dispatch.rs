//! Render dispatch
//!
//! Picks the SVG or canvas code path for a target and hands back a
//! [`RenderHandle`] that can later remove or rebuild what was drawn.

use thiserror::Error;

use crate::engine::Engine;
use crate::error::BuildError;
use crate::layout::ContainerMetrics;
use crate::renderable::Renderable;
use crate::value::Props;

use super::{Canvas2d, NodeId, SvgDocument};

/// Errors raised while painting
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("element {0:?} is not part of this document")]
    UnknownNode(NodeId),

    #[error("{renderable_type}: {message}")]
    Painter {
        renderable_type: String,
        message: String,
    },

    #[error("re-resolving for update failed: {0}")]
    Build(#[from] BuildError),
}

impl RenderError {
    pub fn painter(renderable_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Painter {
            renderable_type: renderable_type.into(),
            message: message.into(),
        }
    }
}

/// A plain container element that is neither an SVG root nor a canvas.
///
/// Rendering into it creates a full-size `<svg>` on first use and reuses it
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct HostElement {
    metrics: ContainerMetrics,
    svg: Option<SvgDocument>,
}

impl HostElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            metrics: ContainerMetrics::new(width, height),
            svg: None,
        }
    }

    pub fn metrics(&self) -> ContainerMetrics {
        self.metrics
    }

    pub fn svg(&self) -> Option<&SvgDocument> {
        self.svg.as_ref()
    }

    pub fn svg_mut(&mut self) -> Option<&mut SvgDocument> {
        self.svg.as_mut()
    }

    fn ensure_svg(&mut self) -> &mut SvgDocument {
        self.svg.get_or_insert_with(|| {
            let mut doc = SvgDocument::new();
            let root = doc.root();
            doc.set_attribute(root, "width", "100%");
            doc.set_attribute(root, "height", "100%");
            doc
        })
    }
}

/// Where to render
pub enum RenderTarget<'a> {
    Host(&'a mut HostElement),
    /// An SVG document and the element to paint into
    Svg(&'a mut SvgDocument, NodeId),
    Canvas(&'a mut dyn Canvas2d),
}

/// What a render produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendered {
    /// The element added to an SVG tree, if any
    Svg(Option<NodeId>),
    /// Whether the canvas painter drew
    Canvas(bool),
}

/// Result of [`render`]
#[derive(Debug, Clone)]
pub struct RenderHandle {
    renderable: Renderable,
    rendered: Rendered,
}

impl RenderHandle {
    pub fn renderable(&self) -> &Renderable {
        &self.renderable
    }

    pub fn rendered(&self) -> Rendered {
        self.rendered
    }

    /// The SVG element that was produced
    pub fn element(&self) -> Option<NodeId> {
        match self.rendered {
            Rendered::Svg(element) => element,
            Rendered::Canvas(_) => None,
        }
    }

    /// Detach the produced element from its parent
    pub fn cleanup(&self, doc: &mut SvgDocument) -> bool {
        self.element().map_or(false, |element| doc.detach(element))
    }

    /// Re-resolve with `partial` laid over the original spec and render the
    /// result in place of the previous output
    pub fn update(
        &mut self,
        engine: &Engine,
        partial: &Props,
        target: RenderTarget<'_>,
    ) -> Result<(), RenderError> {
        let renderable = self.renderable.update(engine, partial)?;
        let previous = self.element();

        let rendered = match target {
            RenderTarget::Canvas(ctx) => Rendered::Canvas(renderable.render_to_canvas(ctx)?),
            RenderTarget::Svg(doc, parent) => {
                Rendered::Svg(swap_in(&renderable, doc, parent, previous)?)
            }
            RenderTarget::Host(host) => {
                let doc = host.ensure_svg();
                let root = doc.root();
                Rendered::Svg(swap_in(&renderable, doc, root, previous)?)
            }
        };

        self.renderable = renderable;
        self.rendered = rendered;
        Ok(())
    }
}

/// Paint `renderable` and move the new element into the slot of `previous`
fn swap_in(
    renderable: &Renderable,
    doc: &mut SvgDocument,
    parent: NodeId,
    previous: Option<NodeId>,
) -> Result<Option<NodeId>, RenderError> {
    let element = renderable.render_to_svg(doc, parent)?;
    match (previous, element) {
        (Some(old), Some(new)) => {
            if !doc.replace(old, new) {
                tracing::debug!("previous element was already detached, keeping new one appended");
            }
        }
        (Some(old), None) => {
            doc.detach(old);
        }
        (None, _) => {}
    }
    Ok(element)
}

/// Render into an SVG element, a canvas, or a plain host element
#[tracing::instrument(level = "debug", skip_all, fields(renderable_type = %renderable.renderable_type()))]
pub fn render(renderable: &Renderable, target: RenderTarget<'_>) -> Result<RenderHandle, RenderError> {
    let rendered = match target {
        RenderTarget::Svg(doc, parent) => Rendered::Svg(renderable.render_to_svg(doc, parent)?),
        RenderTarget::Canvas(ctx) => Rendered::Canvas(renderable.render_to_canvas(ctx)?),
        RenderTarget::Host(host) => {
            let doc = host.ensure_svg();
            let root = doc.root();
            Rendered::Svg(renderable.render_to_svg(doc, root)?)
        }
    };
    Ok(RenderHandle {
        renderable: renderable.clone(),
        rendered,
    })
}
