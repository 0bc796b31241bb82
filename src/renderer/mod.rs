//! Rendering backends for resolved visualizations
//!
//! Renderables paint either into an [`SvgDocument`] or onto a [`Canvas2d`];
//! [`render`] picks the path for a given target.

pub mod canvas;
pub mod dispatch;
pub mod svg;

pub use canvas::{Canvas2d, CanvasCommand, CommandCanvas};
pub use crate::config::SvgConfig;
pub use dispatch::{render, HostElement, RenderError, RenderHandle, RenderTarget, Rendered};
pub use svg::{escape_xml, NodeId, SvgDocument, SvgElement};
