//! Type system: property schemas, the type registry, and `define`
//!
//! Every visual type is registered through the `define` type, which is itself
//! a registered type. The registry special-cases `define` only until the
//! bootstrap spec has installed it.
//!
//! # Example
//!
//! ```rust
//! use vizspec::{Engine, PropertySchema, Renderable, TypeSpec, Visualization};
//!
//! let engine = Engine::new();
//! engine
//!     .define(
//!         TypeSpec::new("dot")
//!             .property("r", PropertySchema::optional().with_default(2.0))
//!             .implementation(|props, _base, _ctx| {
//!                 Renderable::builder("dot")
//!                     .props(props.clone())
//!                     .svg(|_, _, _| Ok(None))
//!                     .canvas(|_, _| Ok(true))
//!                     .build()
//!                     .map(Visualization::Renderable)
//!             }),
//!     )
//!     .unwrap();
//! assert!(engine.has_type("dot"));
//! ```

pub mod define;
mod registry;
mod schema;

pub use define::{DefineSpec, TypeSpec, DEFINE_TYPE};
pub use registry::TypeRegistry;
pub use schema::{PropertySchema, PropertyType, TypeDefinition};
