//! The engine: a type registry plus configuration
//!
//! An [`Engine`] is an explicit context value. Most callers create one and
//! pass it around; code that wants a process-wide engine uses [`global`],
//! which is created lazily per thread and can be replaced with
//! [`init_global`] or dropped with [`reset_global`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::builder::{self, Scope};
use crate::config::EngineConfig;
use crate::error::BuildError;
use crate::layout::ContainerMetrics;
use crate::renderable::Renderable;
use crate::types::define::{bootstrap_definition, define_type_spec, DEFINE_TYPE};
use crate::types::{TypeDefinition, TypeRegistry, TypeSpec};
use crate::value::{Value, Visualization};

/// Registry and configuration for resolving specs
#[derive(Debug)]
pub struct Engine {
    registry: RefCell<TypeRegistry>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with `define` registered
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
            .expect("define must bootstrap under the default configuration")
    }

    /// Create an engine with `define` registered. Fails when `config`
    /// leaves no room to resolve the define type itself, for example a
    /// `max_depth` of zero.
    pub fn with_config(config: EngineConfig) -> Result<Self, BuildError> {
        let engine = Self {
            registry: RefCell::new(TypeRegistry::new()),
            config,
        };
        engine.bootstrap()?;
        Ok(engine)
    }

    /// Resolve the self-describing define-spec. Until this succeeds the
    /// builder falls back to the bootstrap definition for `define`.
    fn bootstrap(&self) -> Result<(), BuildError> {
        self.resolve(define_type_spec().into_spec())?;
        tracing::debug!("define type registered");
        Ok(())
    }

    /// Create an engine with the built-in primitives installed
    pub fn with_primitives() -> Result<Self, BuildError> {
        let engine = Self::new();
        crate::primitives::install(&engine)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registered definition for `name`, without the bootstrap
    /// fallback [`Engine::lookup`] applies
    pub fn get_type(&self, name: &str) -> Option<Rc<TypeDefinition>> {
        self.registry.borrow().get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.registry.borrow().has(name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .borrow()
            .names()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn type_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Register a definition directly, returning the one it replaced
    pub fn register(&self, def: TypeDefinition) -> Option<Rc<TypeDefinition>> {
        self.registry.borrow_mut().register(def)
    }

    pub fn remove_type(&self, name: &str) -> bool {
        self.registry.borrow_mut().remove(name)
    }

    /// Drop every type, then register `define` again. Meant for test
    /// isolation.
    pub fn reset(&self) -> Result<(), BuildError> {
        self.registry.borrow_mut().clear();
        self.bootstrap()
    }

    /// Find the definition for a type name
    pub fn lookup(&self, name: &str) -> Result<Rc<TypeDefinition>, BuildError> {
        let found = self.registry.borrow().get(name);
        if let Some(def) = found {
            return Ok(def);
        }
        if name == DEFINE_TYPE {
            tracing::debug!("define is not registered yet, using bootstrap definition");
            return bootstrap_definition().map(Rc::new);
        }
        Err(BuildError::UnknownType {
            name: name.to_string(),
        })
    }

    /// Register a type through the `define` type
    pub fn define(&self, spec: TypeSpec) -> Result<(), BuildError> {
        self.resolve(spec.into_spec()).map(|_| ())
    }

    /// Resolve a spec, or pass a renderable through unchanged
    pub fn resolve(&self, viz: impl Into<Visualization>) -> Result<Renderable, BuildError> {
        builder::resolve(self, viz.into(), &Scope::root(None))
    }

    /// Resolve inside a container of known size
    pub fn resolve_in(
        &self,
        viz: impl Into<Visualization>,
        container: ContainerMetrics,
    ) -> Result<Renderable, BuildError> {
        builder::resolve(self, viz.into(), &Scope::root(Some(container)))
    }

    /// Resolve a dynamic value; `Null`, non-objects and untyped objects are
    /// spec shape errors
    pub fn resolve_value(&self, value: &Value) -> Result<Renderable, BuildError> {
        builder::resolve_value(self, value, &Scope::root(None))
    }

    pub fn resolve_json(&self, json: serde_json::Value) -> Result<Renderable, BuildError> {
        self.resolve_value(&Value::from(json))
    }
}

thread_local! {
    static GLOBAL: RefCell<Option<Rc<Engine>>> = const { RefCell::new(None) };
}

/// The process-wide engine for this thread, created on first use
pub fn global() -> Rc<Engine> {
    GLOBAL.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| Rc::new(Engine::new()))
            .clone()
    })
}

/// Replace the process-wide engine. On error the current one stays.
pub fn init_global(config: EngineConfig) -> Result<Rc<Engine>, BuildError> {
    let engine = Rc::new(Engine::with_config(config)?);
    GLOBAL.with(|slot| *slot.borrow_mut() = Some(engine.clone()));
    Ok(engine)
}

/// Drop the process-wide engine; the next [`global`] call starts fresh
pub fn reset_global() {
    GLOBAL.with(|slot| *slot.borrow_mut() = None);
}

/// Resolve with the process-wide engine
pub fn build_viz(viz: impl Into<Visualization>) -> Result<Renderable, BuildError> {
    global().resolve(viz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertySchema;
    use crate::value::Spec;

    fn leaf(engine: &Engine, name: &str) {
        engine
            .define(TypeSpec::new(name).implementation(|_, _, _| {
                Ok(Visualization::Renderable(Renderable::empty()))
            }))
            .unwrap();
    }

    #[test]
    fn test_define_registers_itself() {
        let engine = Engine::new();
        let def = engine.get_type(DEFINE_TYPE).unwrap();
        assert_eq!(def.required_props(), ["name".to_string()]);
    }

    #[test]
    fn test_unknown_type() {
        let engine = Engine::new();
        let err = engine.resolve(Spec::new("nope")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown visualization type: nope");
    }

    #[test]
    fn test_define_spec_without_name_fails() {
        let engine = Engine::new();
        let spec = Spec::new(DEFINE_TYPE).with("properties", Value::Object(Default::default()));
        let err = engine.resolve(spec).unwrap_err();
        assert!(matches!(err, BuildError::MissingProperty { ref property, .. } if property == "name"));
    }

    #[test]
    fn test_reset_keeps_only_define() {
        let engine = Engine::new();
        leaf(&engine, "thing");
        assert!(engine.has_type("thing"));

        engine.reset().unwrap();
        assert!(!engine.has_type("thing"));
        assert_eq!(engine.type_names(), vec![DEFINE_TYPE.to_string()]);
        assert_eq!(engine.type_count(), 1);
    }

    #[test]
    fn test_define_can_be_redefined_from_scratch() {
        let engine = Engine::new();
        assert!(engine.remove_type(DEFINE_TYPE));
        // The bootstrap definition takes over until define is registered again
        leaf(&engine, "thing");
        assert!(engine.has_type("thing"));
        assert!(!engine.has_type(DEFINE_TYPE));
    }

    #[test]
    fn test_global_lifecycle() {
        reset_global();
        leaf(&global(), "shared");
        assert!(build_viz(Spec::new("shared")).is_ok());

        reset_global();
        assert!(build_viz(Spec::new("shared")).is_err());

        let engine = init_global(EngineConfig::default().with_max_depth(3)).unwrap();
        assert_eq!(global().config().max_depth, 3);
        assert!(Rc::ptr_eq(&engine, &global()));

        // A config the define type cannot bootstrap under keeps the old engine
        assert!(init_global(EngineConfig::default().with_max_depth(0)).is_err());
        assert!(Rc::ptr_eq(&engine, &global()));
        reset_global();
    }

    #[test]
    fn test_unusable_config_is_an_error() {
        let err = Engine::with_config(EngineConfig::default().with_max_depth(0)).unwrap_err();
        assert!(matches!(err, BuildError::DepthExceeded { limit: 0, .. }));
    }

    #[test]
    fn test_type_queries_release_the_registry() {
        let engine = Engine::new();
        let names = engine.type_names();
        let define = engine.get_type(DEFINE_TYPE);
        // Holding query results does not block registration
        leaf(&engine, "later");
        assert_eq!(names, vec![DEFINE_TYPE.to_string()]);
        assert!(define.is_some());
        assert!(engine.has_type("later"));
    }

    #[test]
    fn test_required_schema_from_type_spec() {
        let engine = Engine::new();
        engine
            .define(
                TypeSpec::new("needy")
                    .property("x", PropertySchema::required())
                    .implementation(|_, _, _| Ok(Visualization::Renderable(Renderable::empty()))),
            )
            .unwrap();
        let err = engine.resolve(Spec::new("needy")).unwrap_err();
        assert_eq!(err.to_string(), "Required property 'x' is missing");
    }
}
