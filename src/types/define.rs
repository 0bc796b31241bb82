//! The `define` meta-type
//!
//! A define-spec `{type: "define", name, properties, implementation, extend?,
//! validate?, layout?}` turns into a [`TypeDefinition`] and is registered as a
//! side effect of resolving it. Resolving a define-spec yields an empty
//! renderable.
//!
//! Inheritance composes results: for `C extends P`, `P`'s implementation runs
//! first with `C`'s fully-defaulted properties, and its result is handed to
//! `C`'s implementation as `base`.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::builder::BuildContext;
use crate::error::BuildError;
use crate::layout::{ConstraintSpec, LayoutContext};
use crate::renderable::Renderable;
use crate::value::{
    ConstraintGenerator, Function, Implementation, Props, Spec, SpecValidator, Value,
    Visualization,
};

use super::schema::{PropertySchema, PropertyType, TypeDefinition};

/// Name of the meta-type every other type is registered through
pub const DEFINE_TYPE: &str = "define";

/// A parsed define-spec
#[derive(Debug, Clone)]
pub struct DefineSpec {
    pub name: String,
    /// The type's own schema entries, before merging with a parent
    pub properties: BTreeMap<String, PropertySchema>,
    pub implementation: Option<Implementation>,
    pub extend: Option<String>,
    pub validate: Option<SpecValidator>,
    pub layout: Option<ConstraintGenerator>,
}

impl DefineSpec {
    /// Read a define-spec from resolved `define` properties
    pub fn from_props(props: &Props) -> Result<Self, BuildError> {
        let name = props
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| BuildError::spec_validation(DEFINE_TYPE, "'name' must be a string"))?
            .to_string();

        let properties = match props.get("properties") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(prop, entry)| {
                    PropertySchema::from_value(prop, entry).map(|schema| (prop.clone(), schema))
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(BuildError::spec_validation(
                    DEFINE_TYPE,
                    format!("'properties' must be an object, found {}", other.type_label()),
                ))
            }
        };

        let implementation = match props.get("implementation") {
            None | Some(Value::Null) => None,
            Some(Value::Function(Function::Implementation(f))) => Some(f.clone()),
            Some(_) => return Err(wrong_function("implementation")),
        };

        let extend = match props.get("extend") {
            None | Some(Value::Null) => None,
            Some(Value::String(parent)) => Some(parent.clone()),
            Some(_) => {
                return Err(BuildError::spec_validation(
                    DEFINE_TYPE,
                    "'extend' must name a type",
                ))
            }
        };

        let validate = match props.get("validate") {
            None | Some(Value::Null) => None,
            Some(Value::Function(Function::Validator(f))) => Some(f.clone()),
            Some(_) => return Err(wrong_function("validate")),
        };

        let layout = match props.get("layout") {
            None | Some(Value::Null) => None,
            Some(Value::Function(Function::Constraints(f))) => Some(f.clone()),
            Some(_) => return Err(wrong_function("layout")),
        };

        Ok(Self {
            name,
            properties,
            implementation,
            extend,
            validate,
            layout,
        })
    }
}

fn wrong_function(field: &str) -> BuildError {
    BuildError::spec_validation(
        DEFINE_TYPE,
        format!("'{}' holds the wrong kind of function", field),
    )
}

/// Turn a define-spec into a definition, merging in the parent named by
/// `extend`. `lookup` finds already-registered types.
pub fn build_definition(
    spec: DefineSpec,
    lookup: impl Fn(&str) -> Option<Rc<TypeDefinition>>,
) -> Result<TypeDefinition, BuildError> {
    let parent = match &spec.extend {
        Some(parent_name) => Some(lookup(parent_name).ok_or_else(|| BuildError::Extension {
            type_name: spec.name.clone(),
            parent: parent_name.clone(),
        })?),
        None => None,
    };

    // Parent schema first, own entries win on collision
    let mut properties = parent
        .as_ref()
        .map(|p| p.properties().clone())
        .unwrap_or_default();
    properties.extend(spec.properties);

    let implementation = match (&parent, spec.implementation) {
        (Some(parent), Some(own)) => compose(parent.implementation().clone(), own),
        (Some(parent), None) => parent.implementation().clone(),
        (None, Some(own)) => own,
        (None, None) => {
            return Err(BuildError::spec_validation(
                DEFINE_TYPE,
                format!("type '{}' needs an implementation or a type to extend", spec.name),
            ))
        }
    };

    let mut def = TypeDefinition::new(spec.name, properties, implementation);

    let inherited_layout = match &parent {
        Some(parent) => {
            def = def.with_extends(parent.name());
            for validator in parent.validators() {
                def = def.with_validator(validator.clone());
            }
            parent.layout().cloned()
        }
        None => None,
    };

    if let Some(validator) = spec.validate {
        def = def.with_validator(validator);
    }
    if let Some(layout) = spec.layout.or(inherited_layout) {
        def = def.with_layout(layout);
    }

    Ok(def)
}

fn compose(parent: Implementation, own: Implementation) -> Implementation {
    Implementation::new(move |props, _base, ctx| {
        let base = parent.call(props, None, ctx)?;
        tracing::trace!(
            type_name = ctx.type_name(),
            base_type = base.type_name(),
            "parent implementation produced base result"
        );
        own.call(props, Some(base), ctx)
    })
}

fn define_implementation(
    props: &Props,
    _base: Option<Visualization>,
    ctx: &BuildContext<'_>,
) -> Result<Visualization, BuildError> {
    let spec = DefineSpec::from_props(props)?;
    let engine = ctx.engine();
    let def = build_definition(spec, |name| engine.get_type(name))?;
    engine.register(def);
    Ok(Visualization::Renderable(Renderable::empty()))
}

/// The define-spec that describes `define` itself
pub(crate) fn define_type_spec() -> TypeSpec {
    TypeSpec::new(DEFINE_TYPE)
        .property(
            "name",
            PropertySchema::required()
                .of_type(PropertyType::String)
                .validated_by(|v| v.as_str().map_or(false, |s| !s.trim().is_empty())),
        )
        .property(
            "properties",
            PropertySchema::optional()
                .with_default(Value::Object(Props::new()))
                .of_type(PropertyType::Object),
        )
        .property(
            "implementation",
            PropertySchema::optional().of_type(PropertyType::Function),
        )
        .property("extend", PropertySchema::optional().of_type(PropertyType::String))
        .property("validate", PropertySchema::optional().of_type(PropertyType::Function))
        .property("layout", PropertySchema::optional().of_type(PropertyType::Function))
        .validate(|props| {
            let missing = |key: &str| props.get(key).map_or(true, Value::is_null);
            if missing("implementation") && missing("extend") {
                Err("a type needs an implementation or a type to extend".to_string())
            } else {
                Ok(())
            }
        })
        .implementation(define_implementation)
}

/// Definition used to resolve the very first `define` spec, before `define`
/// is in the registry
pub(crate) fn bootstrap_definition() -> Result<TypeDefinition, BuildError> {
    let spec = DefineSpec::from_props(define_type_spec().into_spec().props())?;
    build_definition(spec, |_| None)
}

/// Typed builder for define-specs
#[derive(Debug, Clone)]
pub struct TypeSpec {
    name: String,
    properties: BTreeMap<String, PropertySchema>,
    implementation: Option<Implementation>,
    extend: Option<String>,
    validate: Option<SpecValidator>,
    layout: Option<ConstraintGenerator>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            implementation: None,
            extend: None,
            validate: None,
            layout: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn implementation(
        mut self,
        f: impl Fn(&Props, Option<Visualization>, &BuildContext<'_>) -> Result<Visualization, BuildError>
            + 'static,
    ) -> Self {
        self.implementation = Some(Implementation::new(f));
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extend = Some(parent.into());
        self
    }

    pub fn validate(mut self, f: impl Fn(&Props) -> Result<(), String> + 'static) -> Self {
        self.validate = Some(SpecValidator::new(f));
        self
    }

    pub fn layout(
        mut self,
        f: impl Fn(&Props, &LayoutContext<'_>) -> Vec<ConstraintSpec> + 'static,
    ) -> Self {
        self.layout = Some(ConstraintGenerator::new(f));
        self
    }

    /// The plain define-spec this builder describes
    pub fn into_spec(self) -> Spec {
        let properties: Props = self
            .properties
            .iter()
            .map(|(name, schema)| (name.clone(), schema.to_value()))
            .collect();

        let mut spec = Spec::new(DEFINE_TYPE)
            .with("name", self.name)
            .with("properties", Value::Object(properties));
        if let Some(f) = self.implementation {
            spec.set("implementation", Function::Implementation(f));
        }
        if let Some(parent) = self.extend {
            spec.set("extend", parent);
        }
        if let Some(f) = self.validate {
            spec.set("validate", Function::Validator(f));
        }
        if let Some(f) = self.layout {
            spec.set("layout", Function::Constraints(f));
        }
        spec
    }
}

impl From<TypeSpec> for Spec {
    fn from(spec: TypeSpec) -> Self {
        spec.into_spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> Implementation {
        Implementation::new(|_, _, _| Ok(Visualization::Renderable(Renderable::empty())))
    }

    fn parent_def() -> Rc<TypeDefinition> {
        let spec = DefineSpec {
            name: "parent".to_string(),
            properties: [
                ("a".to_string(), PropertySchema::required()),
                ("b".to_string(), PropertySchema::optional().with_default(1)),
            ]
            .into_iter()
            .collect(),
            implementation: Some(leaf()),
            extend: None,
            validate: None,
            layout: None,
        };
        Rc::new(build_definition(spec, |_| None).unwrap())
    }

    #[test]
    fn test_extension_merges_schema() {
        let parent = parent_def();
        let spec = DefineSpec {
            name: "child".to_string(),
            properties: [("c".to_string(), PropertySchema::required())]
                .into_iter()
                .collect(),
            implementation: None,
            extend: Some("parent".to_string()),
            validate: None,
            layout: None,
        };
        let def = build_definition(spec, |name| (name == "parent").then(|| parent.clone())).unwrap();

        assert_eq!(def.required_props(), ["a".to_string(), "c".to_string()]);
        assert_eq!(def.optional_props().get("b"), Some(&Value::Number(1.0)));
        assert_eq!(def.extends(), Some("parent"));
    }

    #[test]
    fn test_child_schema_wins_on_collision() {
        let parent = parent_def();
        let spec = DefineSpec {
            name: "child".to_string(),
            properties: [("b".to_string(), PropertySchema::optional().with_default(5))]
                .into_iter()
                .collect(),
            implementation: Some(leaf()),
            extend: Some("parent".to_string()),
            validate: None,
            layout: None,
        };
        let def = build_definition(spec, |_| Some(parent.clone())).unwrap();
        assert_eq!(def.optional_props().get("b"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_extending_missing_type_fails_closed() {
        let spec = DefineSpec {
            name: "orphan".to_string(),
            properties: BTreeMap::new(),
            implementation: Some(leaf()),
            extend: Some("ghost".to_string()),
            validate: None,
            layout: None,
        };
        let err = build_definition(spec, |_| None).unwrap_err();
        assert!(matches!(err, BuildError::Extension { ref parent, .. } if parent == "ghost"));
    }

    #[test]
    fn test_type_spec_round_trips_into_define_spec() {
        let spec = TypeSpec::new("rect")
            .property("x", PropertySchema::required())
            .property("fill", PropertySchema::optional().with_default("black"))
            .implementation(|_, _, _| Ok(Visualization::Renderable(Renderable::empty())))
            .into_spec();
        assert_eq!(spec.type_name(), DEFINE_TYPE);

        let parsed = DefineSpec::from_props(spec.props()).unwrap();
        assert_eq!(parsed.name, "rect");
        assert!(parsed.properties["x"].required);
        assert_eq!(parsed.properties["fill"].default, Some(Value::from("black")));
        assert!(parsed.implementation.is_some());
    }

    #[test]
    fn test_bootstrap_definition_describes_define() {
        let def = bootstrap_definition().unwrap();
        assert_eq!(def.name(), DEFINE_TYPE);
        assert_eq!(def.required_props(), ["name".to_string()]);
        assert!(def.optional_props().contains_key("properties"));
        assert_eq!(def.validators().len(), 1);
    }
}
