//! Property schemas and registered type definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::value::{
    ConstraintGenerator, Function, Implementation, Predicate, Props, SpecValidator, Value,
};

/// Declared primitive type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Number,
    String,
    Boolean,
    Array,
    Object,
    Function,
}

impl PropertyType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "function" => Some(Self::Function),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Function => "function",
        }
    }

    /// Whether `value` satisfies this type tag. Resolved renderables count
    /// as objects.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Number => matches!(value, Value::Number(_)),
            Self::String => matches!(value, Value::String(_)),
            Self::Boolean => matches!(value, Value::Bool(_)),
            Self::Array => matches!(value, Value::Array(_)),
            Self::Object => matches!(value, Value::Object(_) | Value::Renderable(_)),
            Self::Function => matches!(value, Value::Function(_)),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema of one property
#[derive(Debug, Clone, Default)]
pub struct PropertySchema {
    pub required: bool,
    pub default: Option<Value>,
    pub kind: Option<PropertyType>,
    pub validate: Option<Predicate>,
}

impl PropertySchema {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn of_type(mut self, kind: PropertyType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn validated_by(mut self, f: impl Fn(&Value) -> bool + 'static) -> Self {
        self.validate = Some(Predicate::new(f));
        self
    }

    /// Read a schema entry from its define-spec form:
    /// `{required?, default?, type?, validate?}`
    pub fn from_value(name: &str, value: &Value) -> Result<Self, BuildError> {
        let entry = value.as_object().ok_or_else(|| {
            BuildError::spec_validation(
                "define",
                format!(
                    "schema for property '{}' must be an object, found {}",
                    name,
                    value.type_label()
                ),
            )
        })?;

        let required = match entry.get("required") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(BuildError::spec_validation(
                    "define",
                    format!("'required' of property '{}' must be a boolean", name),
                ))
            }
        };

        let kind = match entry.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(tag)) => Some(PropertyType::parse(tag).ok_or_else(|| {
                BuildError::spec_validation(
                    "define",
                    format!("unknown type tag '{}' for property '{}'", tag, name),
                )
            })?),
            Some(_) => {
                return Err(BuildError::spec_validation(
                    "define",
                    format!("'type' of property '{}' must be a string", name),
                ))
            }
        };

        let validate = match entry.get("validate") {
            None | Some(Value::Null) => None,
            Some(Value::Function(Function::Predicate(p))) => Some(p.clone()),
            Some(_) => {
                return Err(BuildError::spec_validation(
                    "define",
                    format!("'validate' of property '{}' must be a predicate", name),
                ))
            }
        };

        Ok(Self {
            required,
            default: entry.get("default").cloned(),
            kind,
            validate,
        })
    }

    /// The define-spec form of this schema
    pub fn to_value(&self) -> Value {
        let mut entry = Props::new();
        if self.required {
            entry.insert("required".to_string(), Value::Bool(true));
        }
        if let Some(default) = &self.default {
            entry.insert("default".to_string(), default.clone());
        }
        if let Some(kind) = self.kind {
            entry.insert("type".to_string(), Value::from(kind.as_str()));
        }
        if let Some(validate) = &self.validate {
            entry.insert(
                "validate".to_string(),
                Value::Function(Function::Predicate(validate.clone())),
            );
        }
        Value::Object(entry)
    }
}

/// A registered visual type
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    name: String,
    properties: BTreeMap<String, PropertySchema>,
    required_props: Vec<String>,
    optional_props: Props,
    implementation: Implementation,
    extends: Option<String>,
    validators: Vec<SpecValidator>,
    layout: Option<ConstraintGenerator>,
}

impl TypeDefinition {
    /// Create a definition from an already-merged schema
    pub fn new(
        name: impl Into<String>,
        properties: BTreeMap<String, PropertySchema>,
        implementation: Implementation,
    ) -> Self {
        let required_props = properties
            .iter()
            .filter(|(_, schema)| schema.required)
            .map(|(name, _)| name.clone())
            .collect();
        let optional_props = properties
            .iter()
            .filter_map(|(name, schema)| {
                schema
                    .default
                    .as_ref()
                    .map(|default| (name.clone(), default.clone()))
            })
            .collect();

        Self {
            name: name.into(),
            properties,
            required_props,
            optional_props,
            implementation,
            extends: None,
            validators: Vec::new(),
            layout: None,
        }
    }

    pub fn with_extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Append a whole-spec validator; validators run in insertion order
    pub fn with_validator(mut self, validator: SpecValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_layout(mut self, layout: ConstraintGenerator) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full schema, parent entries included
    pub fn properties(&self) -> &BTreeMap<String, PropertySchema> {
        &self.properties
    }

    pub fn required_props(&self) -> &[String] {
        &self.required_props
    }

    /// Property name to default value
    pub fn optional_props(&self) -> &Props {
        &self.optional_props
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn validators(&self) -> &[SpecValidator] {
        &self.validators
    }

    pub fn layout(&self) -> Option<&ConstraintGenerator> {
        self.layout.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderable::Renderable;
    use crate::value::Visualization;

    fn noop() -> Implementation {
        Implementation::new(|_, _, _| Ok(Visualization::Renderable(Renderable::empty())))
    }

    #[test]
    fn test_type_tags() {
        assert!(PropertyType::Number.matches(&Value::Number(1.0)));
        assert!(!PropertyType::Number.matches(&Value::from("1")));
        assert!(PropertyType::Object.matches(&Value::Renderable(Renderable::empty())));
        assert_eq!(PropertyType::parse("boolean"), Some(PropertyType::Boolean));
        assert_eq!(PropertyType::parse("date"), None);
    }

    #[test]
    fn test_split_required_and_optional() {
        let mut properties = BTreeMap::new();
        properties.insert("a".to_string(), PropertySchema::required());
        properties.insert("b".to_string(), PropertySchema::optional().with_default(1));
        properties.insert("c".to_string(), PropertySchema::optional());

        let def = TypeDefinition::new("t", properties, noop());
        assert_eq!(def.required_props(), ["a".to_string()]);
        assert_eq!(def.optional_props().len(), 1);
        assert_eq!(def.optional_props().get("b"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_schema_round_trips_through_define_form() {
        let schema = PropertySchema::required()
            .with_default("black")
            .of_type(PropertyType::String);
        let parsed = PropertySchema::from_value("fill", &schema.to_value()).unwrap();
        assert!(parsed.required);
        assert_eq!(parsed.default, Some(Value::from("black")));
        assert_eq!(parsed.kind, Some(PropertyType::String));
    }

    #[test]
    fn test_schema_rejects_unknown_tag() {
        let mut entry = Props::new();
        entry.insert("type".to_string(), Value::from("date"));
        let err = PropertySchema::from_value("when", &Value::Object(entry)).unwrap_err();
        assert!(err.to_string().contains("unknown type tag 'date'"));
    }
}
