//! Spec values
//!
//! A visualization spec is plain data (`{type, ...properties}`) that may also
//! carry already-resolved renderables, lazily computed properties, and the
//! function-valued fields a `define` spec needs.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::builder::BuildContext;
use crate::error::BuildError;
use crate::layout::{ConstraintSpec, LayoutContext};
use crate::renderable::Renderable;

/// Property map of a spec. The `type` key is never stored here.
pub type Props = BTreeMap<String, Value>;

/// A property value
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Props),
    /// An already-resolved child
    Renderable(Renderable),
    /// A property evaluated once per resolution, before validation
    Computed(Computed),
    Function(Function),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Props> {
        match self {
            Value::Object(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_renderable(&self) -> Option<&Renderable> {
        match self {
            Value::Renderable(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Short label for error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Renderable(_) => "renderable",
            Value::Computed(_) => "computed",
            Value::Function(_) => "function",
        }
    }

    /// Convert plain data back to JSON.
    ///
    /// Returns `None` when the value (or anything nested in it) is a
    /// renderable, computed property, or function.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Object(props) => {
                let mut map = serde_json::Map::new();
                for (key, value) in props {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Renderable(_) | Value::Computed(_) | Value::Function(_) => return None,
        })
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Whole numbers print as integers so "10" round-trips as 10, not 10.0
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Renderable(a), Value::Renderable(b)) => Renderable::ptr_eq(a, b),
            (Value::Computed(a), Value::Computed(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Object(props)
    }
}

impl From<Renderable> for Value {
    fn from(r: Renderable) -> Self {
        Value::Renderable(r)
    }
}

impl From<Computed> for Value {
    fn from(c: Computed) -> Self {
        Value::Computed(c)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Spec> for Value {
    fn from(spec: Spec) -> Self {
        spec.to_value()
    }
}

impl From<Visualization> for Value {
    fn from(viz: Visualization) -> Self {
        match viz {
            Visualization::Spec(spec) => spec.to_value(),
            Visualization::Renderable(r) => Value::Renderable(r),
        }
    }
}

// ============================================================================
// Spec
// ============================================================================

/// A `{type, ...properties}` visualization spec
#[derive(Clone, Debug, PartialEq)]
pub struct Spec {
    type_name: String,
    props: Props,
}

impl Spec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            props: Props::new(),
        }
    }

    /// Build a spec from a property map; a stray `type` key is dropped
    pub fn from_props(type_name: impl Into<String>, mut props: Props) -> Self {
        props.remove("type");
        Self {
            type_name: type_name.into(),
            props,
        }
    }

    /// Set a property, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if key == "type" {
            if let Value::String(name) = value {
                self.type_name = name;
            }
            return;
        }
        self.props.insert(key, value);
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn into_props(self) -> Props {
        self.props
    }

    /// A new spec with `partial` laid over this one. A `type` entry in
    /// `partial` switches the type.
    pub fn merged(&self, partial: &Props) -> Spec {
        let mut merged = self.clone();
        for (key, value) in partial {
            merged.set(key.clone(), value.clone());
        }
        merged
    }

    /// The spec as an object value, `type` included
    pub fn to_value(&self) -> Value {
        let mut props = self.props.clone();
        props.insert("type".to_string(), Value::String(self.type_name.clone()));
        Value::Object(props)
    }

    /// Read a spec out of a dynamic value
    pub fn from_value(value: &Value) -> Result<Spec, BuildError> {
        let props = match value {
            Value::Null => return Err(BuildError::spec_shape("spec is null")),
            Value::Object(props) => props,
            other => {
                return Err(BuildError::spec_shape(format!(
                    "spec must be an object, found {}",
                    other.type_label()
                )))
            }
        };
        let type_name = match props.get("type") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            Some(Value::String(_)) => {
                return Err(BuildError::spec_shape("spec has an empty 'type'"))
            }
            Some(other) => {
                return Err(BuildError::spec_shape(format!(
                    "spec 'type' must be a string, found {}",
                    other.type_label()
                )))
            }
            None => return Err(BuildError::spec_shape("spec is missing a 'type' string")),
        };
        Ok(Spec::from_props(type_name, props.clone()))
    }

    pub fn from_json(json: serde_json::Value) -> Result<Spec, BuildError> {
        Spec::from_value(&Value::from(json))
    }
}

// ============================================================================
// Visualization: spec or renderable
// ============================================================================

/// Input to, and output of, type implementations
#[derive(Clone, Debug)]
pub enum Visualization {
    Spec(Spec),
    Renderable(Renderable),
}

impl Visualization {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Visualization::Renderable(_))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Visualization::Spec(spec) => spec.type_name(),
            Visualization::Renderable(r) => r.renderable_type(),
        }
    }

    pub fn as_spec(&self) -> Option<&Spec> {
        match self {
            Visualization::Spec(spec) => Some(spec),
            Visualization::Renderable(_) => None,
        }
    }

    pub fn into_spec(self) -> Option<Spec> {
        match self {
            Visualization::Spec(spec) => Some(spec),
            Visualization::Renderable(_) => None,
        }
    }

    /// Interpret a dynamic value as a spec or a renderable
    pub fn from_value(value: &Value) -> Result<Visualization, BuildError> {
        match value {
            Value::Renderable(r) => Ok(Visualization::Renderable(r.clone())),
            other => Spec::from_value(other).map(Visualization::Spec),
        }
    }
}

impl From<Spec> for Visualization {
    fn from(spec: Spec) -> Self {
        Visualization::Spec(spec)
    }
}

impl From<Renderable> for Visualization {
    fn from(r: Renderable) -> Self {
        Visualization::Renderable(r)
    }
}

impl From<&Renderable> for Visualization {
    fn from(r: &Renderable) -> Self {
        Visualization::Renderable(r.clone())
    }
}

// ============================================================================
// Function-valued properties
// ============================================================================

/// What a computed property sees when it is evaluated
pub struct EvalContext<'a> {
    pub type_name: &'a str,
    pub property: &'a str,
    /// Properties after defaults, before any computed value was evaluated
    pub props: &'a Props,
}

type ComputedFn = dyn Fn(&EvalContext<'_>) -> Result<Value, BuildError>;

/// A lazily computed property value
#[derive(Clone)]
pub struct Computed(Rc<ComputedFn>);

impl Computed {
    pub fn new(f: impl Fn(&EvalContext<'_>) -> Result<Value, BuildError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value, BuildError> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Computed(..)")
    }
}

type ImplementationFn =
    dyn Fn(&Props, Option<Visualization>, &BuildContext<'_>) -> Result<Visualization, BuildError>;

/// A type's implementation. `base` carries the parent type's result when the
/// type extends another one.
#[derive(Clone)]
pub struct Implementation(Rc<ImplementationFn>);

impl Implementation {
    pub fn new(
        f: impl Fn(&Props, Option<Visualization>, &BuildContext<'_>) -> Result<Visualization, BuildError>
            + 'static,
    ) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(
        &self,
        props: &Props,
        base: Option<Visualization>,
        ctx: &BuildContext<'_>,
    ) -> Result<Visualization, BuildError> {
        (self.0)(props, base, ctx)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Implementation(..)")
    }
}

/// Whole-spec validator; `Err` carries the failure message
#[derive(Clone)]
pub struct SpecValidator(Rc<dyn Fn(&Props) -> Result<(), String>>);

impl SpecValidator {
    pub fn new(f: impl Fn(&Props) -> Result<(), String> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn check(&self, props: &Props) -> Result<(), String> {
        (self.0)(props)
    }
}

impl fmt::Debug for SpecValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpecValidator(..)")
    }
}

/// Property-local validation predicate
#[derive(Clone)]
pub struct Predicate(Rc<dyn Fn(&Value) -> bool>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

type ConstraintFn = dyn Fn(&Props, &LayoutContext<'_>) -> Vec<ConstraintSpec>;

/// Produces the abstract constraint list for a type that needs layout
#[derive(Clone)]
pub struct ConstraintGenerator(Rc<ConstraintFn>);

impl ConstraintGenerator {
    pub fn new(f: impl Fn(&Props, &LayoutContext<'_>) -> Vec<ConstraintSpec> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn generate(&self, props: &Props, ctx: &LayoutContext<'_>) -> Vec<ConstraintSpec> {
        (self.0)(props, ctx)
    }
}

impl fmt::Debug for ConstraintGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConstraintGenerator(..)")
    }
}

/// A function carried as a property value
#[derive(Clone, Debug)]
pub enum Function {
    Implementation(Implementation),
    Validator(SpecValidator),
    Predicate(Predicate),
    Constraints(ConstraintGenerator),
}

impl Function {
    fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Implementation(a), Function::Implementation(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Function::Validator(a), Function::Validator(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Function::Predicate(a), Function::Predicate(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Function::Constraints(a), Function::Constraints(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}
