//! Property validation chain
//!
//! Checks run in a fixed order and the first failure aborts:
//! required presence, declared type, property predicates, whole-spec
//! validators.

use crate::error::BuildError;
use crate::types::TypeDefinition;
use crate::value::{Props, Value};

pub(crate) fn validate(def: &TypeDefinition, props: &Props) -> Result<(), BuildError> {
    for property in def.required_props() {
        if props.get(property).map_or(true, Value::is_null) {
            return Err(BuildError::MissingProperty {
                type_name: def.name().to_string(),
                property: property.clone(),
            });
        }
    }

    for (property, schema) in def.properties() {
        let (Some(kind), Some(value)) = (schema.kind, present(props, property)) else {
            continue;
        };
        if !kind.matches(value) {
            return Err(BuildError::PropertyType {
                type_name: def.name().to_string(),
                property: property.clone(),
                expected: kind,
            });
        }
    }

    for (property, schema) in def.properties() {
        let (Some(predicate), Some(value)) = (&schema.validate, present(props, property)) else {
            continue;
        };
        if !predicate.test(value) {
            return Err(BuildError::PropertyValidation {
                type_name: def.name().to_string(),
                property: property.clone(),
            });
        }
    }

    for validator in def.validators() {
        validator
            .check(props)
            .map_err(|message| BuildError::spec_validation(def.name(), message))?;
    }

    Ok(())
}

fn present<'a>(props: &'a Props, property: &str) -> Option<&'a Value> {
    props.get(property).filter(|v| !v.is_null())
}
