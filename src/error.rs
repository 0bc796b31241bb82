//! Error types for spec resolution and type definition

use thiserror::Error;

use crate::solver::SolverError;
use crate::types::PropertyType;

/// Broad category of a [`BuildError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Null input, non-object input, or a spec without a `type`
    SpecShape,
    /// The spec names a type that is not registered
    UnknownType,
    /// Missing required property, wrong declared type, or a failed validator
    PropertyValidation,
    /// `extend` names a type that does not exist
    Extension,
    /// Self-referential or too deeply nested resolution
    RecursionGuard,
    /// An implementation returned something the builder cannot use
    ImplementationContract,
    /// Constraint construction failed while solving a layout
    Layout,
    /// An implementation function reported its own failure
    Implementation,
}

/// Errors raised while resolving a spec into a renderable
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid visualization spec: {reason}")]
    SpecShape { reason: String },

    #[error("Unknown visualization type: {name}")]
    UnknownType { name: String },

    #[error("Required property '{property}' is missing")]
    MissingProperty { type_name: String, property: String },

    #[error("Property '{property}' must be of type {expected}")]
    PropertyType {
        type_name: String,
        property: String,
        expected: PropertyType,
    },

    #[error("{property} failed validation")]
    PropertyValidation { type_name: String, property: String },

    #[error("{type_name} failed validation: {message}")]
    SpecValidation { type_name: String, message: String },

    #[error("cannot extend '{parent}' in '{type_name}': type '{parent}' does not exist")]
    Extension { type_name: String, parent: String },

    #[error("infinite loop detected while resolving: {}", chain.join(" -> "))]
    InfiniteLoop { chain: Vec<String> },

    #[error("resolution depth limit of {limit} exceeded at '{type_name}'")]
    DepthExceeded { type_name: String, limit: usize },

    #[error("implementation of '{type_name}' broke its contract: {reason}")]
    ImplementationContract { type_name: String, reason: String },

    #[error("layout of '{type_name}' failed: {source}")]
    Layout {
        type_name: String,
        #[source]
        source: SolverError,
    },

    #[error("{type_name}: {message}")]
    Implementation { type_name: String, message: String },
}

impl BuildError {
    /// Create a spec shape error
    pub fn spec_shape(reason: impl Into<String>) -> Self {
        Self::SpecShape {
            reason: reason.into(),
        }
    }

    /// Create an implementation contract error
    pub fn contract(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImplementationContract {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an error from inside an implementation function
    pub fn implementation(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Implementation {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create a whole-spec validation error
    pub fn spec_validation(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpecValidation {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// The category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::SpecShape { .. } => ErrorKind::SpecShape,
            BuildError::UnknownType { .. } => ErrorKind::UnknownType,
            BuildError::MissingProperty { .. }
            | BuildError::PropertyType { .. }
            | BuildError::PropertyValidation { .. }
            | BuildError::SpecValidation { .. } => ErrorKind::PropertyValidation,
            BuildError::Extension { .. } => ErrorKind::Extension,
            BuildError::InfiniteLoop { .. } | BuildError::DepthExceeded { .. } => {
                ErrorKind::RecursionGuard
            }
            BuildError::ImplementationContract { .. } => ErrorKind::ImplementationContract,
            BuildError::Layout { .. } => ErrorKind::Layout,
            BuildError::Implementation { .. } => ErrorKind::Implementation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_property_message() {
        let err = BuildError::MissingProperty {
            type_name: "rect".to_string(),
            property: "x".to_string(),
        };
        assert_eq!(err.to_string(), "Required property 'x' is missing");
        assert_eq!(err.kind(), ErrorKind::PropertyValidation);
    }

    #[test]
    fn test_infinite_loop_message() {
        let err = BuildError::InfiniteLoop {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "infinite loop detected while resolving: a -> b -> a"
        );
        assert_eq!(err.kind(), ErrorKind::RecursionGuard);
    }

    #[test]
    fn test_extension_message_names_missing_parent() {
        let err = BuildError::Extension {
            type_name: "child".to_string(),
            parent: "ghost".to_string(),
        };
        assert!(err.to_string().contains("'ghost' does not exist"));
    }
}
