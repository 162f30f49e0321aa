//! Construction errors
//!
//! Every error is a defect in the caller's query-construction code; nothing
//! here is transient and nothing is retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Required argument missing: {argument}")]
    NullArgument { argument: String },

    #[error("Invalid argument {argument}: {message}")]
    InvalidShape { argument: String, message: String },

    #[error("Type mismatch for {argument}: {message}")]
    TypeMismatch { argument: String, message: String },

    #[error("Duplicate name '{name}' in {context}")]
    NameConflict { name: String, context: String },

    #[error("Arity mismatch for {context}: expected {expected}, got {actual}")]
    ArityMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Selector result of type {type_name} cannot be converted to an expression")]
    NotSupported { type_name: String },

    #[error("Ambiguous function call: {name}")]
    AmbiguousFunction { name: String },

    #[error("Function not found: {name}({arguments})")]
    FunctionNotFound { name: String, arguments: String },
}

impl BuildError {
    pub fn null_argument(argument: impl Into<String>) -> Self {
        BuildError::NullArgument {
            argument: argument.into(),
        }
    }

    pub fn invalid_shape(argument: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::InvalidShape {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(argument: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::TypeMismatch {
            argument: argument.into(),
            message: message.into(),
        }
    }

    pub fn name_conflict(name: impl Into<String>, context: impl Into<String>) -> Self {
        BuildError::NameConflict {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn arity_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        BuildError::ArityMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}
