//! # Function Errors

use thiserror::Error;

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function errors
///
/// All variants are configuration errors: they are raised while a query
/// is being prepared, never while rows stream through it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Function already exists: {0}")]
    AlreadyExists(String),

    #[error("Predicate helper not found: {0}")]
    HelperNotFound(String),

    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Malformed function expression: {0}")]
    Malformed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FunctionError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FunctionError::NotFound(_) => "TABULA_FUNCTION_NOT_FOUND",
            FunctionError::AlreadyExists(_) => "TABULA_FUNCTION_EXISTS",
            FunctionError::HelperNotFound(_) => "TABULA_HELPER_NOT_FOUND",
            FunctionError::InvalidArguments { .. } => "TABULA_FUNCTION_ARGS",
            FunctionError::Malformed(_) => "TABULA_FUNCTION_MALFORMED",
            FunctionError::Internal(_) => "TABULA_FUNCTION_INTERNAL",
        }
    }

    pub(crate) fn invalid_args(name: &str, reason: impl Into<String>) -> Self {
        FunctionError::InvalidArguments {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
