//! Top-level error type of a database instance
//!
//! Every subsystem error converts into [`DbError`]. Callers that only care
//! about how to react use [`DbError::category`].

use thiserror::Error;

use crate::adapter::AdapterError;
use crate::config::ConfigError;
use crate::events::EventError;
use crate::executor::{ExecutorError, ExecutorErrorCode};
use crate::functions::FunctionError;
use crate::planner::PlannerError;
use crate::schema::{SchemaError, SchemaErrorCode};

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// How a failure should be handled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before dispatch; the query never reached `processing`
    Configuration,
    /// Storage failed mid-query; the query was abandoned
    Adapter,
    /// A write could not be completed without breaking a table invariant
    Integrity,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Adapter => "adapter",
            ErrorCategory::Integrity => "integrity",
        }
    }
}

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Database not connected")]
    NotConnected,

    #[error("Database already connected")]
    AlreadyConnected,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Schema(e) => e.code().code(),
            DbError::Planner(e) => e.code().code(),
            DbError::Function(e) => e.code(),
            DbError::Adapter(e) => e.code(),
            DbError::Executor(e) => match e.adapter_error() {
                Some(inner) => inner.code(),
                None => e.code().code(),
            },
            DbError::Config(e) => e.code(),
            DbError::Event(e) => e.code(),
            DbError::NotConnected => "TABULA_NOT_CONNECTED",
            DbError::AlreadyConnected => "TABULA_ALREADY_CONNECTED",
            DbError::Internal(_) => "TABULA_INTERNAL",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DbError::Schema(e) if e.code() == SchemaErrorCode::TabulaPrimaryKeyUnresolved => {
                ErrorCategory::Integrity
            }
            DbError::Adapter(_) | DbError::Internal(_) => ErrorCategory::Adapter,
            DbError::Executor(e) if e.code() == ExecutorErrorCode::TabulaAdapterFailed => ErrorCategory::Adapter,
            _ => ErrorCategory::Configuration,
        }
    }

    /// The adapter failure behind this error, if any
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        match self {
            DbError::Adapter(e) => Some(e),
            DbError::Executor(e) => e.adapter_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err: DbError = SchemaError::primary_key_unresolved("users").into();
        assert_eq!(err.category(), ErrorCategory::Integrity);

        let err: DbError = SchemaError::unknown_table("ghosts").into();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err: DbError = AdapterError::Storage("disk gone".into()).into();
        assert_eq!(err.category(), ErrorCategory::Adapter);

        let err: DbError = ExecutorError::from(AdapterError::Injected("read".into())).into();
        assert_eq!(err.category(), ErrorCategory::Adapter);
        assert_eq!(err.code(), "TABULA_ADAPTER_INJECTED");
    }

    #[test]
    fn test_planner_error_is_configuration() {
        let err: DbError = PlannerError::query_invalid("bad").into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.code(), "TABULA_QUERY_INVALID");
    }
}
