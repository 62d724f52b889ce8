//! Executor error types
//!
//! Error codes:
//! - TABULA_ADAPTER_FAILED (ABORT)
//! - TABULA_FUNCTION_FAILED (ABORT)
//! - TABULA_EXECUTION_FAILED (ABORT)
//!
//! Every executor error abandons the query: rows accumulated so far are
//! discarded and the descriptor never reaches `complete`.

use std::fmt;

use crate::adapter::AdapterError;
use crate::functions::FunctionError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// In-flight query abandoned
    Abort,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Abort => write!(f, "ABORT"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// The adapter reported a failure
    TabulaAdapterFailed,
    /// A scalar function or predicate helper failed on a row
    TabulaFunctionFailed,
    /// Any other failure while rows stream through the pipeline
    TabulaExecutionFailed,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::TabulaAdapterFailed => "TABULA_ADAPTER_FAILED",
            ExecutorErrorCode::TabulaFunctionFailed => "TABULA_FUNCTION_FAILED",
            ExecutorErrorCode::TabulaExecutionFailed => "TABULA_EXECUTION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Abort
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
    /// Originating adapter error, forwarded unchanged
    adapter: Option<AdapterError>,
}

impl ExecutorError {
    /// Wraps an adapter failure
    pub fn adapter_failed(err: AdapterError) -> Self {
        Self {
            code: ExecutorErrorCode::TabulaAdapterFailed,
            message: err.to_string(),
            adapter: Some(err),
        }
    }

    /// A function or helper failed on a row
    pub fn function_failed(err: FunctionError) -> Self {
        Self {
            code: ExecutorErrorCode::TabulaFunctionFailed,
            message: err.to_string(),
            adapter: None,
        }
    }

    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::TabulaExecutionFailed,
            message: reason.into(),
            adapter: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The adapter error behind this failure, if any
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        self.adapter.as_ref()
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.adapter.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<AdapterError> for ExecutorError {
    fn from(err: AdapterError) -> Self {
        ExecutorError::adapter_failed(err)
    }
}

impl From<FunctionError> for ExecutorError {
    fn from(err: FunctionError) -> Self {
        ExecutorError::function_failed(err)
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
