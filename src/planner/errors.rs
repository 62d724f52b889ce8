//! Planner error types
//!
//! Error codes:
//! - TABULA_QUERY_INVALID (REJECT)
//! - TABULA_PREDICATE_INVALID (REJECT)
//! - TABULA_UNKNOWN_FUNCTION (REJECT)
//! - TABULA_INVALID_TRANSITION (REJECT)
//!
//! Every planner error is a configuration error: the query never
//! reaches `processing`.

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed query structure
    TabulaQueryInvalid,
    /// Malformed predicate or operand
    TabulaPredicateInvalid,
    /// Function or predicate helper not registered
    TabulaUnknownFunction,
    /// Lifecycle moved backwards or skipped a state
    TabulaInvalidTransition,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::TabulaQueryInvalid => "TABULA_QUERY_INVALID",
            PlannerErrorCode::TabulaPredicateInvalid => "TABULA_PREDICATE_INVALID",
            PlannerErrorCode::TabulaUnknownFunction => "TABULA_UNKNOWN_FUNCTION",
            PlannerErrorCode::TabulaInvalidTransition => "TABULA_INVALID_TRANSITION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Column name if applicable
    column: Option<String>,
}

impl PlannerError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::TabulaQueryInvalid,
            message: reason.into(),
            column: None,
        }
    }

    /// Create a predicate invalid error
    pub fn predicate_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::TabulaPredicateInvalid,
            message: reason.into(),
            column: None,
        }
    }

    /// Create a predicate invalid error naming the column
    pub fn operand_invalid(column: impl Into<String>, reason: impl Into<String>) -> Self {
        let c = column.into();
        Self {
            code: PlannerErrorCode::TabulaPredicateInvalid,
            message: format!("Column '{}': {}", c, reason.into()),
            column: Some(c),
        }
    }

    /// Create an unknown function error
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::TabulaUnknownFunction,
            message: format!("Function '{}' is not registered", name.into()),
            column: None,
        }
    }

    /// Create an invalid lifecycle transition error
    pub fn invalid_transition(from: &str, to: &str) -> Self {
        Self {
            code: PlannerErrorCode::TabulaInvalidTransition,
            message: format!("Query cannot move from {} to {}", from, to),
            column: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
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

    /// Returns the column name if applicable
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
