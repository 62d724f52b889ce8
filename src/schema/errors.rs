//! Schema error types
//!
//! Error codes:
//! - TABULA_MODEL_INVALID (REJECT)
//! - TABULA_UNKNOWN_TABLE (REJECT)
//! - TABULA_PRIMARY_KEY_UNRESOLVED (INTEGRITY)
//! - TABULA_MODEL_LOAD_FAILED (REJECT)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected before it reaches an adapter
    Reject,
    /// A row could not be made consistent with the model
    Integrity,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Integrity => write!(f, "INTEGRITY"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Data model violates a structural rule
    TabulaModelInvalid,
    /// Table not registered on this instance
    TabulaUnknownTable,
    /// Write has no primary key and none can be generated
    TabulaPrimaryKeyUnresolved,
    /// Model file unreadable or malformed
    TabulaModelLoadFailed,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::TabulaModelInvalid => "TABULA_MODEL_INVALID",
            SchemaErrorCode::TabulaUnknownTable => "TABULA_UNKNOWN_TABLE",
            SchemaErrorCode::TabulaPrimaryKeyUnresolved => "TABULA_PRIMARY_KEY_UNRESOLVED",
            SchemaErrorCode::TabulaModelLoadFailed => "TABULA_MODEL_LOAD_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::TabulaPrimaryKeyUnresolved => Severity::Integrity,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Table name if applicable
    table: Option<String>,
    /// Column key if applicable
    column: Option<String>,
}

impl SchemaError {
    /// Create an invalid model error
    pub fn invalid_model(table: impl Into<String>, reason: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::TabulaModelInvalid,
            message: format!("Invalid data model for '{}': {}", table, reason.into()),
            table: Some(table),
            column: None,
        }
    }

    /// Create an invalid column error
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let column = column.into();
        Self {
            code: SchemaErrorCode::TabulaModelInvalid,
            message: format!("Invalid column '{}.{}': {}", table, column, reason.into()),
            table: Some(table),
            column: Some(column),
        }
    }

    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::TabulaUnknownTable,
            message: format!("Table '{}' is not registered", table),
            table: Some(table),
            column: None,
        }
    }

    /// Create a primary key unresolved error
    pub fn primary_key_unresolved(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: SchemaErrorCode::TabulaPrimaryKeyUnresolved,
            message: format!(
                "Row for '{}' has no primary key and the table cannot generate one",
                table
            ),
            table: Some(table),
            column: None,
        }
    }

    /// Create a model load failure
    pub fn load_failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::TabulaModelLoadFailed,
            message: format!("Failed to load model from {}: {}", source.into(), reason.into()),
            table: None,
            column: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
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

    /// Returns the table name if applicable
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the column key if applicable
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
