//! Planner error types
//!
//! Error codes:
//! - VQ_QUERY_INVALID (REJECT)
//! - VQ_QUERY_UNSUPPORTED (REJECT)
//! - VQ_UNKNOWN_COLUMN (REJECT)
//!
//! Every planner error is raised synchronously from `QueryBuilder::build`,
//! before any runner is created.

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
    /// Malformed predicate value (unparsable region, inverted range, ...)
    VqQueryInvalid,
    /// Predicate combination the builder cannot lower
    VqQueryUnsupported,
    /// Range predicate on a column the schema lacks or cannot compare
    VqUnknownColumn,
}

impl PlannerErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::VqQueryInvalid => "VQ_QUERY_INVALID",
            PlannerErrorCode::VqQueryUnsupported => "VQ_QUERY_UNSUPPORTED",
            PlannerErrorCode::VqUnknownColumn => "VQ_UNKNOWN_COLUMN",
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
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Predicate kind that caused the rejection, if any
    predicate: Option<&'static str>,
}

impl PlannerError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::VqQueryInvalid,
            message: reason.into(),
            predicate: None,
        }
    }

    /// Create a query invalid error attributed to one predicate kind
    pub fn invalid_predicate(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::VqQueryInvalid,
            message: format!("{}: {}", kind, reason.into()),
            predicate: Some(kind),
        }
    }

    /// Create an unsupported combination error
    pub fn unsupported(kind: &'static str, reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::VqQueryUnsupported,
            message: format!("{}: {}", kind, reason.into()),
            predicate: Some(kind),
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(table: &str, column: &str) -> Self {
        Self {
            code: PlannerErrorCode::VqUnknownColumn,
            message: format!("Column '{}' is not a numeric column of '{}'", column, table),
            predicate: Some("real_attr_range"),
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

    /// Returns the offending predicate kind, if known
    pub fn predicate(&self) -> Option<&'static str> {
        self.predicate
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
