//! Executor error types
//!
//! Error codes:
//! - VQ_ALREADY_BOUND (CONTRACT)
//! - VQ_RUNNER_UNBOUND (CONTRACT)
//! - VQ_BACKEND_FAILED (ERROR)
//! - VQ_DESERIALIZE_FAILED (ERROR)
//! - VQ_RUNNER_PANICKED (ERROR)
//! - VQ_CONNECT_TIMEOUT (ERROR)
//! - VQ_POOL_FAILED (ERROR)
//! - VQ_STATE_POISONED (ERROR)
//! - VQ_QUERY_REJECTED (REJECT)
//!
//! Runner-side errors travel through the result queue, so the type is
//! `Clone` and carries its source as text.

use std::fmt;

use crate::backend::BackendError;
use crate::planner::PlannerError;
use crate::variant::VariantError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Ownership contract violated by the caller; never retried
    Contract,
    /// Request rejected before any runner existed
    Reject,
    /// Runtime failure of one logical query
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Contract => write!(f, "CONTRACT"),
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// A queue is already bound to the runner
    VqAlreadyBound,
    /// Start called before a queue was bound
    VqRunnerUnbound,
    /// Backend connect, execute or fetch failed
    VqBackendFailed,
    /// Row deserializer failed
    VqDeserializeFailed,
    /// Runner work panicked
    VqRunnerPanicked,
    /// Connection acquisition exceeded the configured bound
    VqConnectTimeout,
    /// Worker pool could not be built
    VqPoolFailed,
    /// A runner state lock was poisoned
    VqStatePoisoned,
    /// Predicate construction failed inside Submit
    VqQueryRejected,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::VqAlreadyBound => "VQ_ALREADY_BOUND",
            ExecutorErrorCode::VqRunnerUnbound => "VQ_RUNNER_UNBOUND",
            ExecutorErrorCode::VqBackendFailed => "VQ_BACKEND_FAILED",
            ExecutorErrorCode::VqDeserializeFailed => "VQ_DESERIALIZE_FAILED",
            ExecutorErrorCode::VqRunnerPanicked => "VQ_RUNNER_PANICKED",
            ExecutorErrorCode::VqConnectTimeout => "VQ_CONNECT_TIMEOUT",
            ExecutorErrorCode::VqPoolFailed => "VQ_POOL_FAILED",
            ExecutorErrorCode::VqStatePoisoned => "VQ_STATE_POISONED",
            ExecutorErrorCode::VqQueryRejected => "VQ_QUERY_REJECTED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::VqAlreadyBound | ExecutorErrorCode::VqRunnerUnbound => {
                Severity::Contract
            }
            ExecutorErrorCode::VqQueryRejected => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Partition the failing runner was reading, if any
    partition: Option<String>,
    /// Backend failure this error wraps
    backend: Option<BackendError>,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            partition: None,
            backend: None,
        }
    }

    pub fn already_bound(runner: &str) -> Self {
        Self::new(
            ExecutorErrorCode::VqAlreadyBound,
            format!("runner {} already has a result queue", runner),
        )
    }

    pub fn runner_unbound(runner: &str) -> Self {
        Self::new(
            ExecutorErrorCode::VqRunnerUnbound,
            format!("runner {} started without a result queue", runner),
        )
    }

    pub fn backend(err: BackendError) -> Self {
        let mut e = Self::new(ExecutorErrorCode::VqBackendFailed, err.to_string());
        e.backend = Some(err);
        e
    }

    pub fn deserialize(err: VariantError) -> Self {
        Self::new(ExecutorErrorCode::VqDeserializeFailed, err.to_string())
    }

    pub fn runner_panicked(detail: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::VqRunnerPanicked, detail)
    }

    pub fn connect_timeout(waited_ms: u64) -> Self {
        Self::new(
            ExecutorErrorCode::VqConnectTimeout,
            format!("no backend connection after {} ms", waited_ms),
        )
    }

    pub fn pool_failed(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::VqPoolFailed, reason)
    }

    pub fn state_poisoned(runner: &str) -> Self {
        Self::new(
            ExecutorErrorCode::VqStatePoisoned,
            format!("state lock of runner {} is poisoned", runner),
        )
    }

    pub fn query_rejected(err: &PlannerError) -> Self {
        Self::new(ExecutorErrorCode::VqQueryRejected, err.to_string())
    }

    /// Attribute the error to a partition
    pub fn in_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// The wrapped backend failure, for `VQ_BACKEND_FAILED`
    pub fn backend_error(&self) -> Option<&BackendError> {
        self.backend.as_ref()
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)?;
        if let Some(ref partition) = self.partition {
            write!(f, " (partition {})", partition)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.backend
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExecutorErrorCode::VqAlreadyBound.code(), "VQ_ALREADY_BOUND");
        assert_eq!(ExecutorErrorCode::VqRunnerUnbound.code(), "VQ_RUNNER_UNBOUND");
        assert_eq!(ExecutorErrorCode::VqBackendFailed.code(), "VQ_BACKEND_FAILED");
        assert_eq!(ExecutorErrorCode::VqRunnerPanicked.code(), "VQ_RUNNER_PANICKED");
        assert_eq!(ExecutorErrorCode::VqQueryRejected.code(), "VQ_QUERY_REJECTED");
    }

    #[test]
    fn test_contract_violations() {
        assert_eq!(ExecutorError::already_bound("r0").severity(), Severity::Contract);
        assert_eq!(ExecutorError::runner_unbound("r0").severity(), Severity::Contract);
        assert_eq!(ExecutorError::pool_failed("x").severity(), Severity::Error);
    }

    #[test]
    fn test_backend_error_kept() {
        let err = ExecutorError::backend(BackendError::Execution("syntax error".into()))
            .in_partition("chr1_0");
        assert_eq!(err.code(), ExecutorErrorCode::VqBackendFailed);
        assert_eq!(
            err.backend_error(),
            Some(&BackendError::Execution("syntax error".into()))
        );
        assert!(std::error::Error::source(&err).is_some());

        let display = err.to_string();
        assert!(display.starts_with("[ERROR] VQ_BACKEND_FAILED:"));
        assert!(display.contains("syntax error"));
        assert!(display.ends_with("(partition chr1_0)"));
    }

    #[test]
    fn test_query_rejected_carries_planner_message() {
        let planner = PlannerError::query_invalid("bad region");
        let err = ExecutorError::query_rejected(&planner);
        assert_eq!(err.severity(), Severity::Reject);
        assert!(err.message().contains("VQ_QUERY_INVALID"));
        assert!(err.message().contains("bad region"));
    }
}
