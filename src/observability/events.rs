//! Observable engine events
//!
//! Events are explicit and typed. Each carries the severity it is
//! logged at.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Submit
    /// Logical query accepted and runners created
    QuerySubmitted,
    /// Predicate construction failed inside Submit
    QueryRejected,

    // Runner lifecycle
    /// Runner scheduled on the pool
    RunnerStarted,
    /// Backend pool exhausted, retrying
    RunnerConnectRetry,
    /// Backend connection acquired
    RunnerConnected,
    /// Runner observed Closed at a checkpoint
    RunnerCancelled,
    /// Runner enqueued a terminal error
    RunnerFailed,
    /// Runner marked Done
    RunnerDone,

    // Result lifecycle
    /// All runners of a result started
    ResultStarted,
    /// Consumer reached the row limit
    ResultLimitReached,
    /// Result closed and drained
    ResultClosed,
    /// A runner failed to close; shutdown continued
    ResultCloseRunnerFailed,

    // Pool
    PoolStarted,
    PoolShutdown,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QuerySubmitted => "QUERY_SUBMITTED",
            Event::QueryRejected => "QUERY_REJECTED",

            Event::RunnerStarted => "RUNNER_STARTED",
            Event::RunnerConnectRetry => "RUNNER_CONNECT_RETRY",
            Event::RunnerConnected => "RUNNER_CONNECTED",
            Event::RunnerCancelled => "RUNNER_CANCELLED",
            Event::RunnerFailed => "RUNNER_FAILED",
            Event::RunnerDone => "RUNNER_DONE",

            Event::ResultStarted => "RESULT_STARTED",
            Event::ResultLimitReached => "RESULT_LIMIT_REACHED",
            Event::ResultClosed => "RESULT_CLOSED",
            Event::ResultCloseRunnerFailed => "RESULT_CLOSE_RUNNER_FAILED",

            Event::PoolStarted => "POOL_STARTED",
            Event::PoolShutdown => "POOL_SHUTDOWN",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RunnerConnectRetry => Severity::Trace,
            Event::QueryRejected | Event::ResultCloseRunnerFailed => Severity::Warn,
            Event::RunnerFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
