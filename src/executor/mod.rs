//! Query execution
//!
//! # Flow
//!
//! 1. `QueryExecutor::submit` builds one query per partition
//! 2. One `QueryRunner` per query, all bound to one `ResultQueue`
//! 3. `QueryResult` starts the runners on the `WorkerPool` and merges
//!    their output into one iterator
//! 4. `QueryResult::close` cancels the runners and drains the queue
//!
//! # Invariants
//!
//! - A runner is bound to exactly one queue
//! - Every runner error reaches the caller through the queue, on `next`
//!   or on `close`
//! - A runner sets `Done` exactly once, on every exit path
//! - No ordering across runners; source order within one runner

mod errors;
#[allow(clippy::module_inception)]
mod executor;
mod pool;
mod queue;
mod result;
mod runner;
mod state;

pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::QueryExecutor;
pub use pool::WorkerPool;
pub use queue::{Poll, QueueItem, QueueSender, ResultQueue};
pub use result::{QueryResult, ResultSettings};
pub use runner::{QueryRunner, RunnerContext, RunnerSettings};
pub use state::{RunnerState, StateFlags};
