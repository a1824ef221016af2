//! Query runner
//!
//! Owns one executing query against one backend connection. Rows are
//! decoded and pushed onto the result queue the runner is bound to.
//!
//! Cancellation is cooperative. `Closed` is observed only at these
//! checkpoints:
//!
//! 1. before connecting
//! 2. after each "pool exhausted" retry sleep
//! 3. after each execution poll
//! 4. after each row
//!
//! Whatever happens inside `run`, the connection is released and `Done`
//! is set exactly once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::{BackendConnection, BackendConnector, ConnectionGuard};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::BuiltQuery;
use crate::variant::RowDeserializer;

use super::errors::{ExecutorError, ExecutorResult};
use super::pool::WorkerPool;
use super::queue::QueueSender;
use super::state::{RunnerState, StateFlags};

/// Checkpoint timing for runners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub connection_retry_interval: Duration,
    pub execution_poll_interval: Duration,
    /// `None` retries an exhausted pool until success or close
    pub connect_timeout: Option<Duration>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            connection_retry_interval: Duration::from_millis(100),
            execution_poll_interval: Duration::from_millis(50),
            connect_timeout: None,
        }
    }
}

/// Collaborators shared by every runner of one logical query
#[derive(Clone)]
pub struct RunnerContext {
    pub connector: Arc<dyn BackendConnector>,
    pub deserializer: Arc<dyn RowDeserializer>,
    pub settings: RunnerSettings,
    pub metrics: Arc<MetricsRegistry>,
}

pub struct QueryRunner {
    id: String,
    partition: Option<String>,
    sql: String,
    context: RunnerContext,
    state: RunnerState,
    queue: OnceLock<QueueSender>,
}

/// Sets `Done` when `run` unwinds or returns
struct DoneGuard<'a> {
    runner: &'a QueryRunner,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        if self.runner.state.mark_done() {
            log_event_with_fields(Event::RunnerDone, &[("runner", self.runner.id.as_str())]);
        }
    }
}

impl QueryRunner {
    pub fn new(id: impl Into<String>, query: BuiltQuery, context: RunnerContext) -> Self {
        Self {
            id: id.into(),
            partition: query.partition,
            sql: query.sql,
            context,
            state: RunnerState::new(),
            queue: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind the result queue. A runner is bound exactly once.
    pub fn set_result_queue(&self, queue: QueueSender) -> ExecutorResult<()> {
        self.queue
            .set(queue)
            .map_err(|_| ExecutorError::already_bound(&self.id))
    }

    pub fn is_bound(&self) -> bool {
        self.queue.get().is_some()
    }

    /// Schedule `run` on the pool and return. Starting twice is a no-op.
    pub fn start(self: &Arc<Self>, pool: &WorkerPool) -> ExecutorResult<()> {
        if !self.is_bound() {
            return Err(ExecutorError::runner_unbound(&self.id));
        }
        if self.state.is_started() {
            return Ok(());
        }

        self.state.mark_started();
        let runner = Arc::clone(self);
        if let Err(err) = pool.spawn(move || runner.run()) {
            self.state.mark_done();
            return Err(err);
        }

        self.context.metrics.increment_runners_started();
        log_event_with_fields(
            Event::RunnerStarted,
            &[("runner", self.id.as_str()), ("partition", self.partition_label())],
        );
        Ok(())
    }

    /// Request cancellation. Work past its last checkpoint finishes that
    /// step first.
    pub fn close(&self) -> ExecutorResult<()> {
        if self.state.close() {
            Ok(())
        } else {
            Err(ExecutorError::state_poisoned(&self.id))
        }
    }

    pub fn is_started(&self) -> bool {
        self.state.is_started()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn flags(&self) -> StateFlags {
        self.state.flags()
    }

    /// Runner body, executed on a pool thread.
    ///
    /// Errors and panics become a terminal queue item; nothing escapes.
    pub fn run(&self) {
        let _done = DoneGuard { runner: self };

        let Some(queue) = self.queue.get() else {
            return;
        };
        if self.cancelled() {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(queue)));
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => ExecutorError::runner_panicked(panic_message(payload.as_ref())),
        };
        let failure = match &self.partition {
            Some(partition) => failure.in_partition(partition.clone()),
            None => failure,
        };

        self.context.metrics.increment_runners_failed();
        log_event_with_fields(
            Event::RunnerFailed,
            &[
                ("runner", self.id.as_str()),
                ("code", failure.code().code()),
                ("error", failure.message()),
            ],
        );
        // A gone consumer has nothing left to report to.
        queue.push(Err(failure));
    }

    fn execute(&self, queue: &QueueSender) -> ExecutorResult<()> {
        let Some(connection) = self.connect()? else {
            return Ok(());
        };
        let mut connection = ConnectionGuard::new(connection);
        log_event_with_fields(Event::RunnerConnected, &[("runner", self.id.as_str())]);

        connection
            .execute_async(&self.sql)
            .map_err(ExecutorError::backend)?;

        while connection.is_executing().map_err(ExecutorError::backend)? {
            if self.cancelled() {
                return Ok(());
            }
            thread::sleep(self.context.settings.execution_poll_interval);
        }
        if self.cancelled() {
            return Ok(());
        }

        let metrics = &self.context.metrics;
        while let Some(row) = connection.fetch_one().map_err(ExecutorError::backend)? {
            metrics.increment_rows_fetched();
            match self
                .context
                .deserializer
                .deserialize(row)
                .map_err(ExecutorError::deserialize)?
            {
                Some(record) => {
                    if !queue.push(Ok(record)) {
                        return Ok(());
                    }
                    metrics.increment_records_enqueued();
                }
                None => metrics.increment_rows_dropped(),
            }
            if self.cancelled() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// `Ok(None)` when closed while waiting for a connection
    fn connect(&self) -> ExecutorResult<Option<Box<dyn BackendConnection>>> {
        let settings = &self.context.settings;
        let began = Instant::now();
        let mut attempt: u64 = 0;

        loop {
            match self.context.connector.connect() {
                Ok(connection) => return Ok(Some(connection)),
                Err(err) if err.is_transient() => {
                    if let Some(limit) = settings.connect_timeout {
                        if began.elapsed() >= limit {
                            return Err(ExecutorError::connect_timeout(limit.as_millis() as u64));
                        }
                    }
                    attempt += 1;
                    self.context.metrics.increment_connection_retries();
                    log_event_with_fields(
                        Event::RunnerConnectRetry,
                        &[("runner", self.id.as_str()), ("attempt", attempt.to_string().as_str())],
                    );
                    thread::sleep(settings.connection_retry_interval);
                    if self.cancelled() {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(ExecutorError::backend(err)),
            }
        }
    }

    /// Checkpoint: true once `Closed` is set
    fn cancelled(&self) -> bool {
        if !self.state.is_closed() {
            return false;
        }
        self.context.metrics.increment_runners_cancelled();
        log_event_with_fields(Event::RunnerCancelled, &[("runner", self.id.as_str())]);
        true
    }

    fn partition_label(&self) -> &str {
        self.partition.as_deref().unwrap_or("*")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "runner panicked".to_string()
    }
}
