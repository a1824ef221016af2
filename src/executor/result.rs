//! Query result stream
//!
//! Presents the runners of one logical query as a single lazy iterator
//! over their shared queue. Records from different runners interleave
//! freely; each runner's own records keep their source order.
//!
//! The caller closes the result exactly once, also on early exit.
//! `close` drains the queue, which unblocks runners stuck on a full
//! queue and surfaces any error the caller never pulled.

use std::iter::FusedIterator;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::variant::VariantRecord;

use super::errors::{ExecutorError, ExecutorResult};
use super::pool::WorkerPool;
use super::queue::{Poll, QueueItem, ResultQueue};
use super::runner::QueryRunner;

/// Consumer-side timing and sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSettings {
    pub queue_capacity: usize,
    pub consumer_poll_timeout: Duration,
    /// Pause after starting the runners, before the first pull
    pub start_grace: Duration,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            consumer_poll_timeout: Duration::from_millis(100),
            start_grace: Duration::from_millis(10),
        }
    }
}

pub struct QueryResult {
    id: String,
    runners: Vec<Arc<QueryRunner>>,
    queue: ResultQueue,
    pool: Arc<WorkerPool>,
    settings: ResultSettings,
    /// `None` is unlimited
    limit: Option<u64>,
    yielded: u64,
    started: bool,
    /// Iteration ended: limit, error, or every runner done
    finished: bool,
    closed: bool,
    metrics: Arc<MetricsRegistry>,
}

impl QueryResult {
    /// Binds a fresh queue to every runner.
    ///
    /// Fails with `VQ_ALREADY_BOUND` if a runner already belongs to
    /// another result.
    pub fn new(
        id: impl Into<String>,
        runners: Vec<Arc<QueryRunner>>,
        pool: Arc<WorkerPool>,
        settings: ResultSettings,
        limit: Option<u64>,
        metrics: Arc<MetricsRegistry>,
    ) -> ExecutorResult<Self> {
        // Nothing is bound unless every runner is free.
        if let Some(taken) = runners.iter().find(|r| r.is_bound()) {
            return Err(ExecutorError::already_bound(taken.id()));
        }
        let queue = ResultQueue::new(settings.queue_capacity);
        for runner in &runners {
            runner.set_result_queue(queue.sender())?;
        }

        Ok(Self {
            id: id.into(),
            runners,
            queue,
            pool,
            settings,
            limit,
            yielded: 0,
            started: false,
            finished: false,
            closed: false,
            metrics,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn runners(&self) -> &[Arc<QueryRunner>] {
        &self.runners
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Records handed to the caller so far
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Items currently buffered in the queue
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn all_runners_done(&self) -> bool {
        self.runners.iter().all(|r| r.is_done())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Start every runner on the pool. Called implicitly by the first
    /// `next`; starting twice is a no-op.
    pub fn start(&mut self) -> ExecutorResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        for runner in &self.runners {
            runner.start(&self.pool)?;
        }
        log_event_with_fields(
            Event::ResultStarted,
            &[
                ("query", self.id.as_str()),
                ("runners", self.runners.len().to_string().as_str()),
            ],
        );

        if !self.settings.start_grace.is_zero() {
            thread::sleep(self.settings.start_grace);
        }
        Ok(())
    }

    /// Close every runner and drain the queue.
    ///
    /// Returns the first error found in the queue. A runner that fails to
    /// close is logged and skipped so its siblings still shut down. The
    /// second call is a no-op.
    pub fn close(&mut self) -> ExecutorResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.finished = true;

        for runner in &self.runners {
            if let Err(err) = runner.close() {
                log_event_with_fields(
                    Event::ResultCloseRunnerFailed,
                    &[
                        ("query", self.id.as_str()),
                        ("runner", runner.id()),
                        ("error", err.message()),
                    ],
                );
            }
        }

        let mut first_error = None;
        let mut discarded: u64 = 0;
        loop {
            match self.queue.poll(self.settings.consumer_poll_timeout) {
                Poll::Item(item) => {
                    discarded += 1;
                    self.keep_first_error(item, &mut first_error);
                }
                Poll::Empty => {
                    if self.started_runners_done() {
                        break;
                    }
                }
            }
        }
        while let Some(item) = self.queue.try_pop() {
            discarded += 1;
            self.keep_first_error(item, &mut first_error);
        }

        let discarded = discarded.to_string();
        let mut fields = vec![("query", self.id.as_str()), ("discarded", discarded.as_str())];
        if let Some(err) = &first_error {
            fields.push(("error", err.message()));
        }
        log_event_with_fields(Event::ResultClosed, &fields);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn keep_first_error(&self, item: QueueItem, first_error: &mut Option<ExecutorError>) {
        if let Err(err) = item {
            self.metrics.increment_errors_on_close();
            first_error.get_or_insert(err);
        }
    }

    /// Runners never started have nothing left to push
    fn started_runners_done(&self) -> bool {
        self.runners.iter().all(|r| !r.is_started() || r.is_done())
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }

    fn accept(&mut self, item: QueueItem) -> QueueItem {
        match item {
            Ok(record) => {
                self.yielded += 1;
                self.metrics.increment_records_yielded();
                Ok(record)
            }
            Err(err) => {
                self.finished = true;
                Err(err)
            }
        }
    }
}

impl Iterator for QueryResult {
    type Item = Result<VariantRecord, ExecutorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.limit_reached() {
            self.finished = true;
            log_event_with_fields(
                Event::ResultLimitReached,
                &[
                    ("query", self.id.as_str()),
                    ("yielded", self.yielded.to_string().as_str()),
                ],
            );
            return None;
        }
        if let Err(err) = self.start() {
            self.finished = true;
            return Some(Err(err));
        }
        if self.runners.is_empty() {
            self.finished = true;
            return None;
        }

        loop {
            match self.queue.poll(self.settings.consumer_poll_timeout) {
                Poll::Item(item) => return Some(self.accept(item)),
                Poll::Empty => {
                    if !self.all_runners_done() {
                        continue;
                    }
                    // Done is set after a runner's last push, so anything
                    // pushed is visible now.
                    return match self.queue.try_pop() {
                        Some(item) => Some(self.accept(item)),
                        None => {
                            self.finished = true;
                            None
                        }
                    };
                }
            }
        }
    }
}

impl FusedIterator for QueryResult {}

impl Drop for QueryResult {
    fn drop(&mut self) {
        // Errors are already logged by close.
        let _ = self.close();
    }
}
