//! Bounded worker pool
//!
//! Runner work is blocking I/O, so it runs on the blocking threads of a
//! dedicated tokio runtime. `max_blocking_threads` is the pool bound;
//! jobs beyond it wait in the runtime's queue.

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::observability::{log_event_with_fields, Event};

use super::errors::{ExecutorError, ExecutorResult};

pub struct WorkerPool {
    runtime: Option<Runtime>,
    size: usize,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Must not be called, or dropped, from inside an async context.
    pub fn new(size: usize, shutdown_timeout: Duration) -> ExecutorResult<Self> {
        let size = size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name("varquery-runner")
            .enable_time()
            .build()
            .map_err(|e| ExecutorError::pool_failed(e.to_string()))?;

        log_event_with_fields(Event::PoolStarted, &[("size", size.to_string().as_str())]);

        Ok(Self {
            runtime: Some(runtime),
            size,
            shutdown_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Schedules `job`; returns without waiting for it to run.
    pub fn spawn<F>(&self, job: F) -> ExecutorResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| ExecutorError::pool_failed("pool is shut down"))?;
        // The join handle is not needed: runners report through their queue.
        drop(runtime.spawn_blocking(job));
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(self.shutdown_timeout);
            log_event_with_fields(Event::PoolShutdown, &[("size", self.size.to_string().as_str())]);
        }
    }
}
