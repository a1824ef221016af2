//! Engine counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Lock-free; Relaxed ordering is enough for counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by an executor and everything it spawns
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_submitted: AtomicU64,
    queries_rejected: AtomicU64,
    runners_started: AtomicU64,
    runners_cancelled: AtomicU64,
    runners_failed: AtomicU64,
    connection_retries: AtomicU64,
    rows_fetched: AtomicU64,
    rows_dropped: AtomicU64,
    records_enqueued: AtomicU64,
    records_yielded: AtomicU64,
    errors_on_close: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Submit

    pub fn increment_queries_submitted(&self) {
        self.queries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    // Runners

    pub fn increment_runners_started(&self) {
        self.runners_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runners_cancelled(&self) {
        self.runners_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runners_failed(&self) {
        self.runners_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_connection_retries(&self) {
        self.connection_retries.fetch_add(1, Ordering::Relaxed);
    }

    // Rows

    pub fn increment_rows_fetched(&self) {
        self.rows_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Rows the deserializer turned into a drop signal
    pub fn increment_rows_dropped(&self) {
        self.rows_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_enqueued(&self) {
        self.records_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_yielded(&self) {
        self.records_yielded.fetch_add(1, Ordering::Relaxed);
    }

    /// Buffered errors discovered while draining on close
    pub fn increment_errors_on_close(&self) {
        self.errors_on_close.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_submitted: self.queries_submitted.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            runners_started: self.runners_started.load(Ordering::Relaxed),
            runners_cancelled: self.runners_cancelled.load(Ordering::Relaxed),
            runners_failed: self.runners_failed.load(Ordering::Relaxed),
            connection_retries: self.connection_retries.load(Ordering::Relaxed),
            rows_fetched: self.rows_fetched.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            records_yielded: self.records_yielded.load(Ordering::Relaxed),
            errors_on_close: self.errors_on_close.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_submitted: u64,
    pub queries_rejected: u64,
    pub runners_started: u64,
    pub runners_cancelled: u64,
    pub runners_failed: u64,
    pub connection_retries: u64,
    pub rows_fetched: u64,
    pub rows_dropped: u64,
    pub records_enqueued: u64,
    pub records_yielded: u64,
    pub errors_on_close: u64,
}
