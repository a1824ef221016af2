//! # Scripted Backend
//!
//! An in-process backend that replays canned rows and failures. Used for
//! dry runs and by the engine's own tests; it records every connect,
//! close and executed query text so callers can assert on them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::connection::{BackendConnection, BackendConnector, BackendError, BackendResult, Row};

/// Behaviour of one query against the scripted backend
#[derive(Debug, Clone, Default)]
pub struct QueryScript {
    pub rows: Vec<Row>,
    /// Fail `execute_async` with this message
    pub execute_error: Option<String>,
    /// Fail the fetch after this many rows were returned
    pub fail_after: Option<(usize, String)>,
    /// `is_executing` answers true this many times
    pub executing_polls: usize,
    /// Sleep before returning each row
    pub row_delay: Duration,
}

impl QueryScript {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing_after(rows: Vec<Row>, after: usize, message: impl Into<String>) -> Self {
        Self {
            rows,
            fail_after: Some((after, message.into())),
            ..Self::default()
        }
    }

    pub fn execute_error(message: impl Into<String>) -> Self {
        Self {
            execute_error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct ScriptState {
    /// (substring of query text, script); first match wins
    scripts: Vec<(String, QueryScript)>,
    default: QueryScript,
    executed: Vec<String>,
}

#[derive(Default)]
struct Counters {
    exhausted_remaining: AtomicUsize,
    connect_attempts: AtomicUsize,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Connector handing out [`ScriptedConnection`]s
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
    counters: Arc<Counters>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script used when no registered substring matches
    pub fn with_default(self, script: QueryScript) -> Self {
        self.lock().default = script;
        self
    }

    /// Script used for queries whose text contains `needle`
    pub fn with_script(self, needle: impl Into<String>, script: QueryScript) -> Self {
        self.lock().scripts.push((needle.into(), script));
        self
    }

    /// The next `attempts` connects fail with `PoolExhausted`
    pub fn with_exhausted_pool(self, attempts: usize) -> Self {
        self.counters.exhausted_remaining.store(attempts, Ordering::SeqCst);
        self
    }

    pub fn connect_attempts(&self) -> usize {
        self.counters.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Query texts executed so far, in execution order
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn script_for(&self, query: &str) -> QueryScript {
        let mut state = self.lock();
        state.executed.push(query.to_string());
        state
            .scripts
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| state.default.clone())
    }
}

impl BackendConnector for ScriptedBackend {
    fn connect(&self) -> BackendResult<Box<dyn BackendConnection>> {
        self.counters.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let exhausted = self
            .counters
            .exhausted_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if exhausted {
            return Err(BackendError::PoolExhausted);
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            backend: self.clone(),
            rows: VecDeque::new(),
            fetched: 0,
            executing_polls: 0,
            script: None,
        }))
    }
}

/// A connection replaying one [`QueryScript`]
pub struct ScriptedConnection {
    backend: ScriptedBackend,
    rows: VecDeque<Row>,
    fetched: usize,
    executing_polls: usize,
    script: Option<QueryScript>,
}

impl BackendConnection for ScriptedConnection {
    fn execute_async(&mut self, query: &str) -> BackendResult<()> {
        let script = self.backend.script_for(query);
        if let Some(message) = &script.execute_error {
            return Err(BackendError::Execution(message.clone()));
        }
        self.rows = script.rows.iter().cloned().collect();
        self.executing_polls = script.executing_polls;
        self.script = Some(script);
        Ok(())
    }

    fn is_executing(&mut self) -> BackendResult<bool> {
        if self.executing_polls > 0 {
            self.executing_polls -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn fetch_one(&mut self) -> BackendResult<Option<Row>> {
        let Some(script) = &self.script else {
            return Err(BackendError::Fetch("no query executed".into()));
        };
        if let Some((after, message)) = &script.fail_after {
            if self.fetched >= *after {
                return Err(BackendError::Fetch(message.clone()));
            }
        }
        if !script.row_delay.is_zero() {
            thread::sleep(script.row_delay);
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.fetched += 1;
        }
        Ok(row)
    }

    fn close(&mut self) {
        self.backend.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}
