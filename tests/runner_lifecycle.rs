//! Runner lifecycle on a real worker pool: binding, start, cancellation
//! at each checkpoint and error delivery.

mod common;

use std::time::Duration;

use common::{runner, summary_row, wait_for};
use varquery::backend::{QueryScript, ScriptedBackend};
use varquery::executor::{ExecutorErrorCode, Poll, ResultQueue, WorkerPool};

const WAIT: Duration = Duration::from_secs(5);

fn pool() -> WorkerPool {
    WorkerPool::new(2, Duration::from_secs(1)).unwrap()
}

fn drain(queue: &ResultQueue) -> Vec<Result<i64, ExecutorErrorCode>> {
    let mut out = Vec::new();
    while let Poll::Item(item) = queue.poll(Duration::from_millis(50)) {
        out.push(item.map(|r| r.summary().summary_index).map_err(|e| e.code()));
    }
    out
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn test_start_requires_bound_queue() {
    let backend = ScriptedBackend::new();
    let pool = pool();
    let runner = runner(&backend, "r/0", "SELECT 1");

    let err = runner.start(&pool).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::VqRunnerUnbound);
    assert!(!runner.is_started());
}

#[test]
fn test_second_bind_rejected() {
    let backend = ScriptedBackend::new();
    let first = ResultQueue::new(4);
    let second = ResultQueue::new(4);
    let runner = runner(&backend, "r/0", "SELECT 1");

    runner.set_result_queue(first.sender()).unwrap();
    let err = runner.set_result_queue(second.sender()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::VqAlreadyBound);
    assert!(runner.is_bound());
}

// =============================================================================
// Normal run
// =============================================================================

#[test]
fn test_started_runner_delivers_rows_and_finishes() {
    let backend = ScriptedBackend::new()
        .with_default(QueryScript::rows((1..=3).map(summary_row).collect()));
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();
    // Starting again is a no-op.
    runner.start(&pool).unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert_eq!(drain(&queue), vec![Ok(1), Ok(2), Ok(3)]);
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.closes(), 1);
    assert_eq!(backend.executed(), vec!["SELECT 1".to_string()]);
}

#[test]
fn test_fetch_error_after_two_rows() {
    let rows = (1..=5).map(summary_row).collect();
    let backend = ScriptedBackend::new()
        .with_default(QueryScript::failing_after(rows, 2, "connection reset"));
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert_eq!(
        drain(&queue),
        vec![Ok(1), Ok(2), Err(ExecutorErrorCode::VqBackendFailed)]
    );
    assert_eq!(backend.closes(), 1);
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_closed_before_start_never_connects() {
    let backend = ScriptedBackend::new().with_default(QueryScript::rows(vec![summary_row(1)]));
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.close().unwrap();
    runner.start(&pool).unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert!(runner.is_closed());
    assert_eq!(backend.connect_attempts(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_retries_exhausted_pool_then_runs() {
    let backend = ScriptedBackend::new()
        .with_exhausted_pool(3)
        .with_default(QueryScript::rows(vec![summary_row(1)]));
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert_eq!(drain(&queue), vec![Ok(1)]);
    assert_eq!(backend.connect_attempts(), 4);
    assert_eq!(backend.connects(), 1);
}

#[test]
fn test_close_while_waiting_for_connection() {
    let backend = ScriptedBackend::new().with_exhausted_pool(usize::MAX);
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();
    assert!(wait_for(WAIT, || backend.connect_attempts() >= 2));
    assert!(!runner.is_done());

    runner.close().unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert_eq!(backend.connects(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_close_while_query_executing() {
    let mut script = QueryScript::rows(vec![summary_row(1)]);
    script.executing_polls = usize::MAX;
    let backend = ScriptedBackend::new().with_default(script);
    let pool = pool();
    let queue = ResultQueue::new(8);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();
    assert!(wait_for(WAIT, || backend.connects() == 1));

    runner.close().unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    assert!(queue.is_empty());
    assert_eq!(backend.closes(), 1);
}

#[test]
fn test_close_between_rows_stops_fetching() {
    let mut script = QueryScript::rows((1..=50).map(summary_row).collect());
    script.row_delay = Duration::from_millis(5);
    let backend = ScriptedBackend::new().with_default(script);
    let pool = pool();
    let queue = ResultQueue::new(64);
    let runner = runner(&backend, "r/0", "SELECT 1");
    runner.set_result_queue(queue.sender()).unwrap();

    runner.start(&pool).unwrap();
    assert!(wait_for(WAIT, || queue.len() >= 1));

    runner.close().unwrap();

    assert!(wait_for(WAIT, || runner.is_done()));
    let delivered = drain(&queue);
    assert!(!delivered.is_empty());
    assert!(delivered.len() < 50);
    assert!(delivered.iter().all(|item| item.is_ok()));
    assert_eq!(backend.closes(), 1);
}
