//! The merged result stream: limits, close semantics, backpressure and
//! isolation between concurrent results.

mod common;

use std::thread;
use std::time::Duration;

use common::{
    executor, executor_with, fast_config, partitioned_tables, summary_index, summary_row, wait_for,
};
use varquery::backend::{QueryScript, ScriptedBackend};
use varquery::config::EngineConfig;
use varquery::executor::ExecutorErrorCode;
use varquery::planner::{Predicate, VariantScan, VariantTables};

const WAIT: Duration = Duration::from_secs(5);

fn unpartitioned() -> VariantTables {
    VariantTables::standard("study", Some("genomes"))
}

// =============================================================================
// Limit
// =============================================================================

#[test]
fn test_limit_caps_yielded_records() {
    let backend = ScriptedBackend::new()
        .with_default(QueryScript::rows((1..=5).map(summary_row).collect()));
    let executor = executor(&backend, unpartitioned());

    let mut result = executor
        .submit(VariantScan::Summary, &[Predicate::Limit { limit: 2 }])
        .unwrap();
    assert_eq!(result.limit(), Some(2));

    let records: Vec<_> = result.by_ref().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(result.yielded(), 2);
    assert!(result.next().is_none());

    assert!(result.close().is_ok());
    assert!(backend.executed()[0].contains("LIMIT 2"));
}

#[test]
fn test_zero_limit_yields_nothing() {
    let backend = ScriptedBackend::new().with_default(QueryScript::rows(vec![summary_row(1)]));
    let executor = executor(&backend, unpartitioned());

    let mut result = executor
        .submit(VariantScan::Summary, &[Predicate::Limit { limit: 0 }])
        .unwrap();
    assert!(result.next().is_none());
    assert!(!result.is_started());
    assert!(result.close().is_ok());
    assert_eq!(backend.connect_attempts(), 0);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_error_after_two_records() {
    let rows = (1..=5).map(summary_row).collect();
    let backend =
        ScriptedBackend::new().with_default(QueryScript::failing_after(rows, 2, "stream lost"));
    let executor = executor(&backend, unpartitioned());

    let mut result = executor.submit(VariantScan::Summary, &[]).unwrap();

    assert_eq!(summary_index(&result.next().unwrap().unwrap()), 1);
    assert_eq!(summary_index(&result.next().unwrap().unwrap()), 2);
    let err = result.next().unwrap().unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::VqBackendFailed);
    assert!(err.message().contains("stream lost"));

    // The iterator is fused after an error.
    assert!(result.next().is_none());
    assert!(result.close().is_ok());
}

#[test]
fn test_close_surfaces_unread_error() {
    let backend = ScriptedBackend::new().with_default(QueryScript::execute_error("table missing"));
    let executor = executor(&backend, unpartitioned());

    let mut result = executor.submit(VariantScan::Summary, &[]).unwrap();
    result.start().unwrap();
    assert!(wait_for(WAIT, || result.all_runners_done()));

    let err = result.close().unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::VqBackendFailed);
    assert_eq!(executor.metrics().snapshot().errors_on_close, 1);

    // Idempotent, and nothing is left behind.
    assert!(result.close().is_ok());
    assert_eq!(result.queued_len(), 0);
    assert!(result.is_closed());
}

#[test]
fn test_rejected_predicates_fail_submit() {
    let backend = ScriptedBackend::new();
    let executor = executor(&backend, unpartitioned());

    let err = executor
        .submit(VariantScan::Summary, &[Predicate::family_ids(&["f1"])])
        .err()
        .unwrap();
    assert_eq!(err.code(), ExecutorErrorCode::VqQueryRejected);
    assert!(err.message().contains("VQ_QUERY_UNSUPPORTED"));
    assert_eq!(executor.metrics().snapshot().queries_rejected, 1);
    assert!(backend.executed().is_empty());
}

// =============================================================================
// Early close
// =============================================================================

#[test]
fn test_early_close_stops_runners() {
    let mut script = QueryScript::rows((1..=200).map(summary_row).collect());
    script.row_delay = Duration::from_millis(1);
    let backend = ScriptedBackend::new().with_default(script);
    let config = EngineConfig {
        queue_capacity: 4,
        ..fast_config()
    };
    let executor = executor_with(&backend, partitioned_tables(&["chr1_0", "chr2_0"]), config);

    let mut result = executor.submit(VariantScan::Summary, &[]).unwrap();
    assert!(result.next().unwrap().is_ok());

    assert!(result.close().is_ok());
    assert!(result.all_runners_done());
    assert_eq!(result.queued_len(), 0);
    assert_eq!(backend.closes(), backend.connects());
    assert!(executor.metrics().snapshot().records_enqueued < 400);
}

#[test]
fn test_dropping_result_closes_runners() {
    let mut script = QueryScript::rows((1..=100).map(summary_row).collect());
    script.row_delay = Duration::from_millis(1);
    let backend = ScriptedBackend::new().with_default(script);
    let executor = executor(&backend, unpartitioned());

    {
        let mut result = executor.submit(VariantScan::Summary, &[]).unwrap();
        assert!(result.next().unwrap().is_ok());
    }

    assert!(wait_for(WAIT, || backend.closes() == 1));
}

// =============================================================================
// Backpressure
// =============================================================================

#[test]
fn test_slow_consumer_receives_every_record_in_runner_order() {
    let backend = ScriptedBackend::new()
        .with_script("'chr1_0'", QueryScript::rows((1..=3).map(summary_row).collect()))
        .with_script("'chr2_0'", QueryScript::rows((11..=13).map(summary_row).collect()));
    let config = EngineConfig {
        queue_capacity: 1,
        ..fast_config()
    };
    let executor = executor_with(&backend, partitioned_tables(&["chr1_0", "chr2_0"]), config);

    let mut result = executor.submit(VariantScan::Summary, &[]).unwrap();
    let mut seen = Vec::new();
    for item in result.by_ref() {
        seen.push(summary_index(&item.unwrap()));
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(seen.len(), 6);
    let first: Vec<_> = seen.iter().copied().filter(|i| *i < 10).collect();
    let second: Vec<_> = seen.iter().copied().filter(|i| *i > 10).collect();
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(second, vec![11, 12, 13]);
    assert!(result.close().is_ok());
}

// =============================================================================
// Isolation
// =============================================================================

#[test]
fn test_concurrent_results_are_isolated() {
    let backend = ScriptedBackend::new()
        .with_script("LIMIT 3", QueryScript::rows((1..=3).map(summary_row).collect()))
        .with_default(QueryScript::rows((21..=24).map(summary_row).collect()));
    let executor = executor(&backend, unpartitioned());

    let mut first = executor
        .submit(VariantScan::Summary, &[Predicate::Limit { limit: 3 }])
        .unwrap();
    let mut second = executor.submit(VariantScan::Summary, &[]).unwrap();
    assert_ne!(first.id(), second.id());

    let a: Vec<_> = first.by_ref().map(|r| summary_index(&r.unwrap())).collect();
    let b: Vec<_> = second.by_ref().map(|r| summary_index(&r.unwrap())).collect();

    assert_eq!(a, vec![1, 2, 3]);
    assert_eq!(b, vec![21, 22, 23, 24]);
    assert!(first.close().is_ok());
    assert!(second.close().is_ok());
    assert_eq!(executor.metrics().snapshot().queries_submitted, 2);
}

#[test]
fn test_failing_backend_aborts_only_its_own_result() {
    let backend = ScriptedBackend::new()
        .with_script("LIMIT 7", QueryScript::execute_error("boom"))
        .with_default(QueryScript::rows((1..=3).map(summary_row).collect()));
    let executor = executor(&backend, unpartitioned());

    let mut failing = executor
        .submit(VariantScan::Summary, &[Predicate::Limit { limit: 7 }])
        .unwrap();
    let mut healthy = executor.submit(VariantScan::Summary, &[]).unwrap();

    let err = failing.next().unwrap().unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::VqBackendFailed);
    assert!(err.message().contains("boom"));
    assert!(failing.next().is_none());

    let rows: Vec<_> = healthy.by_ref().map(|r| summary_index(&r.unwrap())).collect();
    assert_eq!(rows, vec![1, 2, 3]);

    assert!(failing.close().is_ok());
    assert!(healthy.close().is_ok());
}
