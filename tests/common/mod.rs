//! Shared fixtures for the integration suites
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use varquery::backend::{Row, ScriptedBackend};
use varquery::config::EngineConfig;
use varquery::executor::{QueryExecutor, QueryRunner, RunnerContext};
use varquery::observability::MetricsRegistry;
use varquery::planner::{BuiltQuery, DialectKind, PartitionDescriptor, QueryBuilder, VariantTables};
use varquery::variant::{JsonVariantDeserializer, RowDeserializer, VariantRecord};

/// A summary allele row with a JSON payload
pub fn summary_row(summary_index: i64) -> Row {
    Row {
        bucket_index: 1,
        summary_index,
        allele_index: 1,
        summary_data: serde_json::to_vec(&json!({
            "chromosome": "chr1",
            "position": 100 + summary_index as u64,
            "reference": "A",
            "alternative": "T"
        }))
        .unwrap(),
        ..Row::default()
    }
}

/// A family row for `family_id` carrying the allele in the child
pub fn family_row(summary_index: i64, family_index: i64, family_id: &str) -> Row {
    Row {
        family_index: Some(family_index),
        family_id: Some(family_id.to_string()),
        family_data: Some(
            serde_json::to_vec(&json!({
                "members": ["mom", "dad", "kid"],
                "genotype": [[0, 0, 0], [0, 0, 1]],
                "best_state": [[2, 2, 1], [0, 0, 1]]
            }))
            .unwrap(),
        ),
        ..summary_row(summary_index)
    }
}

/// Config with millisecond checkpoints so tests stay fast
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        connection_retry_interval_ms: 2,
        execution_poll_interval_ms: 1,
        consumer_poll_timeout_ms: 10,
        start_grace_ms: 0,
        shutdown_timeout_ms: 1000,
        ..EngineConfig::default()
    }
}

pub fn partitioned_tables(bins: &[&str]) -> VariantTables {
    VariantTables::standard("study", Some("genomes")).with_partitioning(PartitionDescriptor {
        region_length: Some(1000),
        chromosomes: vec!["chr1".into(), "chr2".into()],
        region_bins: bins.iter().map(|b| b.to_string()).collect(),
    })
}

pub fn executor_with(
    backend: &ScriptedBackend,
    tables: VariantTables,
    config: EngineConfig,
) -> QueryExecutor {
    let builder = QueryBuilder::new(Arc::new(tables), DialectKind::Impala.dialect());
    QueryExecutor::new(
        builder,
        Arc::new(backend.clone()),
        Arc::new(JsonVariantDeserializer),
        &config,
    )
    .unwrap()
}

pub fn executor(backend: &ScriptedBackend, tables: VariantTables) -> QueryExecutor {
    executor_with(backend, tables, fast_config())
}

/// A standalone runner for `sql`, decoding with the JSON deserializer
pub fn runner(backend: &ScriptedBackend, id: &str, sql: &str) -> Arc<QueryRunner> {
    runner_with(backend, id, sql, Arc::new(JsonVariantDeserializer))
}

pub fn runner_with(
    backend: &ScriptedBackend,
    id: &str,
    sql: &str,
    deserializer: Arc<dyn RowDeserializer>,
) -> Arc<QueryRunner> {
    let config = fast_config();
    let context = RunnerContext {
        connector: Arc::new(backend.clone()),
        deserializer,
        settings: config.runner_settings(),
        metrics: Arc::new(MetricsRegistry::new()),
    };
    let query = BuiltQuery {
        partition: None,
        sql: sql.to_string(),
        fans_out: false,
    };
    Arc::new(QueryRunner::new(id, query, context))
}

pub fn summary_index(record: &VariantRecord) -> i64 {
    record.summary().summary_index
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
