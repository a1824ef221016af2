//! Query executor
//!
//! Owns the worker pool. Each submit builds the per-partition queries,
//! creates one runner per query and wires them into a fresh result.
//! Submits share nothing but the pool and the counters.

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::BackendConnector;
use crate::config::EngineConfig;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::planner::{ExplainPlan, Predicate, PredicateSet, QueryBuilder, VariantScan};
use crate::variant::{DistinctRows, RowDeserializer};

use super::errors::{ExecutorError, ExecutorResult};
use super::pool::WorkerPool;
use super::result::{QueryResult, ResultSettings};
use super::runner::{QueryRunner, RunnerContext, RunnerSettings};

pub struct QueryExecutor {
    builder: QueryBuilder,
    connector: Arc<dyn BackendConnector>,
    deserializer: Arc<dyn RowDeserializer>,
    pool: Arc<WorkerPool>,
    runner_settings: RunnerSettings,
    result_settings: ResultSettings,
    metrics: Arc<MetricsRegistry>,
}

impl QueryExecutor {
    pub fn new(
        builder: QueryBuilder,
        connector: Arc<dyn BackendConnector>,
        deserializer: Arc<dyn RowDeserializer>,
        config: &EngineConfig,
    ) -> ExecutorResult<Self> {
        config
            .validate()
            .map_err(|e| ExecutorError::pool_failed(e.to_string()))?;
        let pool = WorkerPool::new(config.pool_size, config.shutdown_timeout())?;

        Ok(Self {
            builder,
            connector,
            deserializer,
            pool: Arc::new(pool),
            runner_settings: config.runner_settings(),
            result_settings: config.result_settings(),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    /// Share an existing counter registry
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Build the queries for `predicates` and return an unstarted result.
    ///
    /// Predicate errors surface here as `VQ_QUERY_REJECTED`; no runner is
    /// created for a rejected query. The result starts on its first
    /// `next` (or an explicit `start`).
    pub fn submit(
        &self,
        scan: VariantScan,
        predicates: &[Predicate],
    ) -> ExecutorResult<QueryResult> {
        let query_id = Uuid::new_v4().to_string();

        let planned = PredicateSet::from_predicates(predicates).and_then(|set| {
            let built = self.builder.build_set(scan, &set)?;
            Ok((set, built))
        });
        let (set, built) = match planned {
            Ok(planned) => planned,
            Err(err) => {
                self.metrics.increment_queries_rejected();
                log_event_with_fields(
                    Event::QueryRejected,
                    &[
                        ("query", query_id.as_str()),
                        ("code", err.code().code()),
                        ("error", err.message()),
                    ],
                );
                return Err(ExecutorError::query_rejected(&err));
            }
        };

        let deserializer: Arc<dyn RowDeserializer> = if built.iter().any(|q| q.fans_out) {
            Arc::new(DistinctRows::new(Arc::clone(&self.deserializer)))
        } else {
            Arc::clone(&self.deserializer)
        };
        let context = RunnerContext {
            connector: Arc::clone(&self.connector),
            deserializer,
            settings: self.runner_settings,
            metrics: Arc::clone(&self.metrics),
        };

        let runners: Vec<Arc<QueryRunner>> = built
            .into_iter()
            .enumerate()
            .map(|(i, query)| {
                Arc::new(QueryRunner::new(
                    format!("{}/{}", query_id, i),
                    query,
                    context.clone(),
                ))
            })
            .collect();

        self.metrics.increment_queries_submitted();
        log_event_with_fields(
            Event::QuerySubmitted,
            &[
                ("query", query_id.as_str()),
                ("scan", scan.as_str()),
                ("runners", runners.len().to_string().as_str()),
            ],
        );

        QueryResult::new(
            query_id,
            runners,
            Arc::clone(&self.pool),
            self.result_settings,
            set.limit,
            Arc::clone(&self.metrics),
        )
    }

    pub fn explain(&self, scan: VariantScan, predicates: &[Predicate]) -> ExplainPlan {
        self.builder.explain(scan, predicates)
    }
}
