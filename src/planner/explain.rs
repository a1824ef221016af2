//! Explain plan output
//!
//! Describes the per-partition queries a submit would run, without
//! touching a backend. Renders as text or JSON.

use std::fmt;

use serde::Serialize;

use super::ast::{Predicate, VariantScan};
use super::builder::QueryBuilder;
use super::errors::PlannerError;

/// One partition query in an explain plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainedQuery {
    pub partition: Option<String>,
    pub sql: String,
}

/// Explain plan output
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    /// Whether building succeeded
    pub accepted: bool,
    pub scan: VariantScan,
    pub dialect: String,
    /// Partitions described by the schema (0 when unpartitioned)
    pub partitions_total: usize,
    pub queries: Vec<ExplainedQuery>,
    /// Rejection error code (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
    /// Rejection reason (if rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ExplainPlan {
    /// Builds the queries and records either the texts or the rejection
    pub fn build(builder: &QueryBuilder, scan: VariantScan, predicates: &[Predicate]) -> Self {
        let partitions_total = builder.tables().partitioning.region_bins.len();
        let dialect = builder.dialect().name().to_string();

        match builder.build(scan, predicates) {
            Ok(built) => Self {
                accepted: true,
                scan,
                dialect,
                partitions_total,
                queries: built
                    .into_iter()
                    .map(|q| ExplainedQuery {
                        partition: q.partition,
                        sql: q.sql,
                    })
                    .collect(),
                rejection_code: None,
                rejection_reason: None,
            },
            Err(err) => Self::rejected(scan, dialect, partitions_total, &err),
        }
    }

    fn rejected(
        scan: VariantScan,
        dialect: String,
        partitions_total: usize,
        err: &PlannerError,
    ) -> Self {
        Self {
            accepted: false,
            scan,
            dialect,
            partitions_total,
            queries: Vec::new(),
            rejection_code: Some(err.code().code().to_string()),
            rejection_reason: Some(err.message().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;
        writeln!(f, "Scan: {} ({})", self.scan.as_str(), self.dialect)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            writeln!(
                f,
                "Queries: {} of {} partitions",
                self.queries.len(),
                self.partitions_total
            )?;
            for query in &self.queries {
                writeln!(f, "--- {}", query.partition.as_deref().unwrap_or("<all>"))?;
                writeln!(f, "{}", query.sql)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
