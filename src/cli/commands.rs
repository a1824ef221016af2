//! CLI command implementations
//!
//! Commands never touch a backend: `explain` only builds queries.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::EngineConfig;
use crate::observability::Logger;
use crate::planner::{DialectKind, ExplainPlan, Predicate, QueryBuilder, VariantScan, VariantTables};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_json, write_error, write_line, write_response};

/// A query request as read from a file or stdin
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub scan: VariantScan,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

/// Main CLI entry point; the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Explain {
            schema,
            request,
            dialect,
            config,
            text,
        } => explain(&schema, &request, dialect, config.as_deref(), text),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Build the plan for a request without executing it
pub fn plan(
    tables: VariantTables,
    request: &QueryRequest,
    dialect: DialectKind,
) -> ExplainPlan {
    let builder = QueryBuilder::new(Arc::new(tables), dialect.dialect());
    builder.explain(request.scan, &request.predicates)
}

/// Print the explain plan for a request. A rejected request prints an
/// error envelope and fails.
pub fn explain(
    schema_path: &Path,
    request_path: &Path,
    dialect: Option<DialectKind>,
    config_path: Option<&Path>,
    text: bool,
) -> CliResult<()> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Logger::set_min_severity(config.log_level);

    let tables: VariantTables = read_json(schema_path)?;
    let request: QueryRequest = read_json(request_path)?;
    let plan = plan(tables, &request, dialect.unwrap_or(config.dialect));

    if !plan.accepted {
        let code = plan.rejection_code.as_deref().unwrap_or("VQ_QUERY_INVALID");
        let reason = plan.rejection_reason.as_deref().unwrap_or("query rejected");
        write_error(code, reason)?;
        return Err(CliError::query_failed(format!("{}: {}", code, reason)));
    }

    if text {
        write_line(&plan.to_string())
    } else {
        write_response(&plan)
    }
}

/// Load and validate a config, then print the effective settings
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = EngineConfig::load(config_path)?;
    Logger::set_min_severity(config.log_level);

    write_response(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> QueryRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_defaults_to_family_scan() {
        let req = request(json!({}));
        assert_eq!(req.scan, VariantScan::Family);
        assert!(req.predicates.is_empty());
    }

    #[test]
    fn test_plan_accepts_region_request() {
        let req = request(json!({
            "scan": "family",
            "predicates": [
                {"kind": "regions", "regions": ["chr1:100-200"]},
                {"kind": "family_ids", "family_ids": []}
            ]
        }));
        let plan = plan(
            VariantTables::standard("study", Some("genomes")),
            &req,
            DialectKind::Impala,
        );
        assert!(plan.accepted);
        assert_eq!(plan.queries.len(), 1);
        assert!(plan.queries[0].sql.contains("1 = 0"));
    }

    #[test]
    fn test_plan_records_rejection() {
        let req = request(json!({
            "scan": "summary",
            "predicates": [{"kind": "person_ids", "person_ids": ["p1"]}]
        }));
        let plan = plan(VariantTables::standard("study", None), &req, DialectKind::Duckdb);
        assert!(!plan.accepted);
        assert_eq!(plan.rejection_code.as_deref(), Some("VQ_QUERY_UNSUPPORTED"));
    }
}
