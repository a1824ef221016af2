//! SQL dialects
//!
//! A dialect is a set of pure syntax rules. Dialects carry no mutable
//! state, so one instance is shared by every builder and runner.

use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Syntax rules distinguishing one backend's SQL from another.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Short backend name, used in explain output and logs
    fn name(&self) -> &'static str;

    /// Integer type name used in casts
    fn int_type(&self) -> &'static str;

    /// Floating point type name used in casts
    fn float_type(&self) -> &'static str;

    /// Suffix addressing the scalar item of an array element alias
    fn array_item_suffix(&self) -> &'static str;

    /// Whether array columns are joined through `UNNEST(...)`
    fn add_unnest_in_join(&self) -> bool;

    /// Whether bitmask tests use a `BITAND` builtin instead of `&`
    fn use_bit_and_function(&self) -> bool;

    /// Fully qualified table reference
    fn qualify_table(&self, name: &str, namespace: Option<&str>) -> String;
}

/// Impala / Hive-style dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpalaDialect;

impl Dialect for ImpalaDialect {
    fn name(&self) -> &'static str {
        "impala"
    }

    fn int_type(&self) -> &'static str {
        "INT"
    }

    fn float_type(&self) -> &'static str {
        "FLOAT"
    }

    fn array_item_suffix(&self) -> &'static str {
        ".item"
    }

    fn add_unnest_in_join(&self) -> bool {
        false
    }

    fn use_bit_and_function(&self) -> bool {
        true
    }

    fn qualify_table(&self, name: &str, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// BigQuery standard SQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigQueryDialect;

impl Dialect for BigQueryDialect {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn int_type(&self) -> &'static str {
        "INT64"
    }

    fn float_type(&self) -> &'static str {
        "FLOAT64"
    }

    fn array_item_suffix(&self) -> &'static str {
        ""
    }

    fn add_unnest_in_join(&self) -> bool {
        true
    }

    fn use_bit_and_function(&self) -> bool {
        false
    }

    fn qualify_table(&self, name: &str, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("`{}`.{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// DuckDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn int_type(&self) -> &'static str {
        "INTEGER"
    }

    fn float_type(&self) -> &'static str {
        "DOUBLE"
    }

    fn array_item_suffix(&self) -> &'static str {
        ""
    }

    fn add_unnest_in_join(&self) -> bool {
        true
    }

    fn use_bit_and_function(&self) -> bool {
        false
    }

    fn qualify_table(&self, name: &str, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("\"{}\".{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// Selector for the built-in dialects (config files and CLI flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Impala,
    Bigquery,
    Duckdb,
}

impl DialectKind {
    /// Returns a shareable instance of the selected dialect
    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::Impala => Arc::new(ImpalaDialect),
            DialectKind::Bigquery => Arc::new(BigQueryDialect),
            DialectKind::Duckdb => Arc::new(DuckDbDialect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impala_rules() {
        let d = ImpalaDialect;
        assert_eq!(d.int_type(), "INT");
        assert_eq!(d.array_item_suffix(), ".item");
        assert!(!d.add_unnest_in_join());
        assert!(d.use_bit_and_function());
        assert_eq!(d.qualify_table("summary_allele", Some("gpf")), "gpf.summary_allele");
    }

    #[test]
    fn test_bigquery_rules() {
        let d = BigQueryDialect;
        assert_eq!(d.float_type(), "FLOAT64");
        assert!(d.add_unnest_in_join());
        assert!(!d.use_bit_and_function());
        assert_eq!(
            d.qualify_table("family_allele", Some("proj.ds")),
            "`proj.ds`.family_allele"
        );
    }

    #[test]
    fn test_unqualified_without_namespace() {
        for kind in [DialectKind::Impala, DialectKind::Bigquery, DialectKind::Duckdb] {
            assert_eq!(kind.dialect().qualify_table("pedigree", None), "pedigree");
        }
    }

    #[test]
    fn test_kind_deserializes_lowercase() {
        let kind: DialectKind = serde_json::from_str("\"duckdb\"").unwrap();
        assert_eq!(kind, DialectKind::Duckdb);
        assert_eq!(kind.dialect().name(), "duckdb");
    }
}
