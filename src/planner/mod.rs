//! Query planning for variant scans
//!
//! Turns a declarative predicate list into backend-specific SQL.
//!
//! # Design Principles
//!
//! - Stateless: dialects and builders hold no mutable state
//! - Early failure: malformed predicates are rejected here, before any
//!   runner is scheduled
//! - Absent is not empty: a missing predicate is no constraint, an empty
//!   set-valued predicate matches nothing
//! - Identity projection only: payloads are decoded outside SQL

mod ast;
mod builder;
mod dialect;
mod errors;
mod explain;
mod region;
mod schema;

pub use ast::{Predicate, PredicateSet, Rarity, RealAttrRange, VariantScan};
pub use builder::{BuiltQuery, QueryBuilder};
pub use dialect::{BigQueryDialect, Dialect, DialectKind, DuckDbDialect, ImpalaDialect};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::{ExplainPlan, ExplainedQuery};
pub use region::Region;
pub use schema::{ColumnType, PartitionDescriptor, TableSchema, VariantTables};
