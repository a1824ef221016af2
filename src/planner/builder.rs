//! Query text builder
//!
//! Lowers a [`PredicateSet`] to SQL for one dialect. The projection is
//! limited to identity columns and opaque payload blobs; decoding belongs
//! to the row deserializer, so nothing computed is selected.
//!
//! # Lowering rules
//!
//! - Absent predicates render nothing (never `TRUE`)
//! - Empty set-valued predicates render `1 = 0`
//! - Present predicates are AND-combined
//! - Regions are OR-ed among themselves
//! - `LIMIT` is appended only when positive

use std::sync::Arc;

use super::ast::{Predicate, PredicateSet, Rarity, RealAttrRange, VariantScan};
use super::dialect::Dialect;
use super::errors::{PlannerError, PlannerResult};
use super::explain::ExplainPlan;
use super::region::Region;
use super::schema::{ColumnType, TableSchema, VariantTables};

const MATCH_NOTHING: &str = "1 = 0";

const SUMMARY_COLUMNS: &[&str] = &[
    "sa.bucket_index",
    "sa.summary_index",
    "sa.allele_index",
    "sa.summary_variant_data",
];

const FAMILY_COLUMNS: &[&str] = &[
    "fa.bucket_index",
    "fa.summary_index",
    "fa.allele_index",
    "fa.family_index",
    "fa.family_id",
    "sa.summary_variant_data",
    "fa.family_variant_data",
];

/// One query text, scoped to a partition when the tables are partitioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub partition: Option<String>,
    pub sql: String,
    /// An array join may emit one row per matching element
    pub fans_out: bool,
}

/// Composes predicates and a dialect into query text.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    tables: Arc<VariantTables>,
    dialect: Arc<dyn Dialect>,
}

/// Quotes a string literal, doubling embedded quotes
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_list(values: &[String]) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(", ")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accumulates FROM/JOIN and WHERE fragments for one query.
struct QueryParts<'a> {
    dialect: &'a dyn Dialect,
    joins: Vec<String>,
    filters: Vec<String>,
    fans_out: bool,
}

impl<'a> QueryParts<'a> {
    fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            joins: Vec::new(),
            filters: Vec::new(),
            fans_out: false,
        }
    }

    fn join_array(&mut self, column: &str, alias: &str) {
        let join = if self.dialect.add_unnest_in_join() {
            format!("JOIN UNNEST({}) AS {}", column, alias)
        } else {
            format!("JOIN {} AS {}", column, alias)
        };
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
        self.fans_out = true;
    }

    fn filter(&mut self, clause: impl Into<String>) {
        self.filters.push(clause.into());
    }

    fn bitmask(
        &mut self,
        table: &TableSchema,
        alias: &str,
        column: &str,
        mask: u64,
        kind: &'static str,
    ) -> PlannerResult<()> {
        let expr = match table.column_type(column) {
            Some(ColumnType::Int) => format!("{}.{}", alias, column),
            Some(_) => format!("CAST({}.{} AS {})", alias, column, self.dialect.int_type()),
            None => {
                return Err(PlannerError::unsupported(
                    kind,
                    format!("table '{}' has no '{}' column", table.name, column),
                ))
            }
        };
        let clause = if self.dialect.use_bit_and_function() {
            format!("BITAND({}, {}) != 0", expr, mask)
        } else {
            format!("({} & {}) != 0", expr, mask)
        };
        self.filter(clause);
        Ok(())
    }

    fn range(
        &mut self,
        expr: &str,
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
        include_null: bool,
    ) {
        let mut bounds = Vec::new();
        if let Some(lo) = min {
            bounds.push(format!("{} >= {}", expr, lo));
        }
        if let Some(hi) = max {
            bounds.push(format!("{} <= {}", expr, hi));
        }
        let range = bounds.join(" AND ");
        if include_null {
            self.filter(format!("(({}) OR {} IS NULL)", range, column));
        } else {
            self.filter(format!("({})", range));
        }
    }
}

fn region_clause(region: &Region) -> String {
    let mut parts = vec![format!("sa.chromosome = {}", quote(&region.chrom))];
    if let Some(end) = region.end {
        parts.push(format!("sa.position <= {}", end));
    }
    if let Some(begin) = region.begin {
        parts.push(format!("sa.end_position >= {}", begin));
    }
    format!("({})", parts.join(" AND "))
}

impl QueryBuilder {
    pub fn new(tables: Arc<VariantTables>, dialect: Arc<dyn Dialect>) -> Self {
        Self { tables, dialect }
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn tables(&self) -> &VariantTables {
        &self.tables
    }

    /// Builds one query per partition the predicates can touch.
    ///
    /// Unpartitioned tables yield exactly one query. Partitioned tables
    /// yield one query per selected region bin, possibly none when the
    /// regions miss every bin.
    pub fn build(
        &self,
        scan: VariantScan,
        predicates: &[Predicate],
    ) -> PlannerResult<Vec<BuiltQuery>> {
        let set = PredicateSet::from_predicates(predicates)?;
        self.build_set(scan, &set)
    }

    /// Same as [`QueryBuilder::build`] for an already normalized set
    pub fn build_set(
        &self,
        scan: VariantScan,
        set: &PredicateSet,
    ) -> PlannerResult<Vec<BuiltQuery>> {
        let partitioning = &self.tables.partitioning;
        if !partitioning.is_partitioned() {
            return Ok(vec![self.render(scan, set, None)?]);
        }

        partitioning
            .select(set.regions.as_deref())
            .into_iter()
            .map(|bin| self.render(scan, set, Some(bin)))
            .collect()
    }

    /// Explain plan for the queries [`QueryBuilder::build`] would produce
    pub fn explain(&self, scan: VariantScan, predicates: &[Predicate]) -> ExplainPlan {
        ExplainPlan::build(self, scan, predicates)
    }

    fn render(
        &self,
        scan: VariantScan,
        set: &PredicateSet,
        partition: Option<&str>,
    ) -> PlannerResult<BuiltQuery> {
        if scan == VariantScan::Summary {
            if let Some(kind) = set.family_level_kind() {
                return Err(PlannerError::unsupported(
                    kind,
                    "family-level predicate on a summary variant scan",
                ));
            }
        }

        let dialect = self.dialect.as_ref();
        let namespace = self.tables.namespace.as_deref();
        let mut parts = QueryParts::new(dialect);

        let columns = match scan {
            VariantScan::Summary => SUMMARY_COLUMNS,
            VariantScan::Family => FAMILY_COLUMNS,
        };
        let mut from = format!(
            "FROM {} AS sa",
            dialect.qualify_table(&self.tables.summary.name, namespace)
        );
        if scan == VariantScan::Family {
            from.push_str(&format!(
                "\nJOIN {} AS fa ON (sa.bucket_index = fa.bucket_index \
                 AND sa.summary_index = fa.summary_index \
                 AND sa.allele_index = fa.allele_index)",
                dialect.qualify_table(&self.tables.family.name, namespace)
            ));
        }

        if let Some(bin) = partition {
            parts.filter(format!("sa.region_bin = {}", quote(bin)));
            if scan == VariantScan::Family {
                parts.filter(format!("fa.region_bin = {}", quote(bin)));
            }
        }

        self.lower_regions(&mut parts, set);
        self.lower_effects(&mut parts, set);
        if scan == VariantScan::Family {
            self.lower_family(&mut parts, set)?;
        }
        if let Some(mask) = set.variant_type_mask {
            parts.bitmask(&self.tables.summary, "sa", "variant_type", mask, "variant_type")?;
        }
        for range in &set.real_attrs {
            self.lower_real_attr(&mut parts, range)?;
        }
        if let Some(rarity) = &set.rarity {
            lower_rarity(&mut parts, rarity);
        }
        if !set.return_reference {
            parts.filter("sa.allele_index > 0");
        }
        if scan == VariantScan::Family && !set.return_unknown {
            parts.filter("fa.allele_index >= 0");
        }

        let mut sql = format!("SELECT {}\n{}", columns.join(", "), from);
        for join in &parts.joins {
            sql.push('\n');
            sql.push_str(join);
        }
        if !parts.filters.is_empty() {
            sql.push_str("\nWHERE ");
            sql.push_str(&parts.filters.join("\n  AND "));
        }
        if let Some(limit) = set.limit.filter(|l| *l > 0) {
            sql.push_str(&format!("\nLIMIT {}", limit));
        }
        Ok(BuiltQuery {
            partition: partition.map(str::to_string),
            sql,
            fans_out: parts.fans_out,
        })
    }

    fn lower_regions(&self, parts: &mut QueryParts<'_>, set: &PredicateSet) {
        match set.regions.as_deref() {
            None => {}
            Some([]) => parts.filter(MATCH_NOTHING),
            Some(regions) => {
                let clauses: Vec<String> = regions.iter().map(region_clause).collect();
                parts.filter(format!("({})", clauses.join(" OR ")));
            }
        }
    }

    fn lower_effects(&self, parts: &mut QueryParts<'_>, set: &PredicateSet) {
        let genes = set.genes.as_deref();
        let effects = set.effect_types.as_deref();
        if matches!(genes, Some([])) || matches!(effects, Some([])) {
            parts.filter(MATCH_NOTHING);
            return;
        }
        if genes.is_none() && effects.is_none() {
            return;
        }

        // Genes and effect types must match on the same array element.
        parts.join_array("sa.effect_gene", "eg");
        if let Some(genes) = set.genes.as_ref() {
            parts.filter(format!("eg.effect_gene_symbols IN ({})", quote_list(genes)));
        }
        if let Some(effects) = set.effect_types.as_ref() {
            parts.filter(format!("eg.effect_types IN ({})", quote_list(effects)));
        }
    }

    fn lower_family(&self, parts: &mut QueryParts<'_>, set: &PredicateSet) -> PlannerResult<()> {
        let family = &self.tables.family;

        match set.family_ids.as_deref() {
            None => {}
            Some([]) => parts.filter(MATCH_NOTHING),
            Some(ids) => parts.filter(format!("fa.family_id IN ({})", quote_list(ids))),
        }

        match set.person_ids.as_deref() {
            None => {}
            Some([]) => parts.filter(MATCH_NOTHING),
            Some(ids) if family.has_column("allele_in_members") => {
                parts.join_array("fa.allele_in_members", "pm");
                parts.filter(format!(
                    "pm{} IN ({})",
                    self.dialect.array_item_suffix(),
                    quote_list(ids)
                ));
            }
            Some(ids) => {
                let pedigree = self.tables.pedigree.as_ref().ok_or_else(|| {
                    PlannerError::unsupported(
                        "person_ids",
                        "family table has no member array and no pedigree table is configured",
                    )
                })?;
                parts.joins.push(format!(
                    "JOIN {} AS pd ON pd.family_id = fa.family_id",
                    self.dialect
                        .qualify_table(&pedigree.name, self.tables.namespace.as_deref())
                ));
                parts.filter(format!("pd.person_id IN ({})", quote_list(ids)));
                parts.fans_out = true;
            }
        }

        let masks = [
            (set.inheritance_mask, "inheritance_in_members", "inheritance_mask"),
            (set.roles_mask, "allele_in_roles", "roles_mask"),
            (set.sexes_mask, "allele_in_sexes", "sexes_mask"),
            (set.statuses_mask, "allele_in_statuses", "statuses_mask"),
        ];
        for (mask, column, kind) in masks {
            if let Some(mask) = mask {
                parts.bitmask(family, "fa", column, mask, kind)?;
            }
        }
        Ok(())
    }

    fn lower_real_attr(
        &self,
        parts: &mut QueryParts<'_>,
        range: &RealAttrRange,
    ) -> PlannerResult<()> {
        let summary = &self.tables.summary;
        if !is_identifier(&range.name) {
            return Err(PlannerError::invalid_predicate(
                "real_attr_range",
                format!("'{}' is not a column name", range.name),
            ));
        }
        let column = format!("sa.{}", range.name);
        let expr = match summary.column_type(&range.name) {
            Some(ColumnType::Float) => column.clone(),
            Some(ty) if ty.is_numeric() => {
                format!("CAST({} AS {})", column, self.dialect.float_type())
            }
            _ => return Err(PlannerError::unknown_column(&summary.name, &range.name)),
        };
        parts.range(&expr, &column, range.min, range.max, range.include_null);
        Ok(())
    }
}

fn lower_rarity(parts: &mut QueryParts<'_>, rarity: &Rarity) {
    match rarity {
        Rarity::UltraRare => parts.filter("sa.af_allele_count <= 1"),
        Rarity::Frequency { min, max, include_null } => parts.range(
            "sa.af_allele_freq",
            "sa.af_allele_freq",
            *min,
            *max,
            *include_null,
        ),
    }
}
