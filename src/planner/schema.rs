//! Table names and schema metadata
//!
//! Supplied by the schema-introspection side of the storage layer. The
//! builder reads physical table names, column types and the region-bin
//! partitioning from here; it never queries the backend for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::region::Region;

/// Storage type of a column, as far as query building cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    String,
    Bool,
    Blob,
    Array,
    Struct,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

/// A physical table and its column name → type map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnType>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column registration
    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}

/// Region-bin partitioning of the allele tables.
///
/// A bin is named `{chrom}_{pos / region_length}`. Chromosomes missing
/// from `chromosomes` (when that list is non-empty) share the `other`
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    #[serde(default)]
    pub region_length: Option<u64>,
    #[serde(default)]
    pub chromosomes: Vec<String>,
    /// Bins physically present in the tables
    #[serde(default)]
    pub region_bins: Vec<String>,
}

impl PartitionDescriptor {
    pub fn is_partitioned(&self) -> bool {
        !self.region_bins.is_empty()
    }

    fn bin_chrom<'a>(&self, chrom: &'a str) -> &'a str {
        if self.chromosomes.is_empty() || self.chromosomes.iter().any(|c| c == chrom) {
            chrom
        } else {
            "other"
        }
    }

    /// Name of the bin holding `pos` on `chrom`
    pub fn region_bin(&self, chrom: &str, pos: u64) -> String {
        let index = match self.region_length {
            Some(len) if len > 0 => pos / len,
            _ => 0,
        };
        format!("{}_{}", self.bin_chrom(chrom), index)
    }

    fn bin_may_contain(&self, bin: &str, region: &Region) -> bool {
        // Bins that do not follow the naming scheme are never pruned.
        let Some((bin_chrom, index)) = bin.rsplit_once('_') else {
            return true;
        };
        let Ok(index) = index.parse::<u64>() else {
            return true;
        };
        if bin_chrom != self.bin_chrom(&region.chrom) {
            return false;
        }
        match (self.region_length, region.begin, region.end) {
            (Some(len), Some(begin), Some(end)) if len > 0 => {
                index >= begin / len && index <= end / len
            }
            _ => true,
        }
    }

    /// Bins a query must scan. Non-empty regions prune bins that cannot
    /// overlap any region; otherwise every bin is returned.
    pub fn select(&self, regions: Option<&[Region]>) -> Vec<&str> {
        let bins = self.region_bins.iter().map(String::as_str);
        match regions {
            Some(regions) if !regions.is_empty() => bins
                .filter(|bin| regions.iter().any(|r| self.bin_may_contain(bin, r)))
                .collect(),
            _ => bins.collect(),
        }
    }
}

/// Everything the builder needs to know about the physical layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantTables {
    /// Database / dataset the tables live in
    #[serde(default)]
    pub namespace: Option<String>,
    pub summary: TableSchema,
    pub family: TableSchema,
    #[serde(default)]
    pub pedigree: Option<TableSchema>,
    #[serde(default)]
    pub partitioning: PartitionDescriptor,
}

impl VariantTables {
    /// The standard allele-table layout under `namespace`, with
    /// `{study}_summary_allele`, `{study}_family_allele` and
    /// `{study}_pedigree` tables and no partitioning.
    pub fn standard(study: &str, namespace: Option<&str>) -> Self {
        let summary = TableSchema::new(format!("{}_summary_allele", study))
            .with_column("bucket_index", ColumnType::Int)
            .with_column("summary_index", ColumnType::Int)
            .with_column("allele_index", ColumnType::Int)
            .with_column("chromosome", ColumnType::String)
            .with_column("position", ColumnType::Int)
            .with_column("end_position", ColumnType::Int)
            .with_column("effect_gene", ColumnType::Array)
            .with_column("variant_type", ColumnType::Int)
            .with_column("af_allele_count", ColumnType::Int)
            .with_column("af_allele_freq", ColumnType::Float)
            .with_column("summary_variant_data", ColumnType::Blob)
            .with_column("region_bin", ColumnType::String);
        let family = TableSchema::new(format!("{}_family_allele", study))
            .with_column("bucket_index", ColumnType::Int)
            .with_column("summary_index", ColumnType::Int)
            .with_column("allele_index", ColumnType::Int)
            .with_column("family_index", ColumnType::Int)
            .with_column("family_id", ColumnType::String)
            .with_column("allele_in_sexes", ColumnType::Int)
            .with_column("allele_in_statuses", ColumnType::Int)
            .with_column("allele_in_roles", ColumnType::Int)
            .with_column("inheritance_in_members", ColumnType::Int)
            .with_column("allele_in_members", ColumnType::Array)
            .with_column("family_variant_data", ColumnType::Blob)
            .with_column("region_bin", ColumnType::String);
        let pedigree = TableSchema::new(format!("{}_pedigree", study))
            .with_column("family_id", ColumnType::String)
            .with_column("person_id", ColumnType::String);

        Self {
            namespace: namespace.map(str::to_string),
            summary,
            family,
            pedigree: Some(pedigree),
            partitioning: PartitionDescriptor::default(),
        }
    }

    /// Replaces the partitioning description
    pub fn with_partitioning(mut self, partitioning: PartitionDescriptor) -> Self {
        self.partitioning = partitioning;
        self
    }
}
