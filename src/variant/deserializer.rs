//! Row deserialization
//!
//! Turns a backend row into a [`VariantRecord`] or a drop signal
//! (`Ok(None)`). Decoding lives here, not in SQL, so query text stays
//! dialect-neutral.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::backend::Row;

use super::record::{FamilyVariant, SummaryVariant, VariantRecord};

/// Result type for row decoding
pub type VariantResult<T> = Result<T, VariantError>;

/// Row decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("invalid summary payload at {0}: {1}")]
    InvalidSummaryPayload(String, String),

    #[error("invalid family payload at {0}: {1}")]
    InvalidFamilyPayload(String, String),

    #[error("family row {0} has no family id")]
    MissingFamilyId(String),

    #[error("genotype of {0} does not match its {1} members")]
    GenotypeShape(String, usize),
}

/// Decodes rows into variant records. Shared by every runner of a query.
pub trait RowDeserializer: Send + Sync {
    /// Returns `Ok(None)` for rows that should be dropped
    fn deserialize(&self, row: Row) -> VariantResult<Option<VariantRecord>>;
}

impl<F> RowDeserializer for F
where
    F: Fn(Row) -> VariantResult<Option<VariantRecord>> + Send + Sync,
{
    fn deserialize(&self, row: Row) -> VariantResult<Option<VariantRecord>> {
        self(row)
    }
}

#[derive(Deserialize)]
struct SummaryPayload {
    chromosome: String,
    position: u64,
    #[serde(default)]
    end_position: Option<u64>,
    reference: String,
    #[serde(default)]
    alternative: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Deserialize)]
struct FamilyPayload {
    #[serde(default)]
    family_id: Option<String>,
    members: Vec<String>,
    genotype: Vec<Vec<i8>>,
    #[serde(default)]
    best_state: Vec<Vec<i8>>,
}

fn row_key(row: &Row) -> String {
    match row.family_index {
        Some(fi) => format!(
            "{}/{}/{}/{}",
            row.bucket_index, row.summary_index, row.allele_index, fi
        ),
        None => format!("{}/{}/{}", row.bucket_index, row.summary_index, row.allele_index),
    }
}

/// Decodes the JSON payload blobs written by the import pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonVariantDeserializer;

impl JsonVariantDeserializer {
    fn summary(&self, row: &Row) -> VariantResult<SummaryVariant> {
        let payload: SummaryPayload = serde_json::from_slice(&row.summary_data)
            .map_err(|e| VariantError::InvalidSummaryPayload(row_key(row), e.to_string()))?;
        Ok(SummaryVariant {
            bucket_index: row.bucket_index,
            summary_index: row.summary_index,
            allele_index: row.allele_index,
            chromosome: payload.chromosome,
            position: payload.position,
            end_position: payload.end_position,
            reference: payload.reference,
            alternative: payload.alternative,
            attributes: payload.attributes,
        })
    }

    fn family(
        &self,
        row: &Row,
        data: &[u8],
        summary: SummaryVariant,
    ) -> VariantResult<FamilyVariant> {
        let key = row_key(row);
        let payload: FamilyPayload = serde_json::from_slice(data)
            .map_err(|e| VariantError::InvalidFamilyPayload(key.clone(), e.to_string()))?;

        let family_id = row
            .family_id
            .clone()
            .or(payload.family_id)
            .ok_or_else(|| VariantError::MissingFamilyId(key.clone()))?;

        let members = payload.members.len();
        let shape_ok = payload.genotype.iter().all(|r| r.len() == members)
            && payload.best_state.iter().all(|r| r.len() == members);
        if !shape_ok {
            return Err(VariantError::GenotypeShape(key, members));
        }

        Ok(FamilyVariant {
            summary,
            family_id,
            family_index: row.family_index.unwrap_or_default(),
            members: payload.members,
            genotype: payload.genotype,
            best_state: payload.best_state,
        })
    }
}

impl RowDeserializer for JsonVariantDeserializer {
    fn deserialize(&self, row: Row) -> VariantResult<Option<VariantRecord>> {
        let summary = self.summary(&row)?;
        let record = match &row.family_data {
            Some(data) => VariantRecord::Family(self.family(&row, data, summary)?),
            None => VariantRecord::Summary(summary),
        };
        Ok(Some(record))
    }
}

/// Drops repeated rows of one query.
///
/// Array joins emit a row per matching element; only the first row per
/// `(bucket, summary, allele, family)` identity is decoded.
pub struct DistinctRows {
    inner: Arc<dyn RowDeserializer>,
    seen: Mutex<HashSet<(i64, i64, i64, Option<i64>)>>,
}

impl DistinctRows {
    pub fn new(inner: Arc<dyn RowDeserializer>) -> Self {
        Self {
            inner,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl RowDeserializer for DistinctRows {
    fn deserialize(&self, row: Row) -> VariantResult<Option<VariantRecord>> {
        let key = (row.bucket_index, row.summary_index, row.allele_index, row.family_index);
        let fresh = self
            .seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key);
        if !fresh {
            return Ok(None);
        }
        self.inner.deserialize(row)
    }
}
