//! Variant records produced by the row deserializer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One distinct allele at a genomic locus, shared across families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryVariant {
    pub bucket_index: i64,
    pub summary_index: i64,
    pub allele_index: i64,
    pub chromosome: String,
    pub position: u64,
    pub end_position: Option<u64>,
    pub reference: String,
    pub alternative: Option<String>,
    /// Annotation attributes carried in the payload
    pub attributes: Map<String, Value>,
}

impl SummaryVariant {
    /// Locus string `chrom:position`
    pub fn location(&self) -> String {
        match self.end_position {
            Some(end) if end != self.position => {
                format!("{}:{}-{}", self.chromosome, self.position, end)
            }
            _ => format!("{}:{}", self.chromosome, self.position),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.allele_index == 0
    }
}

/// A summary allele seen in one family, with its genotype matrices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyVariant {
    pub summary: SummaryVariant,
    pub family_id: String,
    pub family_index: i64,
    /// Person ids, in genotype column order
    pub members: Vec<String>,
    /// 2 x members allele matrix
    pub genotype: Vec<Vec<i8>>,
    /// Copy number per allele x member
    pub best_state: Vec<Vec<i8>>,
}

impl FamilyVariant {
    /// Members carrying the allele in at least one genotype row
    pub fn carriers(&self) -> Vec<&str> {
        let allele = self.summary.allele_index;
        self.members
            .iter()
            .enumerate()
            .filter(|(col, _)| {
                self.genotype
                    .iter()
                    .any(|row| row.get(*col).map(|&g| i64::from(g)) == Some(allele))
            })
            .map(|(_, person)| person.as_str())
            .collect()
    }
}

/// A record yielded by a variant query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VariantRecord {
    Summary(SummaryVariant),
    Family(FamilyVariant),
}

impl VariantRecord {
    /// The summary allele, for either shape
    pub fn summary(&self) -> &SummaryVariant {
        match self {
            VariantRecord::Summary(sv) => sv,
            VariantRecord::Family(fv) => &fv.summary,
        }
    }

    pub fn family(&self) -> Option<&FamilyVariant> {
        match self {
            VariantRecord::Summary(_) => None,
            VariantRecord::Family(fv) => Some(fv),
        }
    }

    pub fn is_family(&self) -> bool {
        matches!(self, VariantRecord::Family(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(allele_index: i64) -> SummaryVariant {
        SummaryVariant {
            bucket_index: 0,
            summary_index: 3,
            allele_index,
            chromosome: "chr1".into(),
            position: 100,
            end_position: Some(100),
            reference: "A".into(),
            alternative: Some("T".into()),
            attributes: Map::new(),
        }
    }

    #[test]
    fn test_location() {
        assert_eq!(summary(1).location(), "chr1:100");
        let mut sv = summary(1);
        sv.end_position = Some(105);
        assert_eq!(sv.location(), "chr1:100-105");
    }

    #[test]
    fn test_carriers() {
        let fv = FamilyVariant {
            summary: summary(1),
            family_id: "f1".into(),
            family_index: 0,
            members: vec!["mom".into(), "dad".into(), "kid".into()],
            genotype: vec![vec![0, 0, 0], vec![0, 1, 1]],
            best_state: vec![vec![2, 1, 1], vec![0, 1, 1]],
        };
        assert_eq!(fv.carriers(), vec!["dad", "kid"]);

        let record = VariantRecord::Family(fv);
        assert!(record.is_family());
        assert_eq!(record.summary().summary_index, 3);
    }

    #[test]
    fn test_carriers_ignore_out_of_range_allele() {
        let fv = FamilyVariant {
            summary: summary(257),
            family_id: "f1".into(),
            family_index: 0,
            members: vec!["mom".into(), "kid".into()],
            genotype: vec![vec![0, 0], vec![0, 1]],
            best_state: vec![vec![2, 1], vec![0, 1]],
        };
        assert!(fv.carriers().is_empty());
    }

    #[test]
    fn test_reference_allele() {
        let record = VariantRecord::Summary(summary(0));
        assert!(record.summary().is_reference());
        assert!(record.family().is_none());
    }
}
