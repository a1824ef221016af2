//! Predicate structures
//!
//! A query is a list of [`Predicate`]s. Absence of a kind means no
//! constraint on that axis; an explicitly empty set-valued predicate
//! (regions, genes, effect types, family ids, person ids) means "match
//! nothing". [`PredicateSet`] keeps that distinction as `None` versus
//! `Some(vec![])`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::errors::{PlannerError, PlannerResult};
use super::region::Region;

/// Which variant table shape a query scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantScan {
    /// Deduplicated alleles, one row per distinct allele
    Summary,
    /// Per-family genotype rows joined to their summary allele
    #[default]
    Family,
}

impl VariantScan {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantScan::Summary => "summary",
            VariantScan::Family => "family",
        }
    }
}

/// Allele frequency constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rarity {
    /// Seen in at most one parental allele
    UltraRare,
    /// Inclusive allele frequency bounds, in percent
    Frequency {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        include_null: bool,
    },
}

/// Inclusive numeric range over a named summary attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealAttrRange {
    pub name: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub include_null: bool,
}

impl RealAttrRange {
    pub fn new(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            include_null: false,
        }
    }
}

/// One filter axis of a variant query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Regions { regions: Vec<Region> },
    Genes { genes: Vec<String> },
    EffectTypes { effect_types: Vec<String> },
    FamilyIds { family_ids: Vec<String> },
    PersonIds { person_ids: Vec<String> },
    InheritanceMask { mask: u64 },
    RolesMask { mask: u64 },
    SexesMask { mask: u64 },
    StatusesMask { mask: u64 },
    VariantType { mask: u64 },
    RealAttrRange(RealAttrRange),
    Rarity { rarity: Rarity },
    ReturnReference { value: bool },
    ReturnUnknown { value: bool },
    Limit { limit: u64 },
}

impl Predicate {
    /// Parses region strings into a Regions predicate
    pub fn regions<S: AsRef<str>>(regions: &[S]) -> PlannerResult<Self> {
        let regions = regions
            .iter()
            .map(|r| r.as_ref().parse())
            .collect::<PlannerResult<Vec<Region>>>()?;
        Ok(Predicate::Regions { regions })
    }

    pub fn genes<S: Into<String> + Clone>(genes: &[S]) -> Self {
        Predicate::Genes {
            genes: genes.iter().cloned().map(Into::into).collect(),
        }
    }

    pub fn effect_types<S: Into<String> + Clone>(effect_types: &[S]) -> Self {
        Predicate::EffectTypes {
            effect_types: effect_types.iter().cloned().map(Into::into).collect(),
        }
    }

    pub fn family_ids<S: Into<String> + Clone>(family_ids: &[S]) -> Self {
        Predicate::FamilyIds {
            family_ids: family_ids.iter().cloned().map(Into::into).collect(),
        }
    }

    pub fn person_ids<S: Into<String> + Clone>(person_ids: &[S]) -> Self {
        Predicate::PersonIds {
            person_ids: person_ids.iter().cloned().map(Into::into).collect(),
        }
    }

    /// Stable snake_case name of the predicate kind
    pub fn kind(&self) -> &'static str {
        match self {
            Predicate::Regions { .. } => "regions",
            Predicate::Genes { .. } => "genes",
            Predicate::EffectTypes { .. } => "effect_types",
            Predicate::FamilyIds { .. } => "family_ids",
            Predicate::PersonIds { .. } => "person_ids",
            Predicate::InheritanceMask { .. } => "inheritance_mask",
            Predicate::RolesMask { .. } => "roles_mask",
            Predicate::SexesMask { .. } => "sexes_mask",
            Predicate::StatusesMask { .. } => "statuses_mask",
            Predicate::VariantType { .. } => "variant_type",
            Predicate::RealAttrRange(_) => "real_attr_range",
            Predicate::Rarity { .. } => "rarity",
            Predicate::ReturnReference { .. } => "return_reference",
            Predicate::ReturnUnknown { .. } => "return_unknown",
            Predicate::Limit { .. } => "limit",
        }
    }
}

/// Validated, normalized view of a predicate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    pub regions: Option<Vec<Region>>,
    pub genes: Option<Vec<String>>,
    pub effect_types: Option<Vec<String>>,
    pub family_ids: Option<Vec<String>>,
    pub person_ids: Option<Vec<String>>,
    pub inheritance_mask: Option<u64>,
    pub roles_mask: Option<u64>,
    pub sexes_mask: Option<u64>,
    pub statuses_mask: Option<u64>,
    pub variant_type_mask: Option<u64>,
    pub real_attrs: Vec<RealAttrRange>,
    pub rarity: Option<Rarity>,
    pub return_reference: bool,
    pub return_unknown: bool,
    pub limit: Option<u64>,
}

fn set_once<T>(slot: &mut Option<T>, value: T, kind: &'static str) -> PlannerResult<()> {
    if slot.is_some() {
        return Err(PlannerError::unsupported(kind, "given more than once"));
    }
    *slot = Some(value);
    Ok(())
}

fn check_bounds(
    kind: &'static str,
    min: Option<f64>,
    max: Option<f64>,
) -> PlannerResult<()> {
    if min.is_none() && max.is_none() {
        return Err(PlannerError::invalid_predicate(kind, "needs at least one bound"));
    }
    for bound in [min, max].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(PlannerError::invalid_predicate(kind, "bounds must be finite"));
        }
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(PlannerError::invalid_predicate(
                kind,
                format!("min {} is greater than max {}", lo, hi),
            ));
        }
    }
    Ok(())
}

impl PredicateSet {
    /// Validates and normalizes a predicate list.
    ///
    /// Each kind may appear once, except `real_attr_range` which may
    /// appear once per attribute name.
    pub fn from_predicates(predicates: &[Predicate]) -> PlannerResult<Self> {
        let mut set = PredicateSet::default();
        let mut return_reference = None;
        let mut return_unknown = None;

        for predicate in predicates {
            let kind = predicate.kind();
            match predicate {
                Predicate::Regions { regions } => {
                    set_once(&mut set.regions, regions.clone(), kind)?
                }
                Predicate::Genes { genes } => set_once(&mut set.genes, genes.clone(), kind)?,
                Predicate::EffectTypes { effect_types } => {
                    set_once(&mut set.effect_types, effect_types.clone(), kind)?
                }
                Predicate::FamilyIds { family_ids } => {
                    set_once(&mut set.family_ids, family_ids.clone(), kind)?
                }
                Predicate::PersonIds { person_ids } => {
                    set_once(&mut set.person_ids, person_ids.clone(), kind)?
                }
                Predicate::InheritanceMask { mask } => {
                    set_once(&mut set.inheritance_mask, *mask, kind)?
                }
                Predicate::RolesMask { mask } => set_once(&mut set.roles_mask, *mask, kind)?,
                Predicate::SexesMask { mask } => set_once(&mut set.sexes_mask, *mask, kind)?,
                Predicate::StatusesMask { mask } => set_once(&mut set.statuses_mask, *mask, kind)?,
                Predicate::VariantType { mask } => {
                    set_once(&mut set.variant_type_mask, *mask, kind)?
                }
                Predicate::RealAttrRange(range) => {
                    check_bounds(kind, range.min, range.max)?;
                    if set.real_attrs.iter().any(|r| r.name == range.name) {
                        return Err(PlannerError::unsupported(
                            kind,
                            format!("attribute '{}' given more than once", range.name),
                        ));
                    }
                    set.real_attrs.push(range.clone());
                }
                Predicate::Rarity { rarity } => {
                    if let Rarity::Frequency { min, max, .. } = rarity {
                        check_bounds(kind, *min, *max)?;
                    }
                    set_once(&mut set.rarity, rarity.clone(), kind)?
                }
                Predicate::ReturnReference { value } => {
                    set_once(&mut return_reference, *value, kind)?
                }
                Predicate::ReturnUnknown { value } => set_once(&mut return_unknown, *value, kind)?,
                Predicate::Limit { limit } => set_once(&mut set.limit, *limit, kind)?,
            }
        }

        set.return_reference = return_reference.unwrap_or(false);
        set.return_unknown = return_unknown.unwrap_or(false);
        Ok(set)
    }

    /// Returns the first predicate kind that only makes sense per family.
    pub fn family_level_kind(&self) -> Option<&'static str> {
        if self.family_ids.is_some() {
            Some("family_ids")
        } else if self.person_ids.is_some() {
            Some("person_ids")
        } else if self.inheritance_mask.is_some() {
            Some("inheritance_mask")
        } else if self.roles_mask.is_some() {
            Some("roles_mask")
        } else if self.sexes_mask.is_some() {
            Some("sexes_mask")
        } else if self.statuses_mask.is_some() {
            Some("statuses_mask")
        } else if self.return_unknown {
            Some("return_unknown")
        } else {
            None
        }
    }
}
