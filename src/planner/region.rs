//! Genomic region parsing
//!
//! Accepted forms: `chr1`, `chr1:100`, `chr1:100-200`, `chr1:1,000-2,000`.
//! Positions are 1-based and inclusive.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::PlannerError;

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.]+)(?::([\d,]+)(?:-([\d,]+))?)?$")
            .expect("region pattern is a valid regex")
    })
}

/// A chromosome, optionally narrowed to an inclusive position range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region {
    pub chrom: String,
    pub begin: Option<u64>,
    pub end: Option<u64>,
}

impl Region {
    /// A region spanning `[begin, end]` on `chrom`
    pub fn new(chrom: impl Into<String>, begin: u64, end: u64) -> Result<Self, PlannerError> {
        if begin > end {
            return Err(PlannerError::invalid_predicate(
                "region",
                format!("begin {} is after end {}", begin, end),
            ));
        }
        Ok(Self {
            chrom: chrom.into(),
            begin: Some(begin),
            end: Some(end),
        })
    }

    /// A region covering a whole chromosome
    pub fn whole_chromosome(chrom: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            begin: None,
            end: None,
        }
    }

    /// Returns true if the region carries position bounds
    pub fn is_bounded(&self) -> bool {
        self.begin.is_some() || self.end.is_some()
    }
}

fn parse_position(text: &str, region: &str) -> Result<u64, PlannerError> {
    text.replace(',', "").parse::<u64>().map_err(|_| {
        PlannerError::invalid_predicate("region", format!("bad position in '{}'", region))
    })
}

impl FromStr for Region {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let caps = region_pattern().captures(text).ok_or_else(|| {
            PlannerError::invalid_predicate("region", format!("cannot parse '{}'", s))
        })?;

        let chrom = caps[1].to_string();
        let begin = caps.get(2).map(|m| parse_position(m.as_str(), text)).transpose()?;
        let end = caps.get(3).map(|m| parse_position(m.as_str(), text)).transpose()?;

        match (begin, end) {
            (Some(b), Some(e)) => Region::new(chrom, b, e),
            (Some(p), None) => Region::new(chrom, p, p),
            _ => Ok(Region::whole_chromosome(chrom)),
        }
    }
}

impl TryFrom<String> for Region {
    type Error = PlannerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => write!(f, "{}:{}-{}", self.chrom, b, e),
            (Some(b), None) => write!(f, "{}:{}", self.chrom, b),
            _ => write!(f, "{}", self.chrom),
        }
    }
}
