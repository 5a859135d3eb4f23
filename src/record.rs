//! Record types: raw source-tagged observations and the canonical shape.
//!
//! Every raw record entering the engine is tagged with the collaborator that
//! produced it. Source-specific field names live only at this boundary; the
//! normalizer maps them into [`PatentRecord`] and the rest of the pipeline
//! never inspects source shapes again.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which collaborator produced a raw record.
///
/// The variants double as an authority ordering for merge reconciliation:
/// a national office beats the international offices, which beat commercial
/// aggregators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Direct national patent office (e.g. the INPI crawler).
    NationalOffice,
    /// International office API (EPO-equivalent).
    InternationalOffice,
    /// PCT registry crawler (WIPO PATENTSCOPE-equivalent).
    PctRegistry,
    /// Commercial aggregator crawler (Google Patents-equivalent).
    CommercialAggregator,
}

impl RecordSource {
    /// Authority rank for field-level merge precedence. Lower wins.
    #[must_use]
    pub const fn authority_rank(self) -> u8 {
        match self {
            Self::NationalOffice => 0,
            Self::InternationalOffice | Self::PctRegistry => 1,
            Self::CommercialAggregator => 2,
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NationalOffice => write!(f, "national_office"),
            Self::InternationalOffice => write!(f, "international_office"),
            Self::PctRegistry => write!(f, "pct_registry"),
            Self::CommercialAggregator => write!(f, "commercial_aggregator"),
        }
    }
}

/// One raw, source-shaped record as delivered by a collaborator.
///
/// The field map keeps whatever names the source uses
/// (`patent_number` vs `publication_number`, `wo_number` vs `pct_number`,
/// a scalar `applicant` vs an `applicants` array). Only the normalizer
/// knows the per-source alias tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Producing collaborator.
    pub source: RecordSource,
    /// Source-shaped field map.
    pub fields: Map<String, Value>,
}

impl RawRecord {
    /// Creates a raw record from a source tag and field map.
    #[must_use]
    pub const fn new(source: RecordSource, fields: Map<String, Value>) -> Self {
        Self { source, fields }
    }

    /// Builds a raw record from `(key, value)` string pairs. Convenience for
    /// tests and adapters.
    #[must_use]
    pub fn from_pairs<'a, I>(source: RecordSource, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut fields = Map::new();
        for (k, v) in pairs {
            fields.insert(k.to_string(), Value::String(v.to_string()));
        }
        Self { source, fields }
    }

    /// First non-empty string value among the given field aliases.
    ///
    /// Arrays are resolved to their first string element, matching sources
    /// that report `applicants: [...]` instead of a scalar.
    #[must_use]
    pub fn first_string(&self, aliases: &[&str]) -> Option<String> {
        for alias in aliases {
            match self.fields.get(*alias) {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    return Some(s.trim().to_string());
                }
                Some(Value::Array(items)) => {
                    if let Some(Value::String(s)) = items.first() {
                        if !s.trim().is_empty() {
                            return Some(s.trim().to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Key identifying one national filing within a family.
pub type RecordKey = (String, String);

/// One observed publication in canonical form.
///
/// Invariant: `publication_number` never carries a trailing kind-code suffix;
/// the kind code is split into its own field during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Collaborator the observation came from (after merging: the most
    /// authoritative contributing source).
    pub source: RecordSource,
    /// Two-letter jurisdiction code, uppercase (`WO` for PCT publications).
    pub country_code: String,
    /// Country prefix + serial, kind code stripped.
    pub publication_number: String,
    /// Publication kind code (e.g. `A2`, `B1`), when the source reported one.
    pub kind_code: Option<String>,
    /// Earliest application this record claims priority from.
    pub priority_number: Option<String>,
    /// Priority date. Always populated by the normalizer, via the fallback
    /// chain when the source omitted or mangled it.
    pub priority_date: NaiveDate,
    /// WO application number linking the record to its PCT root.
    pub pct_application_number: Option<String>,
    /// Raw applicant name, pre-canonicalization.
    pub applicant_name: Option<String>,
    /// National filing date, when reported.
    pub filing_date: Option<NaiveDate>,
    /// Publication date, when reported.
    pub publication_date: Option<NaiveDate>,
}

impl PatentRecord {
    /// The `(country_code, publication_number)` identity of this record.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        (self.country_code.clone(), self.publication_number.clone())
    }

    /// True when this record is the PCT/WO root publication of its family.
    #[must_use]
    pub fn is_pct_root(&self) -> bool {
        self.country_code == "WO"
            || self
                .pct_application_number
                .as_deref()
                .is_some_and(|pct| pct == self.publication_number)
    }

    /// Best available date for earliest-record tie-breaks: filing date,
    /// else publication date, else priority date.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.filing_date
            .or(self.publication_date)
            .unwrap_or(self.priority_date)
    }
}
