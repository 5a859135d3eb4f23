//! Patent family types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{PatentRecord, RecordKey};

/// Namespace for deterministic family identifiers.
const FAMILY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x8f, 0x1d, 0x4b, 0x0a, 0x5c, 0x21, 0x4e, 0x7d, 0x9a, 0x3b, 0x6f, 0x02, 0xd4, 0x8e, 0x55,
    0xc1,
]);

/// Deterministic identifier of one patent family.
///
/// Derived (UUIDv5) from the family's canonical linkage key, so resolving
/// the same raw input twice yields the same identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FamilyId(Uuid);

impl FamilyId {
    /// Derives the identifier from a canonical linkage key (the
    /// lexicographically smallest priority number, else PCT number).
    #[must_use]
    pub fn derive(canonical_key: &str) -> Self {
        Self(Uuid::new_v5(&FAMILY_NAMESPACE, canonical_key.as_bytes()))
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One resolved, reconciled patent family.
///
/// Invariants once finalized: exactly one priority date (earliest observed),
/// exactly one canonical applicant, and member records keyed by
/// `(country_code, publication_number)` with no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentFamily {
    /// Deterministic identifier.
    pub family_id: FamilyId,
    /// WO/PCT root application number, when the family has one.
    pub pct_number: Option<String>,
    /// The canonical linkage key the identifier was derived from.
    pub canonical_key: String,
    /// Earliest priority date across all member records.
    pub priority_date: NaiveDate,
    /// Canonicalized applicant name; `None` when no member record carried a
    /// resolvable applicant.
    pub applicant_canonical_name: Option<String>,
    /// All distinct raw applicant names observed across sources.
    pub observed_applicants: Vec<String>,
    /// One merged record per national filing.
    pub members: BTreeMap<RecordKey, PatentRecord>,
}

impl PatentFamily {
    /// True when the family has a confirmed record in the jurisdiction.
    #[must_use]
    pub fn has_filing_in(&self, jurisdiction: &str) -> bool {
        self.members.keys().any(|(country, _)| country == jurisdiction)
    }

    /// Distinct national jurisdictions with confirmed filings (the WO root
    /// publication is not a national filing and is excluded).
    #[must_use]
    pub fn confirmed_jurisdictions(&self) -> BTreeSet<&str> {
        self.members
            .keys()
            .map(|(country, _)| country.as_str())
            .filter(|country| *country != "WO")
            .collect()
    }

    /// True when the family descends from a PCT application.
    #[must_use]
    pub fn has_pct_root(&self) -> bool {
        self.pct_number.is_some()
    }
}
