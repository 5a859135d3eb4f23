//! Merge Reconciler: collapses multi-source observations of one filing.
//!
//! The same BR filing discovered independently by two crawlers must become
//! one fact. Field-level precedence follows source authority (national
//! office > international office > commercial aggregator); a non-null
//! disagreement within the same authority tier keeps the first-seen value
//! and records an explicit conflict annotation instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::family::{FamilyId, PatentFamily};
use crate::record::{PatentRecord, RecordKey, RecordSource};
use crate::resolver::ResolvedFamily;

/// A field-level disagreement between sources, preserved for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictAnnotation {
    /// Family the conflicting record belongs to.
    pub family_id: FamilyId,
    /// Jurisdiction of the record.
    pub country_code: String,
    /// Publication number of the record.
    pub publication_number: String,
    /// Which field disagreed.
    pub field: String,
    /// The value that was kept.
    pub kept: String,
    /// Source of the kept value.
    pub kept_source: RecordSource,
    /// The value that was set aside.
    pub discarded: String,
    /// Source of the discarded value.
    pub discarded_source: RecordSource,
}

/// Output of reconciling one resolved family.
#[derive(Debug, Clone)]
pub struct ReconciledFamily {
    /// The finalized family, one record per `(country, publication_number)`.
    pub family: PatentFamily,
    /// All field conflicts encountered while merging.
    pub conflicts: Vec<ConflictAnnotation>,
}

/// Reconciles a resolved family into its final, deduplicated form.
#[must_use]
pub fn reconcile(resolved: ResolvedFamily) -> ReconciledFamily {
    let mut conflicts = Vec::new();
    let mut grouped: BTreeMap<RecordKey, Vec<PatentRecord>> = BTreeMap::new();
    for observation in resolved.observations {
        grouped.entry(observation.key()).or_default().push(observation);
    }

    let mut members: BTreeMap<RecordKey, PatentRecord> = BTreeMap::new();
    for (key, observations) in grouped {
        let merged = merge_observations(resolved.family_id, observations, &mut conflicts);
        members.insert(key, merged);
    }

    if !conflicts.is_empty() {
        tracing::info!(
            family = %resolved.family_id,
            conflicts = conflicts.len(),
            "field conflicts reconciled by source authority"
        );
    }

    ReconciledFamily {
        family: PatentFamily {
            family_id: resolved.family_id,
            pct_number: resolved.pct_number,
            canonical_key: resolved.canonical_key,
            priority_date: resolved.priority_date,
            applicant_canonical_name: resolved.applicant_canonical_name,
            observed_applicants: resolved.observed_applicants,
            members,
        },
        conflicts,
    }
}

/// Merges all observations of one `(country, publication_number)` key.
///
/// Observations are visited in authority order (input order breaks ties, so
/// the first-seen value wins within a tier); later observations only fill
/// fields the base is missing.
fn merge_observations(
    family_id: FamilyId,
    observations: Vec<PatentRecord>,
    conflicts: &mut Vec<ConflictAnnotation>,
) -> PatentRecord {
    let mut ordered: Vec<(usize, PatentRecord)> = observations.into_iter().enumerate().collect();
    ordered.sort_by_key(|(seen, record)| (record.source.authority_rank(), *seen));

    let mut iter = ordered.into_iter().map(|(_, record)| record);
    let mut base = iter.next().expect("at least one observation per key");

    for other in iter {
        merge_string_field(&mut base, &other, "kind_code", conflicts, family_id, |r| {
            r.kind_code.clone()
        }, |r, v| r.kind_code = Some(v));
        merge_string_field(&mut base, &other, "priority_number", conflicts, family_id, |r| {
            r.priority_number.clone()
        }, |r, v| r.priority_number = Some(v));
        merge_string_field(&mut base, &other, "pct_application_number", conflicts, family_id, |r| {
            r.pct_application_number.clone()
        }, |r, v| r.pct_application_number = Some(v));
        merge_string_field(&mut base, &other, "applicant_name", conflicts, family_id, |r| {
            r.applicant_name.clone()
        }, |r, v| r.applicant_name = Some(v));
        merge_date_field(&mut base, &other, "filing_date", conflicts, family_id, |r| {
            r.filing_date
        }, |r, v| r.filing_date = Some(v));
        merge_date_field(&mut base, &other, "publication_date", conflicts, family_id, |r| {
            r.publication_date
        }, |r, v| r.publication_date = Some(v));
        if other.priority_date != base.priority_date {
            // Record-level priority dates were already reconciled family-wide
            // (earliest wins); keep the earlier of the two here as well.
            if other.priority_date < base.priority_date {
                base.priority_date = other.priority_date;
            }
        }
    }
    base
}

fn merge_string_field(
    base: &mut PatentRecord,
    other: &PatentRecord,
    field: &str,
    conflicts: &mut Vec<ConflictAnnotation>,
    family_id: FamilyId,
    get: impl Fn(&PatentRecord) -> Option<String>,
    set: impl FnOnce(&mut PatentRecord, String),
) {
    match (get(base), get(other)) {
        (None, Some(value)) => set(base, value),
        (Some(kept), Some(candidate)) if kept != candidate => {
            conflicts.push(ConflictAnnotation {
                family_id,
                country_code: base.country_code.clone(),
                publication_number: base.publication_number.clone(),
                field: field.to_string(),
                kept,
                kept_source: base.source,
                discarded: candidate,
                discarded_source: other.source,
            });
        }
        _ => {}
    }
}

fn merge_date_field(
    base: &mut PatentRecord,
    other: &PatentRecord,
    field: &str,
    conflicts: &mut Vec<ConflictAnnotation>,
    family_id: FamilyId,
    get: impl Fn(&PatentRecord) -> Option<chrono::NaiveDate>,
    set: impl FnOnce(&mut PatentRecord, chrono::NaiveDate),
) {
    match (get(base), get(other)) {
        (None, Some(value)) => set(base, value),
        (Some(kept), Some(candidate)) if kept != candidate => {
            conflicts.push(ConflictAnnotation {
                family_id,
                country_code: base.country_code.clone(),
                publication_number: base.publication_number.clone(),
                field: field.to_string(),
                kept: kept.to_string(),
                kept_source: base.source,
                discarded: candidate.to_string(),
                discarded_source: other.source,
            });
        }
        _ => {}
    }
}
