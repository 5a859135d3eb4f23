//! Family Resolver: groups normalized records into patent families.
//!
//! Family membership is the transitive closure of shared identifiers, so it
//! is computed with an explicit disjoint-set structure rather than nested
//! scans: two records join the same set when they share a priority number,
//! share a PCT/WO number, or one's PCT number equals the other's priority
//! number.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::family::FamilyId;
use crate::normalize::{DataQualityEvent, QualityIssue};
use crate::profile::canonicalize_applicant;
use crate::record::PatentRecord;

/// Disjoint-set (union-find) with path compression and union by rank.
#[derive(Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl DisjointSet {
    /// Creates `len` singleton sets.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Finds the set representative, compressing the path.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Unions the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// One family before merge reconciliation: identity fields are resolved but
/// multiple observations of the same `(country, publication_number)` may
/// still coexist.
#[derive(Debug, Clone)]
pub struct ResolvedFamily {
    /// Deterministic identifier.
    pub family_id: FamilyId,
    /// Canonical linkage key the identifier derives from.
    pub canonical_key: String,
    /// WO/PCT root number, when present.
    pub pct_number: Option<String>,
    /// Earliest priority date across observations.
    pub priority_date: NaiveDate,
    /// Canonicalized applicant name.
    pub applicant_canonical_name: Option<String>,
    /// Distinct raw applicant names observed.
    pub observed_applicants: Vec<String>,
    /// All member observations, possibly duplicated per key.
    pub observations: Vec<PatentRecord>,
}

/// Output of one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutput {
    /// Families ordered by `family_id` for deterministic downstream output.
    pub families: Vec<ResolvedFamily>,
    /// Priority-date conflicts and similar observations.
    pub quality_events: Vec<DataQualityEvent>,
}

/// Groups normalized records into families.
///
/// A record matching nothing forms a singleton family; that is expected and
/// not an error. Running the resolver twice over identical input yields
/// identical family identifiers and memberships.
#[must_use]
pub fn resolve(records: Vec<PatentRecord>) -> ResolutionOutput {
    let mut output = ResolutionOutput::default();
    if records.is_empty() {
        return output;
    }

    let mut sets = DisjointSet::new(records.len());
    let mut by_priority: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut by_pct: HashMap<&str, Vec<usize>> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if let Some(priority) = record.priority_number.as_deref() {
            by_priority.entry(priority).or_default().push(index);
        }
        if let Some(pct) = record.pct_application_number.as_deref() {
            by_pct.entry(pct).or_default().push(index);
        }
    }

    for bucket in by_priority.values().chain(by_pct.values()) {
        for window in bucket.windows(2) {
            sets.union(window[0], window[1]);
        }
    }
    // Cross-reference: a PCT number cited as another record's priority.
    for (pct, indices) in &by_pct {
        if let Some(priority_indices) = by_priority.get(pct) {
            sets.union(indices[0], priority_indices[0]);
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for index in 0..records.len() {
        let root = sets.find(index);
        groups.entry(root).or_default().push(index);
    }

    for indices in groups.into_values() {
        let members: Vec<&PatentRecord> = indices.iter().map(|&i| &records[i]).collect();
        output
            .families
            .push(resolve_group(&members, &mut output.quality_events));
    }
    output.families.sort_by(|a, b| a.family_id.cmp(&b.family_id));
    tracing::debug!(
        families = output.families.len(),
        records = records.len(),
        "family resolution complete"
    );
    output
}

fn resolve_group(
    members: &[&PatentRecord],
    events: &mut Vec<DataQualityEvent>,
) -> ResolvedFamily {
    // Canonical key: smallest priority number, else smallest PCT number,
    // else (pure singleton without linkage) the publication number.
    let canonical_key = members
        .iter()
        .filter_map(|r| r.priority_number.as_deref())
        .min()
        .or_else(|| members.iter().filter_map(|r| r.pct_application_number.as_deref()).min())
        .unwrap_or_else(|| {
            members
                .iter()
                .map(|r| r.publication_number.as_str())
                .min()
                .expect("group is non-empty")
        })
        .to_string();
    let family_id = FamilyId::derive(&canonical_key);

    let pct_number = members
        .iter()
        .filter_map(|r| r.pct_application_number.as_deref())
        .min()
        .map(ToString::to_string);

    // Earliest priority date wins; disagreements are logged, never dropped.
    let priority_date = members
        .iter()
        .map(|r| r.priority_date)
        .min()
        .expect("group is non-empty");
    for record in members {
        if record.priority_date != priority_date {
            tracing::info!(
                family = %family_id,
                kept = %priority_date,
                discarded = %record.priority_date,
                "conflicting priority dates within family"
            );
            events.push(DataQualityEvent {
                source: Some(record.source),
                record: record.publication_number.clone(),
                issue: QualityIssue::PriorityDateConflict {
                    kept: priority_date,
                    discarded: record.priority_date,
                },
            });
        }
    }

    let applicant_canonical_name = pick_applicant(members);

    let mut observed_applicants: Vec<String> = members
        .iter()
        .filter_map(|r| r.applicant_name.clone())
        .collect();
    observed_applicants.sort();
    observed_applicants.dedup();

    ResolvedFamily {
        family_id,
        canonical_key,
        pct_number,
        priority_date,
        applicant_canonical_name,
        observed_applicants,
        observations: members.iter().map(|r| (*r).clone()).collect(),
    }
}

/// Applicant tie-break when records disagree: the PCT/root record is taken
/// as most authoritative, else the earliest-dated record with an applicant.
fn pick_applicant(members: &[&PatentRecord]) -> Option<String> {
    let from_root = members
        .iter()
        .filter(|r| r.is_pct_root())
        .filter_map(|r| r.applicant_name.as_deref())
        .next();
    let raw = from_root.or_else(|| {
        let mut dated: Vec<&&PatentRecord> =
            members.iter().filter(|r| r.applicant_name.is_some()).collect();
        dated.sort_by_key(|r| (r.effective_date(), r.publication_number.clone()));
        dated.first().and_then(|r| r.applicant_name.as_deref())
    })?;
    canonicalize_applicant(raw)
}
