//! Predictive Inference Engine.
//!
//! For every resolved family and target jurisdiction without a confirmed
//! filing, the engine decides whether an unpublished national-phase entry
//! is plausibly pending and, if so, emits a confidence-scored
//! [`InferredEvent`]. Predictions are probabilistic estimates for strategic
//! planning; the engine never fabricates filing numbers.

pub mod scoring;

use std::fmt;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InferenceConfig;
use crate::family::{FamilyId, PatentFamily};
use crate::store::ProfileSnapshot;

pub use scoring::{
    assess, ConfidenceAssessment, ConfidenceTier, ComponentScore, DeadlineStatus, ScoreBasis,
};

/// Namespace for deterministic event identifiers.
const EVENT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x2c, 0x97, 0xe0, 0x4d, 0x1b, 0x66, 0x45, 0x38, 0x84, 0x5f, 0xa9, 0x7e, 0x31, 0x0c, 0xbe,
    0x72,
]);

/// Deterministic identifier of one inferred event, derived from the family
/// identifier and the target jurisdiction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Derives the identifier for a `(family, jurisdiction)` pair.
    #[must_use]
    pub fn derive(family_id: FamilyId, jurisdiction: &str) -> Self {
        let key = format!("{family_id}:{jurisdiction}");
        Self(Uuid::new_v5(&EVENT_NAMESPACE, key.as_bytes()))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a `(family, jurisdiction)` pair is not a prediction candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A confirmed filing already exists in the jurisdiction.
    ConfirmedFiling,
    /// The family has no PCT root, so there is no national-phase route.
    NoPctRoot,
    /// The deadline passed and the applicant's history makes a late entry
    /// implausible; the window is treated as closed without filing.
    ClosedWithoutFiling,
}

/// Prediction state of one `(family, jurisdiction)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingState {
    /// Terminal; no event is produced.
    NotApplicable(SkipReason),
    /// Eligible for scoring in this pass.
    Candidate,
    /// Scored; an event was emitted. Reached at most once per pass.
    Inferred,
}

/// The statutory filing window for a predicted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingWindow {
    /// Earliest possible entry (the priority date).
    pub opens: NaiveDate,
    /// Statutory national-phase deadline for the jurisdiction.
    pub deadline: NaiveDate,
}

/// A prediction that a family has (or will have) an unpublished filing in
/// the target jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredEvent {
    /// Deterministic identifier.
    pub event_id: EventId,
    /// Family the prediction concerns.
    pub family_id: FamilyId,
    /// Jurisdiction the filing is predicted in.
    pub target_jurisdiction: String,
    /// Combined confidence in [0, 1].
    pub confidence_score: f64,
    /// Tier classification of the score.
    pub confidence_tier: ConfidenceTier,
    /// Statutory window the filing would fall in.
    pub predicted_filing_window: FilingWindow,
    /// Per-component score breakdown.
    pub basis: ScoreBasis,
    /// Set when no applicant name could be canonicalized; the neutral prior
    /// was used.
    pub applicant_unresolved: bool,
}

/// The Predictive Inference Engine for one resolution pass.
///
/// Reads applicant behavior from an immutable snapshot so every score in
/// the pass observes the same store state.
#[derive(Debug)]
pub struct InferenceEngine<'a> {
    config: &'a InferenceConfig,
    profiles: &'a ProfileSnapshot,
    today: NaiveDate,
}

impl<'a> InferenceEngine<'a> {
    /// Creates an engine with an explicit reference date.
    #[must_use]
    pub const fn new(
        config: &'a InferenceConfig,
        profiles: &'a ProfileSnapshot,
        today: NaiveDate,
    ) -> Self {
        Self {
            config,
            profiles,
            today,
        }
    }

    /// Statutory deadline for a family in a jurisdiction.
    #[must_use]
    pub fn deadline_for(&self, family: &PatentFamily, jurisdiction: &str) -> NaiveDate {
        let months = self.config.deadlines.months_for(jurisdiction);
        family
            .priority_date
            .checked_add_months(Months::new(months))
            .unwrap_or(family.priority_date)
    }

    /// Current prediction state of a `(family, jurisdiction)` pair.
    ///
    /// A pair with a confirmed filing is terminal: no event may ever be
    /// produced for it. A passed deadline keeps candidate status only when
    /// the applicant's smoothed rate clears the late-entry gate.
    #[must_use]
    pub fn filing_state(&self, family: &PatentFamily, jurisdiction: &str) -> FilingState {
        if family.has_filing_in(jurisdiction) {
            return FilingState::NotApplicable(SkipReason::ConfirmedFiling);
        }
        if !family.has_pct_root() {
            return FilingState::NotApplicable(SkipReason::NoPctRoot);
        }
        if self.today > self.deadline_for(family, jurisdiction) {
            let rate = self.applicant_rate(family, jurisdiction).0;
            if rate < self.config.late_entry_min_rate {
                return FilingState::NotApplicable(SkipReason::ClosedWithoutFiling);
            }
        }
        FilingState::Candidate
    }

    /// Scores every candidate pair and emits events, deterministically
    /// ordered by event identifier.
    #[must_use]
    pub fn infer(&self, families: &[PatentFamily]) -> Vec<InferredEvent> {
        let mut events = Vec::new();
        for family in families {
            for jurisdiction in &self.config.target_jurisdictions {
                if self.filing_state(family, jurisdiction) != FilingState::Candidate {
                    continue;
                }
                events.push(self.score_candidate(family, jurisdiction));
            }
        }
        events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
        tracing::debug!(events = events.len(), "predictive inference complete");
        events
    }

    fn score_candidate(&self, family: &PatentFamily, jurisdiction: &str) -> InferredEvent {
        let deadline = self.deadline_for(family, jurisdiction);
        let status = if self.today > deadline {
            DeadlineStatus::Passed {
                days_overdue: (self.today - deadline).num_days(),
            }
        } else {
            DeadlineStatus::Open {
                days_remaining: (deadline - self.today).num_days(),
            }
        };

        let (applicant_rate, applicant_unresolved) = self.applicant_rate(family, jurisdiction);
        let assessment = assess(
            status,
            applicant_rate,
            self.config.market.weight_for(jurisdiction),
            family.confirmed_jurisdictions().len(),
            &self.config.weights,
            &self.config.timeline,
            &self.config.breadth,
            &self.config.thresholds,
        );

        if applicant_unresolved {
            tracing::info!(
                family = %family.family_id,
                jurisdiction,
                "scoring with neutral applicant prior: applicant unresolved"
            );
        }

        InferredEvent {
            event_id: EventId::derive(family.family_id, jurisdiction),
            family_id: family.family_id,
            target_jurisdiction: jurisdiction.to_string(),
            confidence_score: assessment.overall,
            confidence_tier: assessment.tier,
            predicted_filing_window: FilingWindow {
                opens: family.priority_date,
                deadline,
            },
            basis: assessment.basis,
            applicant_unresolved,
        }
    }

    /// Smoothed filing rate for the family's applicant in the target
    /// jurisdiction, plus whether the neutral prior had to stand in for an
    /// unresolvable name.
    fn applicant_rate(&self, family: &PatentFamily, jurisdiction: &str) -> (f64, bool) {
        match family.applicant_canonical_name.as_deref() {
            Some(name) => (self.profiles.get(name, jurisdiction).smoothed_rate(), false),
            None => (0.5, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::profile::Outcome;
    use crate::record::{PatentRecord, RecordSource};
    use crate::store::{InMemoryProfileStore, ProfileStore};

    fn member(country: &str, number: &str, priority_date: NaiveDate) -> PatentRecord {
        PatentRecord {
            source: RecordSource::InternationalOffice,
            country_code: country.to_string(),
            publication_number: number.to_string(),
            kind_code: None,
            priority_number: None,
            priority_date,
            pct_application_number: None,
            applicant_name: None,
            filing_date: None,
            publication_date: None,
        }
    }

    fn family(
        pct: Option<&str>,
        applicant: Option<&str>,
        priority_date: NaiveDate,
        countries: &[&str],
    ) -> PatentFamily {
        let mut members = BTreeMap::new();
        for (i, country) in countries.iter().enumerate() {
            let number = format!("{country}{i}00");
            members.insert(
                ((*country).to_string(), number.clone()),
                member(country, &number, priority_date),
            );
        }
        PatentFamily {
            family_id: FamilyId::derive(pct.unwrap_or("STANDALONE")),
            pct_number: pct.map(ToString::to_string),
            canonical_key: pct.unwrap_or("STANDALONE").to_string(),
            priority_date,
            applicant_canonical_name: applicant.map(ToString::to_string),
            observed_applicants: Vec::new(),
            members,
        }
    }

    fn snapshot_with(name: &str, filed: usize, unfiled: usize) -> ProfileSnapshot {
        let store = InMemoryProfileStore::new();
        for _ in 0..filed {
            store
                .record_outcome(name, "BR", Outcome { had_pct_family: true, filed_in_jurisdiction: true })
                .unwrap();
        }
        for _ in 0..unfiled {
            store
                .record_outcome(name, "BR", Outcome { had_pct_family: true, filed_in_jurisdiction: false })
                .unwrap();
        }
        store.snapshot().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    #[test]
    fn confirmed_pair_never_produces_an_event() {
        let config = InferenceConfig::default();
        let profiles = ProfileSnapshot::default();
        let engine = InferenceEngine::new(&config, &profiles, today());
        // Recent priority, open window, but BR already confirmed.
        let fam = family(
            Some("WO2025100000"),
            Some("Acme"),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &["WO", "BR"],
        );
        assert_eq!(
            engine.filing_state(&fam, "BR"),
            FilingState::NotApplicable(SkipReason::ConfirmedFiling)
        );
        assert!(engine.infer(&[fam]).is_empty());
    }

    #[test]
    fn open_window_candidate_is_scored_once() {
        let config = InferenceConfig::default();
        let profiles = snapshot_with("Acme", 9, 1);
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(
            Some("WO2025100000"),
            Some("Acme"),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &["WO", "US", "EP", "JP", "CN"],
        );
        let events = engine.infer(std::slice::from_ref(&fam));
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.target_jurisdiction, "BR");
        assert_eq!(event.event_id, EventId::derive(fam.family_id, "BR"));
        assert_eq!(event.predicted_filing_window.opens, fam.priority_date);
        assert!(!event.applicant_unresolved);
        assert!(event.confidence_score > 0.0 && event.confidence_score <= 1.0);
    }

    #[test]
    fn passed_deadline_low_rate_applicant_is_closed() {
        let config = InferenceConfig::default();
        // 1 filed of 10 observed: smoothed rate well below the gate.
        let profiles = snapshot_with("Selective", 1, 9);
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(
            Some("WO2020100000"),
            Some("Selective"),
            NaiveDate::from_ymd_opt(2020, 1, 10).unwrap(),
            &["WO", "US"],
        );
        assert_eq!(
            engine.filing_state(&fam, "BR"),
            FilingState::NotApplicable(SkipReason::ClosedWithoutFiling)
        );
    }

    #[test]
    fn passed_deadline_consistent_filer_still_scores_reduced() {
        let config = InferenceConfig::default();
        // 19 of 20 filed: smoothed rate ~0.909, above the gate.
        let profiles = snapshot_with("Consistent", 19, 1);
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(
            Some("WO2020100000"),
            Some("Consistent"),
            NaiveDate::from_ymd_opt(2020, 1, 10).unwrap(),
            &["WO", "US", "EP"],
        );
        let events = engine.infer(std::slice::from_ref(&fam));
        assert_eq!(events.len(), 1);
        let timeline = events[0].basis.timeline.score;
        assert!((timeline - config.timeline.deadline_passed).abs() < f64::EPSILON);
    }

    #[test]
    fn family_without_pct_root_is_skipped() {
        let config = InferenceConfig::default();
        let profiles = ProfileSnapshot::default();
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(None, Some("Acme"), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), &["US"]);
        assert_eq!(
            engine.filing_state(&fam, "BR"),
            FilingState::NotApplicable(SkipReason::NoPctRoot)
        );
    }

    #[test]
    fn unresolved_applicant_uses_neutral_prior_and_flags_event() {
        let config = InferenceConfig::default();
        let profiles = ProfileSnapshot::default();
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(
            Some("WO2025100000"),
            None,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &["WO"],
        );
        let events = engine.infer(&[fam]);
        assert_eq!(events.len(), 1);
        assert!(events[0].applicant_unresolved);
        assert!((events[0].basis.applicant.score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn jurisdiction_deadline_override_changes_window() {
        let mut config = InferenceConfig::default();
        config.deadlines.overrides.insert("BR".to_string(), 31);
        let profiles = ProfileSnapshot::default();
        let engine = InferenceEngine::new(&config, &profiles, today());
        let fam = family(
            Some("WO2025100000"),
            Some("Acme"),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            &["WO"],
        );
        assert_eq!(
            engine.deadline_for(&fam, "BR"),
            NaiveDate::from_ymd_opt(2027, 8, 10).unwrap()
        );
    }

    #[test]
    fn event_ids_are_deterministic() {
        let fid = FamilyId::derive("WO2016170102");
        assert_eq!(EventId::derive(fid, "BR"), EventId::derive(fid, "BR"));
        assert_ne!(EventId::derive(fid, "BR"), EventId::derive(fid, "MX"));
    }
}
