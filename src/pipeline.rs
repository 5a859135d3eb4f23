//! The search pipeline: normalize, resolve, reconcile, infer, analyze.
//!
//! One `run` is a single resolution pass over a batch of raw records. The
//! pass is read-only against the applicant store until the very end, when
//! confirmed outcomes feed back into it; a store failure during feedback
//! degrades the learning step but never invalidates the report already
//! produced.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::cliff::{CliffAnalyzer, CliffReport};
use crate::config::EngineConfig;
use crate::error::PatfamResult;
use crate::family::PatentFamily;
use crate::inference::{ConfidenceTier, InferenceEngine, InferredEvent};
use crate::merge::{reconcile, ConflictAnnotation};
use crate::normalize::{DataQualityEvent, Normalizer};
use crate::record::RawRecord;
use crate::resolver::resolve;
use crate::store::{ProfileSnapshot, ProfileStore, StoreError};
use crate::profile::Outcome;

/// Everything one resolution pass produced.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Reference date the pass ran under.
    pub reference_date: NaiveDate,
    /// Finalized families, ordered by family identifier.
    pub families: Vec<PatentFamily>,
    /// Field-level conflicts reconciled during merging.
    pub conflicts: Vec<ConflictAnnotation>,
    /// Predicted filings, ordered by event identifier.
    pub inferred_events: Vec<InferredEvent>,
    /// Expiration projections over confirmed and predicted filings.
    pub cliff: CliffReport,
    /// Repairs and drops observed during normalization and resolution.
    pub quality_events: Vec<DataQualityEvent>,
    /// Count of raw records dropped for missing linkage.
    pub dropped_records: usize,
    /// Inferred events per confidence tier.
    pub tier_counts: BTreeMap<ConfidenceTier, usize>,
}

/// What the learning feedback step recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearningUpdate {
    /// Families that contributed outcomes (PCT root and resolved applicant).
    pub families_learned: usize,
    /// Individual outcomes written to the store.
    pub outcomes_recorded: usize,
}

/// A report plus the result of feeding outcomes back into the store.
///
/// The two are separate on purpose: a store write failure is reported next
/// to, not instead of, the analysis it could not learn from.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The analysis of this pass.
    pub report: SearchReport,
    /// Learning feedback result, degraded independently of the report.
    pub learning: Result<LearningUpdate, StoreError>,
}

/// Orchestrates one resolution pass end to end.
pub struct SearchPipeline {
    config: EngineConfig,
    store: Arc<dyn ProfileStore>,
}

impl fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SearchPipeline {
    /// Creates a pipeline over a validated configuration and a store.
    ///
    /// # Errors
    ///
    /// Returns a validation error when any configuration section is
    /// inconsistent; a pipeline is never constructed over a bad config.
    pub fn new(config: EngineConfig, store: Arc<dyn ProfileStore>) -> PatfamResult<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Runs one pass with today's date as the reference.
    #[must_use]
    pub fn run(&self, raw_records: &[RawRecord]) -> SearchOutcome {
        self.run_at(raw_records, Utc::now().date_naive())
    }

    /// Runs one pass with an explicit reference date.
    #[must_use]
    pub fn run_at(&self, raw_records: &[RawRecord], today: NaiveDate) -> SearchOutcome {
        let normalizer = Normalizer::new(self.config.normalizer, today);
        let batch = normalizer.normalize(raw_records);
        let dropped_records = batch.dropped;
        let mut quality_events = batch.quality_events;

        let resolution = resolve(batch.records);
        quality_events.extend(resolution.quality_events);

        let mut families = Vec::with_capacity(resolution.families.len());
        let mut conflicts = Vec::new();
        for resolved in resolution.families {
            let reconciled = reconcile(resolved);
            conflicts.extend(reconciled.conflicts);
            families.push(reconciled.family);
        }

        // An unreadable store degrades scoring to the neutral prior for
        // every applicant; the pass itself still completes.
        let profiles = match self.store.snapshot() {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(%error, "profile snapshot unavailable, scoring with neutral priors");
                ProfileSnapshot::default()
            }
        };

        let engine = InferenceEngine::new(&self.config.inference, &profiles, today);
        let inferred_events = engine.infer(&families);

        let analyzer = CliffAnalyzer::new(self.config.cliff, today);
        let cliff = analyzer.analyze(&families, &inferred_events);

        let mut tier_counts: BTreeMap<ConfidenceTier, usize> = BTreeMap::new();
        for event in &inferred_events {
            *tier_counts.entry(event.confidence_tier).or_default() += 1;
        }

        let learning = self.learn(&families);

        tracing::info!(
            families = families.len(),
            events = inferred_events.len(),
            conflicts = conflicts.len(),
            dropped = dropped_records,
            "resolution pass complete"
        );

        SearchOutcome {
            report: SearchReport {
                reference_date: today,
                families,
                conflicts,
                inferred_events,
                cliff,
                quality_events,
                dropped_records,
                tier_counts,
            },
            learning,
        }
    }

    /// Feeds confirmed outcomes back into the applicant store.
    ///
    /// Only families with a PCT root and a resolved applicant teach the
    /// model; one outcome is recorded per target jurisdiction, positive when
    /// the family holds a confirmed filing there.
    fn learn(&self, families: &[PatentFamily]) -> Result<LearningUpdate, StoreError> {
        let mut update = LearningUpdate::default();
        for family in families {
            if !family.has_pct_root() {
                continue;
            }
            let Some(applicant) = family.applicant_canonical_name.as_deref() else {
                continue;
            };
            for jurisdiction in &self.config.inference.target_jurisdictions {
                self.store.record_outcome(
                    applicant,
                    jurisdiction,
                    Outcome {
                        had_pct_family: true,
                        filed_in_jurisdiction: family.has_filing_in(jurisdiction),
                    },
                )?;
                update.outcomes_recorded += 1;
            }
            update.families_learned += 1;
        }
        tracing::debug!(
            families = update.families_learned,
            outcomes = update.outcomes_recorded,
            "applicant learning feedback applied"
        );
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;
    use crate::store::InMemoryProfileStore;

    fn pipeline() -> SearchPipeline {
        SearchPipeline::new(EngineConfig::default(), Arc::new(InMemoryProfileStore::new()))
            .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn wo_record(number: &str, priority_date: &str, applicant: &str) -> RawRecord {
        RawRecord::from_pairs(
            RecordSource::PctRegistry,
            [
                ("wo_number", number),
                ("country", "WO"),
                ("priority_date", priority_date),
                ("applicant", applicant),
            ],
        )
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.inference.weights.market = 0.5;
        let err = SearchPipeline::new(config, Arc::new(InMemoryProfileStore::new())).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn open_window_family_yields_prediction_and_cliff_entries() {
        let pipeline = pipeline();
        let raw = vec![wo_record("WO2025100000", "2025-01-10", "Acme Pharma Ltd.")];
        let outcome = pipeline.run_at(&raw, today());
        let report = outcome.report;

        assert_eq!(report.families.len(), 1);
        assert_eq!(report.inferred_events.len(), 1);
        assert_eq!(report.inferred_events[0].target_jurisdiction, "BR");
        assert_eq!(report.cliff.confirmed.len(), 1);
        assert_eq!(report.cliff.predicted.len(), 1);
        assert_eq!(report.tier_counts.values().sum::<usize>(), 1);
    }

    #[test]
    fn learning_records_one_outcome_per_target_jurisdiction() {
        let store = Arc::new(InMemoryProfileStore::new());
        let pipeline =
            SearchPipeline::new(EngineConfig::default(), Arc::clone(&store) as Arc<dyn ProfileStore>)
                .unwrap();
        let raw = vec![wo_record("WO2025100000", "2025-01-10", "Acme Pharma Ltd.")];
        let outcome = pipeline.run_at(&raw, today());

        let learning = outcome.learning.unwrap();
        assert_eq!(learning.families_learned, 1);
        assert_eq!(learning.outcomes_recorded, 1);
        let profile = store.get_profile("Acme Pharma Ltd", "BR").unwrap();
        assert_eq!(profile.observed_filings_count, 1);
        assert_eq!(profile.target_filings_count, 0);
    }

    #[test]
    fn family_without_pct_root_neither_predicts_nor_learns() {
        let store = Arc::new(InMemoryProfileStore::new());
        let pipeline =
            SearchPipeline::new(EngineConfig::default(), Arc::clone(&store) as Arc<dyn ProfileStore>)
                .unwrap();
        let raw = vec![RawRecord::from_pairs(
            RecordSource::NationalOffice,
            [
                ("patent_number", "BRPI1011363"),
                ("country", "BR"),
                ("priority_date", "2010-06-01"),
                ("applicant", "Local Filer S.A."),
            ],
        )];
        let outcome = pipeline.run_at(&raw, today());
        assert!(outcome.report.inferred_events.is_empty());
        assert_eq!(outcome.learning.unwrap(), LearningUpdate::default());
        assert!(store.is_empty());
    }

    #[test]
    fn unlinkable_records_are_dropped_and_reported() {
        let pipeline = pipeline();
        let raw = vec![RawRecord::from_pairs(
            RecordSource::CommercialAggregator,
            [("title", "no identifiers at all")],
        )];
        let outcome = pipeline.run_at(&raw, today());
        assert!(outcome.report.families.is_empty());
        assert_eq!(outcome.report.dropped_records, 1);
        assert!(!outcome.report.quality_events.is_empty());
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let pipeline = pipeline();
        let raw = vec![
            wo_record("WO2025100000", "2025-01-10", "Acme Pharma Ltd."),
            wo_record("WO2025200000", "2025-03-01", "Other Corp."),
        ];
        let first = pipeline.run_at(&raw, today()).report;
        let second = pipeline.run_at(&raw, today()).report;

        let first_ids: Vec<_> = first.families.iter().map(|f| f.family_id).collect();
        let second_ids: Vec<_> = second.families.iter().map(|f| f.family_id).collect();
        assert_eq!(first_ids, second_ids);
        let first_events: Vec<_> = first.inferred_events.iter().map(|e| e.event_id).collect();
        let second_events: Vec<_> = second.inferred_events.iter().map(|e| e.event_id).collect();
        assert_eq!(first_events, second_events);
    }
}
