//! Cliff Analyzer: statutory expiration projections.
//!
//! Confirmed expirations are calendar-exact: priority date plus the 20-year
//! term. Predicted expirations project from an inferred event's filing
//! window start. Each entry carries a risk bucket by years remaining.

use std::collections::BTreeSet;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::CliffConfig;
use crate::family::{FamilyId, PatentFamily};
use crate::inference::{EventId, InferredEvent};

/// Urgency bucket by years until expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBucket {
    /// Five years or less (including already expired).
    High,
    /// More than five, up to ten years.
    Medium,
    /// More than ten years.
    Low,
}

impl RiskBucket {
    /// Classifies by years remaining.
    #[must_use]
    pub fn from_years_until(years: f64) -> Self {
        if years <= 5.0 {
            Self::High
        } else if years <= 10.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Whether a cliff entry derives from a confirmed filing or a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliffKind {
    /// Derived from an actual priority/filing date.
    Confirmed,
    /// Derived from an inferred event's predicted window.
    Predicted,
}

/// One expiration projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliffEntry {
    /// Confirmed or predicted.
    pub kind: CliffKind,
    /// Family the projection belongs to.
    pub family_id: FamilyId,
    /// The inferred event behind a predicted entry.
    pub event_id: Option<EventId>,
    /// Date the term runs from.
    pub basis_date: NaiveDate,
    /// Projected expiration.
    pub expiration: NaiveDate,
    /// Years from the analysis date to expiration (negative when expired).
    pub years_until: f64,
    /// True when the projection is already in the past.
    pub expired: bool,
    /// Urgency bucket.
    pub risk: RiskBucket,
}

/// Aggregate view over one cliff list for downstream reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffSummary {
    /// Earliest expiration in the list.
    pub earliest: Option<NaiveDate>,
    /// Latest expiration in the list.
    pub latest: Option<NaiveDate>,
    /// Distinct calendar years appearing, ascending ("critical years").
    pub critical_years: Vec<i32>,
}

impl CliffSummary {
    fn over(entries: &[CliffEntry]) -> Self {
        let years: BTreeSet<i32> = entries
            .iter()
            .map(|e| {
                use chrono::Datelike;
                e.expiration.year()
            })
            .collect();
        Self {
            earliest: entries.iter().map(|e| e.expiration).min(),
            latest: entries.iter().map(|e| e.expiration).max(),
            critical_years: years.into_iter().collect(),
        }
    }
}

/// Both cliff lists with their summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliffReport {
    /// One entry per confirmed family, earliest expiration first.
    pub confirmed: Vec<CliffEntry>,
    /// One entry per inferred event, earliest first, capped.
    pub predicted: Vec<CliffEntry>,
    /// Aggregates over the confirmed list.
    pub confirmed_summary: CliffSummary,
    /// Aggregates over the predicted list (after capping).
    pub predicted_summary: CliffSummary,
}

/// The Cliff Analyzer for one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct CliffAnalyzer {
    config: CliffConfig,
    today: NaiveDate,
}

impl CliffAnalyzer {
    /// Creates an analyzer with an explicit analysis date.
    #[must_use]
    pub const fn new(config: CliffConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    /// Produces both cliff lists.
    #[must_use]
    pub fn analyze(&self, families: &[PatentFamily], events: &[InferredEvent]) -> CliffReport {
        let mut confirmed: Vec<CliffEntry> = families
            .iter()
            .map(|family| self.entry(CliffKind::Confirmed, family.family_id, None, family.priority_date))
            .collect();
        confirmed.sort_by_key(|e| (e.expiration, e.family_id));

        let mut predicted: Vec<CliffEntry> = events
            .iter()
            .map(|event| {
                self.entry(
                    CliffKind::Predicted,
                    event.family_id,
                    Some(event.event_id),
                    event.predicted_filing_window.opens,
                )
            })
            .collect();
        predicted.sort_by_key(|e| (e.expiration, e.family_id));
        if predicted.len() > self.config.max_predicted_entries {
            tracing::debug!(
                total = predicted.len(),
                cap = self.config.max_predicted_entries,
                "predicted cliff list capped"
            );
            predicted.truncate(self.config.max_predicted_entries);
        }

        CliffReport {
            confirmed_summary: CliffSummary::over(&confirmed),
            predicted_summary: CliffSummary::over(&predicted),
            confirmed,
            predicted,
        }
    }

    fn entry(
        &self,
        kind: CliffKind,
        family_id: FamilyId,
        event_id: Option<EventId>,
        basis_date: NaiveDate,
    ) -> CliffEntry {
        let expiration = basis_date
            .checked_add_months(Months::new(self.config.term_months))
            .unwrap_or(basis_date);
        #[allow(clippy::cast_precision_loss)]
        let years_until = (expiration - self.today).num_days() as f64 / 365.25;
        CliffEntry {
            kind,
            family_id,
            event_id,
            basis_date,
            expiration,
            years_until,
            expired: expiration < self.today,
            risk: RiskBucket::from_years_until(years_until),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::inference::{ConfidenceTier, FilingWindow, ScoreBasis};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn family_with_priority(key: &str, date: NaiveDate) -> PatentFamily {
        PatentFamily {
            family_id: FamilyId::derive(key),
            pct_number: Some(key.to_string()),
            canonical_key: key.to_string(),
            priority_date: date,
            applicant_canonical_name: None,
            observed_applicants: Vec::new(),
            members: BTreeMap::new(),
        }
    }

    fn event_with_window(key: &str, opens: NaiveDate) -> InferredEvent {
        let family_id = FamilyId::derive(key);
        InferredEvent {
            event_id: EventId::derive(family_id, "BR"),
            family_id,
            target_jurisdiction: "BR".to_string(),
            confidence_score: 0.6,
            confidence_tier: ConfidenceTier::Expected,
            predicted_filing_window: FilingWindow {
                opens,
                deadline: opens,
            },
            basis: ScoreBasis {
                timeline: crate::inference::ComponentScore { score: 0.85, weight: 0.3 },
                applicant: crate::inference::ComponentScore { score: 0.5, weight: 0.4 },
                market: crate::inference::ComponentScore { score: 0.8, weight: 0.2 },
                family: crate::inference::ComponentScore { score: 0.45, weight: 0.1 },
                weights_version: "weights-v30",
            },
            applicant_unresolved: false,
        }
    }

    #[test]
    fn confirmed_expiration_is_calendar_exact() {
        let analyzer = CliffAnalyzer::new(CliffConfig::default(), today());
        let fam = family_with_priority("WO1", NaiveDate::from_ymd_opt(2016, 3, 10).unwrap());
        let report = analyzer.analyze(&[fam], &[]);
        assert_eq!(
            report.confirmed[0].expiration,
            NaiveDate::from_ymd_opt(2036, 3, 10).unwrap()
        );
        assert!(!report.confirmed[0].expired);
    }

    #[test]
    fn risk_buckets_by_years_remaining() {
        assert_eq!(RiskBucket::from_years_until(-1.0), RiskBucket::High);
        assert_eq!(RiskBucket::from_years_until(5.0), RiskBucket::High);
        assert_eq!(RiskBucket::from_years_until(5.01), RiskBucket::Medium);
        assert_eq!(RiskBucket::from_years_until(10.0), RiskBucket::Medium);
        assert_eq!(RiskBucket::from_years_until(10.01), RiskBucket::Low);
    }

    #[test]
    fn expired_family_is_flagged() {
        let analyzer = CliffAnalyzer::new(CliffConfig::default(), today());
        let fam = family_with_priority("WO2", NaiveDate::from_ymd_opt(2004, 1, 1).unwrap());
        let report = analyzer.analyze(&[fam], &[]);
        assert!(report.confirmed[0].expired);
        assert_eq!(report.confirmed[0].risk, RiskBucket::High);
        assert!(report.confirmed[0].years_until < 0.0);
    }

    #[test]
    fn predicted_list_is_capped_earliest_first() {
        let config = CliffConfig {
            max_predicted_entries: 2,
            ..CliffConfig::default()
        };
        let analyzer = CliffAnalyzer::new(config, today());
        let events = vec![
            event_with_window("WO-C", NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()),
            event_with_window("WO-A", NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()),
            event_with_window("WO-B", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        ];
        let report = analyzer.analyze(&[], &events);
        assert_eq!(report.predicted.len(), 2);
        assert_eq!(
            report.predicted[0].expiration,
            NaiveDate::from_ymd_opt(2038, 1, 1).unwrap()
        );
        assert_eq!(
            report.predicted[1].expiration,
            NaiveDate::from_ymd_opt(2040, 1, 1).unwrap()
        );
    }

    #[test]
    fn summary_exposes_bounds_and_critical_years() {
        let analyzer = CliffAnalyzer::new(CliffConfig::default(), today());
        let families = vec![
            family_with_priority("WO-A", NaiveDate::from_ymd_opt(2015, 4, 10).unwrap()),
            family_with_priority("WO-B", NaiveDate::from_ymd_opt(2016, 3, 10).unwrap()),
            family_with_priority("WO-C", NaiveDate::from_ymd_opt(2016, 9, 1).unwrap()),
        ];
        let report = analyzer.analyze(&families, &[]);
        let summary = &report.confirmed_summary;
        assert_eq!(summary.earliest, NaiveDate::from_ymd_opt(2035, 4, 10));
        assert_eq!(summary.latest, NaiveDate::from_ymd_opt(2036, 9, 1));
        assert_eq!(summary.critical_years, vec![2035, 2036]);
    }
}
