//! Confidence scoring: component scores, weighted combination, tiers.
//!
//! All step values, weights, and tier boundaries come from the named,
//! versioned tables in [`crate::config`]; nothing here carries inline
//! calibration literals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{FamilyBreadthSteps, ScoringWeights, TierThresholds, TimelineSteps};

/// Discrete confidence classification, ascending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    /// Purely future-looking; little supporting evidence.
    Speculative,
    /// Lower-confidence statistical prediction.
    Predicted,
    /// Anticipated from applicant filing patterns.
    Expected,
    /// Strong evidence from the PCT family and statutory timeline.
    Inferred,
    /// Very high certainty; a filing almost certainly exists unpublished.
    Found,
}

impl ConfidenceTier {
    /// Classifies a score against fixed thresholds.
    ///
    /// Boundaries are closed-lower/open-upper; the top tier is closed at
    /// 1.0, so a score of exactly 0.72 is `Inferred` and 0.7199 is
    /// `Expected`.
    #[must_use]
    pub fn classify(score: f64, thresholds: &TierThresholds) -> Self {
        if score >= thresholds.found {
            Self::Found
        } else if score >= thresholds.inferred {
            Self::Inferred
        } else if score >= thresholds.expected {
            Self::Expected
        } else if score >= thresholds.predicted {
            Self::Predicted
        } else {
            Self::Speculative
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speculative => write!(f, "SPECULATIVE"),
            Self::Predicted => write!(f, "PREDICTED"),
            Self::Expected => write!(f, "EXPECTED"),
            Self::Inferred => write!(f, "INFERRED"),
            Self::Found => write!(f, "FOUND"),
        }
    }
}

/// One weighted component of the overall confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    /// Component score in [0, 1].
    pub score: f64,
    /// Weight applied in the combination.
    pub weight: f64,
}

/// Which factors contributed what to an event's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBasis {
    /// Statutory-deadline proximity component.
    pub timeline: ComponentScore,
    /// Applicant historical behavior component.
    pub applicant: ComponentScore,
    /// Jurisdiction market relevance component.
    pub market: ComponentScore,
    /// Family breadth component.
    pub family: ComponentScore,
    /// Version tag of the weight calibration used.
    #[serde(skip_deserializing)]
    pub weights_version: &'static str,
}

impl ScoreBasis {
    /// The weighted combination, clamped to [0, 1].
    #[must_use]
    pub fn overall(&self) -> f64 {
        let combined = self.timeline.score * self.timeline.weight
            + self.applicant.score * self.applicant.weight
            + self.market.score * self.market.weight
            + self.family.score * self.family.weight;
        combined.clamp(0.0, 1.0)
    }
}

/// Where the target jurisdiction's deadline stands relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    /// Deadline still open; days remaining.
    Open {
        /// Days until the statutory deadline.
        days_remaining: i64,
    },
    /// Deadline passed without an observed filing; late entry remains
    /// legally possible under exceptions.
    Passed {
        /// Days since the deadline.
        days_overdue: i64,
    },
}

/// Deadline-proximity score: rises as the open window shrinks; a passed
/// deadline scores markedly lower but never zero.
#[must_use]
pub fn timeline_score(status: DeadlineStatus, steps: &TimelineSteps) -> f64 {
    match status {
        DeadlineStatus::Open { days_remaining } => {
            if days_remaining > 365 {
                steps.very_early
            } else if days_remaining > 180 {
                steps.typical
            } else if days_remaining > 90 {
                steps.approaching
            } else {
                steps.imminent
            }
        }
        DeadlineStatus::Passed { .. } => steps.deadline_passed,
    }
}

/// Family breadth score, keyed on distinct jurisdictions with confirmed
/// filings. A broad family signals an asset worth filing everywhere.
#[must_use]
pub fn family_strength_score(distinct_jurisdictions: usize, steps: &FamilyBreadthSteps) -> f64 {
    if distinct_jurisdictions >= 20 {
        steps.global
    } else if distinct_jurisdictions >= 15 {
        steps.broad
    } else if distinct_jurisdictions >= 8 {
        steps.regional
    } else if distinct_jurisdictions >= 4 {
        steps.moderate
    } else {
        steps.narrow
    }
}

/// A fully assembled confidence assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    /// Combined score in [0, 1].
    pub overall: f64,
    /// Tier classification of the combined score.
    pub tier: ConfidenceTier,
    /// Per-component breakdown.
    pub basis: ScoreBasis,
}

/// Combines the four component scores under the configured weights and
/// classifies the result.
#[must_use]
pub fn assess(
    deadline: DeadlineStatus,
    applicant_rate: f64,
    market_weight: f64,
    distinct_jurisdictions: usize,
    weights: &ScoringWeights,
    steps: &TimelineSteps,
    breadth: &FamilyBreadthSteps,
    thresholds: &TierThresholds,
) -> ConfidenceAssessment {
    let basis = ScoreBasis {
        timeline: ComponentScore {
            score: timeline_score(deadline, steps),
            weight: weights.timeline,
        },
        applicant: ComponentScore {
            score: applicant_rate.clamp(0.0, 1.0),
            weight: weights.applicant,
        },
        market: ComponentScore {
            score: market_weight.clamp(0.0, 1.0),
            weight: weights.market,
        },
        family: ComponentScore {
            score: family_strength_score(distinct_jurisdictions, breadth),
            weight: weights.family,
        },
        weights_version: weights.version,
    };
    let overall = basis.overall();
    ConfidenceAssessment {
        overall,
        tier: ConfidenceTier::classify(overall, thresholds),
        basis,
    }
}
