//! Named, versioned configuration for scoring, tiers, and statutory periods.
//!
//! Every heuristic constant in the engine lives here under a version tag so
//! that recalibrations are auditable and testable independently of the
//! scoring logic. Nothing in the inference or cliff code carries inline
//! threshold literals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Weights of the four confidence components. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the statutory-deadline proximity component.
    pub timeline: f64,
    /// Weight of the applicant historical filing rate component.
    pub applicant: f64,
    /// Weight of the jurisdiction market relevance component.
    pub market: f64,
    /// Weight of the family breadth component.
    pub family: f64,
    /// Calibration version tag, recorded in every score basis.
    #[serde(skip_deserializing, default = "weights_version_default")]
    pub version: &'static str,
}

fn weights_version_default() -> &'static str {
    ScoringWeights::V30.version
}

impl ScoringWeights {
    /// Hybrid weighting calibrated against historical national-phase data.
    pub const V30: Self = Self {
        timeline: 0.30,
        applicant: 0.40,
        market: 0.20,
        family: 0.10,
        version: "weights-v30",
    };

    /// Validates that the weights form a convex combination.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WeightsNotNormalized`] if the weights do
    /// not sum to 1.0 within a small tolerance, or `RateOutOfRange` if any
    /// single weight leaves [0, 1].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("timeline", self.timeline),
            ("applicant", self.applicant),
            ("market", self.market),
            ("family", self.family),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::RateOutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        let sum = self.timeline + self.applicant + self.market + self.family;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ValidationError::WeightsNotNormalized { sum });
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::V30
    }
}

/// Lower bounds of each confidence tier (closed-lower, open-upper; the top
/// tier is closed at 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Lower bound of the PREDICTED tier.
    pub predicted: f64,
    /// Lower bound of the EXPECTED tier.
    pub expected: f64,
    /// Lower bound of the INFERRED tier.
    pub inferred: f64,
    /// Lower bound of the FOUND tier.
    pub found: f64,
    /// Calibration version tag.
    #[serde(skip_deserializing, default = "tiers_version_default")]
    pub version: &'static str,
}

fn tiers_version_default() -> &'static str {
    TierThresholds::V304.version
}

impl TierThresholds {
    /// Recalibrated thresholds (the v30.4 revision of the scoring model).
    pub const V304: Self = Self {
        predicted: 0.40,
        expected: 0.58,
        inferred: 0.72,
        found: 0.85,
        version: "tiers-v30.4",
    };

    /// Validates strict ascending order within (0.0, 1.0).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ThresholdsNotAscending`] when any boundary
    /// pair is out of order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let bounds = [
            ("predicted", self.predicted),
            ("expected", self.expected),
            ("inferred", self.inferred),
            ("found", self.found),
        ];
        let mut prev = 0.0;
        let mut prev_name = "zero";
        for (name, value) in bounds {
            if value <= prev || value >= 1.0 {
                return Err(ValidationError::ThresholdsNotAscending {
                    detail: format!("{name} ({value}) must exceed {prev_name} ({prev}) and stay below 1.0"),
                });
            }
            prev = value;
            prev_name = name;
        }
        Ok(())
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::V304
    }
}

/// Step values for the deadline-proximity component.
///
/// The score rises as the national-phase deadline approaches; a deadline
/// that has already passed without an observed filing scores markedly lower
/// but never zero, since late entries remain legally possible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineSteps {
    /// More than twelve months until the deadline.
    pub very_early: f64,
    /// Six to twelve months out.
    pub typical: f64,
    /// Three to six months out.
    pub approaching: f64,
    /// Under three months out.
    pub imminent: f64,
    /// Deadline already passed without an observed filing.
    pub deadline_passed: f64,
    /// Calibration version tag.
    #[serde(skip_deserializing, default = "timeline_version_default")]
    pub version: &'static str,
}

fn timeline_version_default() -> &'static str {
    TimelineSteps::V30.version
}

impl TimelineSteps {
    /// Step values from the v30 calibration, with the passed-deadline score
    /// lowered so unfiled late entries rank below every open window.
    pub const V30: Self = Self {
        very_early: 0.70,
        typical: 0.85,
        approaching: 0.92,
        imminent: 0.95,
        deadline_passed: 0.35,
        version: "timeline-v30",
    };
}

impl Default for TimelineSteps {
    fn default() -> Self {
        Self::V30
    }
}

/// Step values for the family-breadth component, keyed by how many distinct
/// jurisdictions hold confirmed filings. Small families are penalized rather
/// than scored neutrally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FamilyBreadthSteps {
    /// Twenty or more jurisdictions.
    pub global: f64,
    /// Fifteen to nineteen jurisdictions.
    pub broad: f64,
    /// Eight to fourteen jurisdictions.
    pub regional: f64,
    /// Four to seven jurisdictions.
    pub moderate: f64,
    /// Fewer than four jurisdictions.
    pub narrow: f64,
    /// Calibration version tag.
    #[serde(skip_deserializing, default = "breadth_version_default")]
    pub version: &'static str,
}

fn breadth_version_default() -> &'static str {
    FamilyBreadthSteps::V30.version
}

impl FamilyBreadthSteps {
    /// Step values from the v30 calibration.
    pub const V30: Self = Self {
        global: 0.95,
        broad: 0.88,
        regional: 0.75,
        moderate: 0.60,
        narrow: 0.45,
        version: "breadth-v30",
    };

    /// Validates that every step stays in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RateOutOfRange`] for an out-of-range step.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("breadth.global", self.global),
            ("breadth.broad", self.broad),
            ("breadth.regional", self.regional),
            ("breadth.moderate", self.moderate),
            ("breadth.narrow", self.narrow),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::RateOutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for FamilyBreadthSteps {
    fn default() -> Self {
        Self::V30
    }
}

/// Lower bounds of the qualitative applicant filing-pattern labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilingPatternCutoffs {
    /// Lower bound of the always-files label.
    pub always: f64,
    /// Lower bound of the frequently-files label.
    pub frequently: f64,
    /// Lower bound of the sometimes-files label.
    pub sometimes: f64,
    /// Lower bound of the rarely-files label.
    pub rarely: f64,
    /// Calibration version tag.
    #[serde(skip_deserializing, default = "patterns_version_default")]
    pub version: &'static str,
}

fn patterns_version_default() -> &'static str {
    FilingPatternCutoffs::V30.version
}

impl FilingPatternCutoffs {
    /// Label boundaries from the v30 calibration.
    pub const V30: Self = Self {
        always: 0.90,
        frequently: 0.70,
        sometimes: 0.40,
        rarely: 0.10,
        version: "patterns-v30",
    };
}

impl Default for FilingPatternCutoffs {
    fn default() -> Self {
        Self::V30
    }
}

/// Statutory national-phase entry deadlines, in months after the earliest
/// priority date, keyed by jurisdiction.
///
/// The treaty deadline is not one universal number: most PCT states use 30
/// months, several use 31, and regional routes differ. Unlisted
/// jurisdictions fall back to `default_months`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineTable {
    /// Fallback deadline for jurisdictions without an override.
    pub default_months: u32,
    /// Per-jurisdiction overrides (uppercase country code).
    pub overrides: HashMap<String, u32>,
}

impl DeadlineTable {
    /// The common PCT Article 22/39 default.
    pub const DEFAULT_MONTHS: u32 = 30;

    /// Months after the priority date before national-phase entry closes in
    /// the given jurisdiction.
    #[must_use]
    pub fn months_for(&self, jurisdiction: &str) -> u32 {
        self.overrides
            .get(jurisdiction)
            .copied()
            .unwrap_or(self.default_months)
    }
}

impl Default for DeadlineTable {
    fn default() -> Self {
        Self {
            default_months: Self::DEFAULT_MONTHS,
            overrides: HashMap::new(),
        }
    }
}

/// Static market relevance weights per jurisdiction.
///
/// These are inputs to the engine, not computed by it. Values are clamped to
/// [0, 1] when read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketWeights {
    /// Weight for jurisdictions without an explicit entry.
    pub default_weight: f64,
    /// Per-jurisdiction relevance weights.
    pub weights: HashMap<String, f64>,
}

impl MarketWeights {
    /// Baseline relevance applied when no jurisdiction entry exists.
    pub const DEFAULT_WEIGHT: f64 = 0.80;

    /// Relevance weight for a jurisdiction, clamped to [0, 1].
    #[must_use]
    pub fn weight_for(&self, jurisdiction: &str) -> f64 {
        self.weights
            .get(jurisdiction)
            .copied()
            .unwrap_or(self.default_weight)
            .clamp(0.0, 1.0)
    }
}

impl Default for MarketWeights {
    fn default() -> Self {
        Self {
            default_weight: Self::DEFAULT_WEIGHT,
            weights: HashMap::new(),
        }
    }
}

/// Configuration of the predictive inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Component weights.
    pub weights: ScoringWeights,
    /// Tier classification boundaries.
    pub thresholds: TierThresholds,
    /// Deadline-proximity step values.
    pub timeline: TimelineSteps,
    /// Family-breadth step values.
    pub breadth: FamilyBreadthSteps,
    /// Jurisdiction-keyed statutory deadlines.
    pub deadlines: DeadlineTable,
    /// Static market relevance table.
    pub market: MarketWeights,
    /// Jurisdictions to predict filings for.
    pub target_jurisdictions: Vec<String>,
    /// Minimum smoothed filing rate for an applicant to stay a candidate
    /// after the statutory deadline has passed unobserved.
    pub late_entry_min_rate: f64,
}

impl InferenceConfig {
    /// Smoothed-rate gate for post-deadline candidates.
    pub const LATE_ENTRY_MIN_RATE: f64 = 0.70;

    /// Validates the full inference configuration.
    ///
    /// # Errors
    ///
    /// Propagates weight and threshold validation failures, and rejects
    /// empty jurisdiction codes or out-of-range gate rates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.breadth.validate()?;
        if !(0.0..=1.0).contains(&self.late_entry_min_rate) {
            return Err(ValidationError::RateOutOfRange {
                field: "late_entry_min_rate".to_string(),
                value: self.late_entry_min_rate,
            });
        }
        for code in &self.target_jurisdictions {
            if code.trim().is_empty() || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ValidationError::InvalidJurisdiction { code: code.clone() });
            }
        }
        if self.deadlines.default_months == 0 {
            return Err(ValidationError::ZeroStatutoryPeriod {
                field: "deadlines.default_months".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: TierThresholds::default(),
            timeline: TimelineSteps::default(),
            breadth: FamilyBreadthSteps::default(),
            deadlines: DeadlineTable::default(),
            market: MarketWeights::default(),
            target_jurisdictions: vec!["BR".to_string()],
            late_entry_min_rate: Self::LATE_ENTRY_MIN_RATE,
        }
    }
}

/// Configuration of the cliff analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffConfig {
    /// Statutory patent term in months (20 years).
    pub term_months: u32,
    /// Upper bound on emitted predicted cliff entries.
    pub max_predicted_entries: usize,
}

impl CliffConfig {
    /// The standard 20-year term.
    pub const TERM_MONTHS: u32 = 240;
    /// Default cap on predicted cliff entries.
    pub const MAX_PREDICTED_ENTRIES: usize = 100;

    /// Validates the cliff configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroStatutoryPeriod`] for a zero term.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.term_months == 0 {
            return Err(ValidationError::ZeroStatutoryPeriod {
                field: "term_months".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CliffConfig {
    fn default() -> Self {
        Self {
            term_months: Self::TERM_MONTHS,
            max_predicted_entries: Self::MAX_PREDICTED_ENTRIES,
        }
    }
}

/// Configuration of the record normalizer's date fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Statutory months between priority date and international publication,
    /// used to back-derive a missing priority date from a publication date.
    pub publication_offset_months: u32,
    /// Conservative offset subtracted from the normalization clock when no
    /// date field at all can be recovered.
    pub clock_offset_months: u32,
}

impl NormalizerConfig {
    /// PCT publication happens 18 months after priority.
    pub const PUBLICATION_OFFSET_MONTHS: u32 = 18;

    /// Validates the normalizer configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroStatutoryPeriod`] for zero offsets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.publication_offset_months == 0 {
            return Err(ValidationError::ZeroStatutoryPeriod {
                field: "publication_offset_months".to_string(),
            });
        }
        if self.clock_offset_months == 0 {
            return Err(ValidationError::ZeroStatutoryPeriod {
                field: "clock_offset_months".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            publication_offset_months: Self::PUBLICATION_OFFSET_MONTHS,
            clock_offset_months: Self::PUBLICATION_OFFSET_MONTHS,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Normalizer fallback offsets.
    pub normalizer: NormalizerConfig,
    /// Predictive inference configuration.
    pub inference: InferenceConfig,
    /// Cliff analyzer configuration.
    pub cliff: CliffConfig,
}

impl EngineConfig {
    /// Validates all sections.
    ///
    /// # Errors
    ///
    /// Propagates the first section-level validation failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.normalizer.validate()?;
        self.inference.validate()?;
        self.cliff.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.inference.weights.version, "weights-v30");
        assert_eq!(back.inference.thresholds.version, "tiers-v30.4");
        assert_eq!(back.inference.timeline.version, "timeline-v30");
        assert_eq!(back.inference.breadth.version, "breadth-v30");
        assert_eq!(back, config);
    }

    #[test]
    fn out_of_range_breadth_step_rejected() {
        let mut steps = FamilyBreadthSteps::V30;
        steps.regional = 1.2;
        let err = steps.validate().unwrap_err();
        assert!(matches!(err, ValidationError::RateOutOfRange { .. }));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut weights = ScoringWeights::V30;
        weights.market = 0.25;
        let err = weights.validate().unwrap_err();
        assert!(matches!(err, ValidationError::WeightsNotNormalized { .. }));
    }

    #[test]
    fn thresholds_must_ascend() {
        let mut thresholds = TierThresholds::V304;
        thresholds.inferred = 0.50;
        let err = thresholds.validate().unwrap_err();
        assert!(matches!(err, ValidationError::ThresholdsNotAscending { .. }));
    }

    #[test]
    fn deadline_table_prefers_override() {
        let mut table = DeadlineTable::default();
        table.overrides.insert("EP".to_string(), 31);
        assert_eq!(table.months_for("EP"), 31);
        assert_eq!(table.months_for("BR"), 30);
    }

    #[test]
    fn market_weight_is_clamped() {
        let mut market = MarketWeights::default();
        market.weights.insert("US".to_string(), 1.7);
        assert!((market.weight_for("US") - 1.0).abs() < f64::EPSILON);
        assert!((market.weight_for("BR") - 0.80).abs() < f64::EPSILON);
    }

    #[test]
    fn lowercase_jurisdiction_rejected() {
        let mut config = InferenceConfig::default();
        config.target_jurisdictions.push("br".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJurisdiction { .. }));
    }
}
