//! Applicant behavior profiles.
//!
//! A profile is the engine's long-term memory about one applicant in one
//! jurisdiction: how often a PCT family of theirs actually entered it.
//! Counts are kept per (applicant, jurisdiction) pair so a consistent BR
//! filer is not diluted by the same applicant's behavior elsewhere. Rates
//! are Laplace-smoothed so a never-before-seen pair scores a neutral 0.5
//! and no finite sample ever reaches 0.0 or 1.0.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FilingPatternCutoffs;

/// Canonicalizes a raw applicant name for consistent matching.
///
/// Sources disagree on casing, suffix punctuation, and list formatting
/// (`"Bayer AG; Orion Corporation"`). Only the first listed applicant is
/// kept, common suffix dots are normalized, and whitespace is trimmed.
/// Returns `None` for empty/unparseable input.
#[must_use]
pub fn canonicalize_applicant(raw: &str) -> Option<String> {
    let first = raw.split([';', ',']).next()?.trim();
    if first.is_empty() {
        return None;
    }
    let mut name = first.to_string();
    for (from, to) in [
        ("Inc.", "Inc"),
        ("Ltd.", "Ltd"),
        ("S.A.", "SA"),
        ("Co.", "Co"),
        ("Corp.", "Corp"),
    ] {
        name = name.replace(from, to);
    }
    Some(name.trim().to_string())
}

/// Qualitative filing pattern, derived from the smoothed rate. Used by the
/// report layer to phrase applicant behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingPattern {
    /// Rate at or above the always cutoff.
    AlwaysFiles,
    /// Rate at or above the frequently cutoff.
    FrequentlyFiles,
    /// Rate at or above the sometimes cutoff.
    SometimesFiles,
    /// Rate at or above the rarely cutoff.
    RarelyFiles,
    /// Rate below every cutoff.
    NeverFiles,
}

impl FilingPattern {
    /// Classifies a smoothed rate against the configured label boundaries.
    #[must_use]
    pub fn classify(rate: f64, cutoffs: &FilingPatternCutoffs) -> Self {
        if rate >= cutoffs.always {
            Self::AlwaysFiles
        } else if rate >= cutoffs.frequently {
            Self::FrequentlyFiles
        } else if rate >= cutoffs.sometimes {
            Self::SometimesFiles
        } else if rate >= cutoffs.rarely {
            Self::RarelyFiles
        } else {
            Self::NeverFiles
        }
    }
}

impl fmt::Display for FilingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysFiles => write!(f, "always_files"),
            Self::FrequentlyFiles => write!(f, "frequently_files"),
            Self::SometimesFiles => write!(f, "sometimes_files"),
            Self::RarelyFiles => write!(f, "rarely_files"),
            Self::NeverFiles => write!(f, "never_files"),
        }
    }
}

/// One outcome observed for an applicant in one resolved search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the applicant had a PCT family in this search.
    pub had_pct_family: bool,
    /// Whether a confirmed filing in the target jurisdiction was observed.
    pub filed_in_jurisdiction: bool,
}

/// Persistent per-applicant behavior record.
///
/// Created on first encounter, updated after every search that resolves
/// confirmed filings for the applicant, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    /// Canonicalized applicant name.
    pub canonical_name: String,
    /// Jurisdiction the counts refer to.
    pub jurisdiction: String,
    /// Number of PCT-family observations.
    pub observed_filings_count: u64,
    /// Number of those that entered the jurisdiction.
    pub target_filings_count: u64,
    /// Laplace-smoothed filing rate, kept in sync with the counts.
    pub historical_filing_rate: f64,
    /// Last mutation time.
    pub last_updated: DateTime<Utc>,
}

impl ApplicantProfile {
    /// A fresh, never-observed profile with the neutral 0.5 prior.
    #[must_use]
    pub fn neutral(canonical_name: impl Into<String>, jurisdiction: impl Into<String>) -> Self {
        let mut profile = Self {
            canonical_name: canonical_name.into(),
            jurisdiction: jurisdiction.into(),
            observed_filings_count: 0,
            target_filings_count: 0,
            historical_filing_rate: 0.0,
            last_updated: Utc::now(),
        };
        profile.historical_filing_rate = profile.smoothed_rate();
        profile
    }

    /// The Laplace-smoothed rate `(target + 1) / (observed + 2)`.
    ///
    /// Zero observations yield exactly 0.5; any finite counts stay strictly
    /// inside (0, 1).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn smoothed_rate(&self) -> f64 {
        (self.target_filings_count as f64 + 1.0) / (self.observed_filings_count as f64 + 2.0)
    }

    /// Applies one outcome, accumulating counts additively.
    pub fn apply(&mut self, outcome: Outcome) {
        if outcome.had_pct_family {
            self.observed_filings_count += 1;
            if outcome.filed_in_jurisdiction {
                self.target_filings_count += 1;
            }
        }
        self.historical_filing_rate = self.smoothed_rate();
        self.last_updated = Utc::now();
    }

    /// Qualitative label for the smoothed rate under the v30 boundaries.
    #[must_use]
    pub fn filing_pattern(&self) -> FilingPattern {
        FilingPattern::classify(self.smoothed_rate(), &FilingPatternCutoffs::V30)
    }
}
