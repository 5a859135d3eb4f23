//! Error types for patfam.
//!
//! All errors are strongly typed using thiserror. The taxonomy mirrors the
//! way failures actually behave in the engine: validation errors reject bad
//! configuration up front, store errors surface persistence problems, and
//! everything recoverable (malformed dates, unlinkable records, field
//! conflicts) is *not* an error at all: it becomes a logged data-quality
//! event or conflict annotation instead of aborting a resolution pass.

use thiserror::Error;

use crate::store::StoreError;

/// Validation errors raised while checking configuration or inputs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Scoring weights must sum to 1.0 (within tolerance).
    #[error("Scoring weights sum to {sum}, expected 1.0")]
    WeightsNotNormalized {
        /// Actual sum of the four component weights.
        sum: f64,
    },

    /// Tier thresholds must be strictly ascending inside (0.0, 1.0).
    #[error("Tier thresholds are not strictly ascending: {detail}")]
    ThresholdsNotAscending {
        /// Which boundary pair is out of order.
        detail: String,
    },

    /// A rate-like value fell outside [0.0, 1.0].
    #[error("Rate value {value} for '{field}' is out of range [0.0, 1.0]")]
    RateOutOfRange {
        /// Name of the offending configuration field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A jurisdiction code was empty or malformed.
    #[error("Invalid jurisdiction code: {code:?}")]
    InvalidJurisdiction {
        /// The rejected code.
        code: String,
    },

    /// The statutory term or deadline was zero months.
    #[error("Statutory period '{field}' must be at least one month")]
    ZeroStatutoryPeriod {
        /// Name of the offending configuration field.
        field: String,
    },
}

/// Top-level error type for patfam.
#[derive(Debug, Error)]
pub enum PatfamError {
    /// Configuration or input validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The applicant behavior store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PatfamError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// Validation errors will not change on retry; store errors may clear
    /// once the persistence layer recovers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type alias for patfam operations.
pub type PatfamResult<T> = Result<T, PatfamError>;
