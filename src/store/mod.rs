//! Applicant behavior store backends.
//!
//! The store is the only process-wide mutable state in the engine, so it is
//! modeled as an explicit, injectable trait: callers pass a store into the
//! pipeline and tests substitute an in-memory fake. Counts are keyed by
//! (applicant, jurisdiction) so one jurisdiction's outcomes never dilute
//! another's rate. Implementations must keep per-key updates atomic and
//! additive: two concurrent searches touching the same pair must accumulate
//! counts, never overwrite each other.

mod json;
mod memory;

use std::collections::HashMap;

use thiserror::Error;

use crate::profile::{ApplicantProfile, Outcome};

pub use json::JsonProfileStore;
pub use memory::InMemoryProfileStore;

/// Per-applicant map of jurisdiction-keyed profiles.
pub(crate) type ProfileMap = HashMap<String, HashMap<String, ApplicantProfile>>;

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence layer is unreachable.
    #[error("Store unavailable: {reason}")]
    Unavailable {
        /// What failed.
        reason: String,
    },

    /// Reading or writing the backing file failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted snapshot could not be decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend invariant violated (poisoned lock etc.).
    #[error("Store backend error: {reason}")]
    Backend {
        /// What failed.
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn poisoned(context: &'static str) -> Self {
        Self::Backend {
            reason: format!("poisoned lock: {context}"),
        }
    }
}

/// A consistent, immutable view of all profiles, taken once per resolution
/// pass so every read during the pass observes the same state.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    profiles: ProfileMap,
}

impl ProfileSnapshot {
    /// Builds a snapshot from a profile map keyed by normalized name.
    #[must_use]
    pub(crate) fn new(profiles: ProfileMap) -> Self {
        Self { profiles }
    }

    /// Profile for an (applicant, jurisdiction) pair, or the neutral prior
    /// for unseen pairs. Never mutates state.
    #[must_use]
    pub fn get(&self, canonical_name: &str, jurisdiction: &str) -> ApplicantProfile {
        self.profiles
            .get(&normalize_key(canonical_name))
            .and_then(|by_jurisdiction| by_jurisdiction.get(jurisdiction))
            .cloned()
            .unwrap_or_else(|| ApplicantProfile::neutral(canonical_name, jurisdiction))
    }

    /// Number of known applicants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no applicants are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// The applicant behavior store contract.
pub trait ProfileStore: Send + Sync {
    /// Profile for an (applicant, jurisdiction) pair, or the neutral default
    /// for unseen pairs. Must not mutate state.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend cannot be read; callers
    /// degrade to the neutral prior rather than aborting a pass.
    fn get_profile(
        &self,
        canonical_name: &str,
        jurisdiction: &str,
    ) -> Result<ApplicantProfile, StoreError>;

    /// Applies one outcome to an (applicant, jurisdiction) pair's counts,
    /// atomically for that pair, and returns the updated profile.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the update cannot be applied or
    /// persisted; the caller is expected to surface this for retry.
    fn record_outcome(
        &self,
        canonical_name: &str,
        jurisdiction: &str,
        outcome: Outcome,
    ) -> Result<ApplicantProfile, StoreError>;

    /// A consistent snapshot of all profiles for one resolution pass.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the backend cannot be read.
    fn snapshot(&self) -> Result<ProfileSnapshot, StoreError>;

    /// Number of known applicants.
    fn len(&self) -> usize;

    /// True when no applicants are known.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applicant store keys are case-insensitive and whitespace-trimmed.
/// Jurisdiction keys are the uppercase codes as-is.
pub(crate) fn normalize_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
