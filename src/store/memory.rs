//! Thread-safe in-memory store backend.
//!
//! Intended for embedded usage and tests, and as the reference
//! implementation of the store contract. All mutations happen under one
//! write lock, so per-pair updates are atomic and additive.

use std::sync::RwLock;

use crate::profile::{ApplicantProfile, Outcome};
use crate::store::{normalize_key, ProfileMap, ProfileSnapshot, ProfileStore, StoreError};

/// In-memory applicant behavior store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    inner: RwLock<ProfileMap>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store from existing profiles (e.g. industry research data).
    /// Existing entries win; seeding only fills gaps.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the lock is poisoned.
    pub fn seed(&self, profiles: Vec<ApplicantProfile>) -> Result<(), StoreError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::poisoned("memory seed"))?;
        for profile in profiles {
            guard
                .entry(normalize_key(&profile.canonical_name))
                .or_default()
                .entry(profile.jurisdiction.clone())
                .or_insert(profile);
        }
        Ok(())
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get_profile(
        &self,
        canonical_name: &str,
        jurisdiction: &str,
    ) -> Result<ApplicantProfile, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("memory read"))?;
        Ok(guard
            .get(&normalize_key(canonical_name))
            .and_then(|by_jurisdiction| by_jurisdiction.get(jurisdiction))
            .cloned()
            .unwrap_or_else(|| ApplicantProfile::neutral(canonical_name, jurisdiction)))
    }

    fn record_outcome(
        &self,
        canonical_name: &str,
        jurisdiction: &str,
        outcome: Outcome,
    ) -> Result<ApplicantProfile, StoreError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::poisoned("memory write"))?;
        let profile = guard
            .entry(normalize_key(canonical_name))
            .or_default()
            .entry(jurisdiction.to_string())
            .or_insert_with(|| ApplicantProfile::neutral(canonical_name, jurisdiction));
        profile.apply(outcome);
        Ok(profile.clone())
    }

    fn snapshot(&self) -> Result<ProfileSnapshot, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("memory snapshot"))?;
        Ok(ProfileSnapshot::new(guard.clone()))
    }

    fn len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn outcome(filed: bool) -> Outcome {
        Outcome {
            had_pct_family: true,
            filed_in_jurisdiction: filed,
        }
    }

    #[test]
    fn unseen_pair_reads_neutral_without_mutation() {
        let store = InMemoryProfileStore::new();
        let profile = store.get_profile("Novel Pharma", "BR").unwrap();
        assert!((profile.smoothed_rate() - 0.5).abs() < f64::EPSILON);
        assert!(store.is_empty());
    }

    #[test]
    fn outcomes_accumulate() {
        let store = InMemoryProfileStore::new();
        for filed in [true, true, true, false] {
            store.record_outcome("X", "BR", outcome(filed)).unwrap();
        }
        let profile = store.get_profile("X", "BR").unwrap();
        assert_eq!(profile.observed_filings_count, 4);
        assert_eq!(profile.target_filings_count, 3);
        assert!((profile.historical_filing_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn jurisdictions_keep_separate_counts() {
        let store = InMemoryProfileStore::new();
        for _ in 0..5 {
            store.record_outcome("X", "BR", outcome(true)).unwrap();
            store.record_outcome("X", "MX", outcome(false)).unwrap();
        }
        let br = store.get_profile("X", "BR").unwrap();
        let mx = store.get_profile("X", "MX").unwrap();
        // BR: (5+1)/(5+2); MX: (0+1)/(5+2). Neither dilutes the other.
        assert!((br.smoothed_rate() - 6.0 / 7.0).abs() < 1e-12);
        assert!((mx.smoothed_rate() - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn applicant_keys_are_case_insensitive() {
        let store = InMemoryProfileStore::new();
        store.record_outcome("Bayer AG", "BR", outcome(true)).unwrap();
        let profile = store.get_profile("BAYER AG", "BR").unwrap();
        assert_eq!(profile.observed_filings_count, 1);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = InMemoryProfileStore::new();
        store.record_outcome("X", "BR", outcome(true)).unwrap();
        let snapshot = store.snapshot().unwrap();
        store.record_outcome("X", "BR", outcome(false)).unwrap();
        assert_eq!(snapshot.get("X", "BR").observed_filings_count, 1);
        assert_eq!(store.get_profile("X", "BR").unwrap().observed_filings_count, 2);
    }

    #[test]
    fn concurrent_updates_to_same_pair_are_lossless() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    store
                        .record_outcome("Shared Applicant", "BR", outcome(true))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let profile = store.get_profile("Shared Applicant", "BR").unwrap();
        assert_eq!(profile.observed_filings_count, 400);
        assert_eq!(profile.target_filings_count, 400);
    }
}
