//! JSON-file-backed store backend.
//!
//! The profile database is a single JSON document loaded at open and
//! rewritten atomically (temp file + rename on the same filesystem) after
//! every update, so a crash mid-write never leaves a torn database and the
//! store survives process restarts. Profiles are never deleted.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::profile::{ApplicantProfile, Outcome};
use crate::store::{normalize_key, ProfileMap, ProfileSnapshot, ProfileStore, StoreError};

/// Durable applicant behavior store backed by one JSON file.
#[derive(Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
    inner: RwLock<ProfileMap>,
}

impl JsonProfileStore {
    /// Opens (or initializes) a store at `path`.
    ///
    /// A missing file starts an empty database; a present but undecodable
    /// file is an error rather than a silent reset.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] for I/O or decode failures.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let profiles = if path.exists() {
            let bytes = fs::read(&path)?;
            let profiles: ProfileMap = serde_json::from_slice(&bytes)?;
            tracing::info!(path = %path.display(), applicants = profiles.len(), "loaded applicant database");
            profiles
        } else {
            tracing::warn!(path = %path.display(), "applicant database not found, starting fresh");
            ProfileMap::new()
        };
        Ok(Self {
            path,
            inner: RwLock::new(profiles),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the full map to a sibling temp file and renames it over the
    /// database. Rename is atomic within one filesystem.
    fn persist(&self, profiles: &ProfileMap) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(profiles)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn get_profile(
        &self,
        canonical_name: &str,
        jurisdiction: &str,
    ) -> Result<ApplicantProfile, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("json read"))?;
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
            .map_err(|_| StoreError::poisoned("json write"))?;
        let name_key = normalize_key(canonical_name);
        let mut updated = guard
            .get(&name_key)
            .and_then(|by_jurisdiction| by_jurisdiction.get(jurisdiction))
            .cloned()
            .unwrap_or_else(|| ApplicantProfile::neutral(canonical_name, jurisdiction));
        updated.apply(outcome);

        // Persist to a scratch copy before committing to memory, so a failed
        // write leaves memory and disk agreeing and a retry counts once.
        let mut scratch = guard.clone();
        scratch
            .entry(name_key)
            .or_default()
            .insert(jurisdiction.to_string(), updated.clone());
        self.persist(&scratch)?;
        *guard = scratch;

        tracing::debug!(
            applicant = %updated.canonical_name,
            jurisdiction = %updated.jurisdiction,
            observed = updated.observed_filings_count,
            target = updated.target_filings_count,
            "applicant profile persisted"
        );
        Ok(updated)
    }

    fn snapshot(&self) -> Result<ProfileSnapshot, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("json snapshot"))?;
        Ok(ProfileSnapshot::new(guard.clone()))
    }

    fn len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }
}
