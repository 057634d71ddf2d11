//! Deduplication index
//!
//! A per-call snapshot of the fingerprints already archived for a scope,
//! supplemented with the fingerprints accepted earlier in the same call.

use crate::state::Scope;
use crate::storage::{FingerprintFilter, Storage};
use std::collections::HashSet;

/// Result of checking a fingerprint against the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    /// Already archived before this call started
    Known,

    /// Accepted earlier in this call
    SeenThisCall,

    /// Not seen anywhere
    New,
}

/// Fingerprint snapshot for one traversal call
#[derive(Debug, Default)]
pub struct DedupIndex {
    known: HashSet<String>,
    accepted: HashSet<String>,
    bypassed: bool,
}

impl DedupIndex {
    /// Builds the index from the fingerprints already stored for a scope
    ///
    /// A storage failure leaves the snapshot empty: the call still runs and
    /// may store duplicates, which the next run's snapshot will include.
    ///
    /// # Arguments
    ///
    /// * `storage` - The persistence gateway to query
    /// * `scope` - Which table the snapshot covers
    /// * `filter` - Narrows the snapshot (e.g. to one timeline)
    pub fn build<S: Storage + ?Sized>(
        storage: &S,
        scope: Scope,
        filter: &FingerprintFilter,
    ) -> Self {
        let known = match storage.find_fingerprints(scope, filter) {
            Ok(known) => known,
            Err(e) => {
                tracing::warn!("Could not load stored {} fingerprints: {}", scope, e);
                HashSet::new()
            }
        };

        Self {
            known,
            accepted: HashSet::new(),
            bypassed: false,
        }
    }

    /// Index used when the rescrape policy bypasses deduplication
    ///
    /// The stored snapshot is empty, so nothing ends the call early; the
    /// in-call working set still applies.
    pub fn bypassed() -> Self {
        Self {
            bypassed: true,
            ..Self::default()
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn check(&self, fingerprint: &str) -> DedupVerdict {
        if self.known.contains(fingerprint) {
            DedupVerdict::Known
        } else if self.accepted.contains(fingerprint) {
            DedupVerdict::SeenThisCall
        } else {
            DedupVerdict::New
        }
    }

    /// Adds a fingerprint to the in-call working set
    pub fn accept(&mut self, fingerprint: &str) {
        self.accepted.insert(fingerprint.to_string());
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }
}
