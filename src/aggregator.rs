use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::entropy::EntropyEngine;
use crate::fingerprint::Fingerprint;

/// A fingerprint ranked against the population it was observed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Distinctive {
    pub fingerprint: Fingerprint,
    pub digest: String,
    pub score: f64,
    pub anonymity_set: f64,
}

/// Every fingerprint of a capture session, in arrival order, plus the
/// statistics derived from them.
#[derive(Debug, Default)]
pub struct Aggregator {
    fingerprints: Vec<Fingerprint>,
    entropy: EntropyEngine,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation. Identical fingerprints are kept as separate
    /// observations. Returns false if the entropy engine refused the update,
    /// in which case nothing is recorded.
    pub fn add_fingerprint(&mut self, fp: Fingerprint) -> bool {
        if let Err(e) = self.entropy.update(&fp) {
            warn!("dropping fingerprint {}: {e}", fp.digest());
            return false;
        }
        self.fingerprints.push(fp);
        true
    }

    pub fn reset(&mut self) {
        self.fingerprints.clear();
        self.entropy = EntropyEngine::new();
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn entropy(&self) -> &EntropyEngine {
        &self.entropy
    }

    /// Number of distinct capability sets, ignoring SSIDs.
    pub fn distinct_count(&self) -> usize {
        self.fingerprints
            .iter()
            .map(Fingerprint::canonical_bytes)
            .collect::<HashSet<_>>()
            .len()
    }

    /// The `n` highest-scoring distinct capability sets, rarest first.
    pub fn most_distinctive(&self, n: usize) -> Vec<Distinctive> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<Distinctive> = self
            .fingerprints
            .iter()
            .filter(|fp| seen.insert(fp.canonical_bytes()))
            .map(|fp| Distinctive {
                fingerprint: fp.clone(),
                digest: fp.digest(),
                score: self.entropy.fingerprint_score(fp),
                anonymity_set: self.entropy.anonymity_set_size(fp),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.digest.cmp(&b.digest)));
        ranked.truncate(n);
        ranked
    }
}

/// An [`Aggregator`] behind one lock, for feeding it from several capture
/// sources at once. Updates, resets and reads are serialized.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregator {
    inner: Arc<Mutex<Aggregator>>,
}

impl SharedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fingerprint(&self, fp: Fingerprint) -> bool {
        self.inner.lock().add_fingerprint(fp)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Runs `f` against a consistent view of the aggregator.
    pub fn read<R>(&self, f: impl FnOnce(&Aggregator) -> R) -> R {
        f(&self.inner.lock())
    }
}
