//! Weak coalescing store.
//!
//! Maps each distinct key value to the one instance that stands for it.
//! Entries are `Weak`: the store never keeps a key alive, so once the
//! statement cache drops its last handle the entry is dead and gets pruned
//! on the next collision in its bucket or by the sweep that runs every
//! `sweep_interval` insertions.
//!
//! Not internally synchronized; every method takes `&mut self` or `&self`
//! and the owner serializes access.

use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::config::CoalescerConfig;
use crate::key::{CanonicalKey, StatementCacheKey};

/// Outcome of [`Coalescer::intern`].
#[derive(Debug, Clone)]
pub enum Interned {
    /// The candidate was inserted and is now the canonical instance.
    New(CanonicalKey),
    /// An equal instance was already live; the candidate was not retained.
    Existing(CanonicalKey),
}

impl Interned {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    pub fn into_key(self) -> CanonicalKey {
        match self {
            Self::New(key) | Self::Existing(key) => key,
        }
    }
}

/// Weak identity-interning table keyed by the memoized key hash.
pub struct Coalescer {
    buckets: FxHashMap<u64, Vec<Weak<StatementCacheKey>>>,
    sweep_interval: usize,
    inserts_since_sweep: usize,
    pruned: u64,
}

impl Coalescer {
    pub fn new(config: &CoalescerConfig) -> Self {
        Self {
            buckets: FxHashMap::with_capacity_and_hasher(
                config.initial_capacity,
                Default::default(),
            ),
            sweep_interval: config.sweep_interval.max(1),
            inserts_since_sweep: 0,
            pruned: 0,
        }
    }

    /// Return the canonical instance equal to `candidate`, inserting
    /// `candidate` itself when no live equal instance exists.
    ///
    /// Dead entries met while scanning the bucket are dropped. A match is
    /// only returned after its `Weak` upgraded, so a key reclaimed mid-scan
    /// is never handed out.
    pub fn intern(&mut self, candidate: &Arc<StatementCacheKey>) -> Interned {
        let hash = candidate.cached_hash();

        if let Some(bucket) = self.buckets.get_mut(&hash) {
            let mut found = None;
            let before = bucket.len();
            bucket.retain(|entry| match entry.upgrade() {
                Some(live) => {
                    if found.is_none() && live.value_eq(candidate) {
                        found = Some(live);
                    }
                    true
                }
                None => false,
            });
            self.pruned += (before - bucket.len()) as u64;

            if let Some(live) = found {
                return Interned::Existing(CanonicalKey(live));
            }
            bucket.push(Arc::downgrade(candidate));
        } else {
            self.buckets.insert(hash, vec![Arc::downgrade(candidate)]);
        }

        self.inserts_since_sweep += 1;
        if self.inserts_since_sweep >= self.sweep_interval {
            self.sweep();
        }

        Interned::New(CanonicalKey(Arc::clone(candidate)))
    }

    /// Look up the live canonical instance equal to `probe`, without inserting.
    pub fn get(&self, probe: &StatementCacheKey) -> Option<CanonicalKey> {
        self.buckets
            .get(&probe.cached_hash())?
            .iter()
            .filter_map(Weak::upgrade)
            .find(|live| live.value_eq(probe))
            .map(CanonicalKey)
    }

    /// Drop every dead entry and empty bucket. Returns the number pruned.
    pub fn sweep(&mut self) -> usize {
        let mut pruned = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|entry| entry.strong_count() > 0);
            pruned += before - bucket.len();
            !bucket.is_empty()
        });
        self.inserts_since_sweep = 0;
        self.pruned += pruned as u64;

        tracing::debug!(
            "Swept statement key coalescer: {} pruned, {} live",
            pruned,
            self.slots()
        );
        pruned
    }

    /// Number of live canonical keys.
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flatten()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored entries, dead ones not yet pruned included.
    pub fn slots(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Total dead entries pruned so far.
    pub fn pruned(&self) -> u64 {
        self.pruned
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(&CoalescerConfig::default())
    }
}
