//! Bounded fingerprint → findings cache with FIFO eviction.
//!
//! Eviction order is insertion order, kept explicitly in a `VecDeque` of keys
//! (front = oldest). Lookups do not refresh an entry's position and
//! re-inserting an existing key replaces its value in place. Entries never
//! expire; only capacity pressure removes them.

use std::collections::{HashMap, VecDeque};

use crate::models::Finding;

/// Lookup counters for a [`ResultCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct ResultCache {
    capacity: usize,
    entries: HashMap<String, Vec<Finding>>,
    /// Keys in insertion order. Always holds exactly the keys of `entries`.
    order: VecDeque<String>,
    stats: CacheStats,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up the findings stored under `fingerprint`, counting a hit or miss.
    pub fn get(&mut self, fingerprint: &str) -> Option<&[Finding]> {
        match self.entries.get(fingerprint) {
            Some(findings) => {
                self.stats.hits += 1;
                Some(findings.as_slice())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store `findings` under `fingerprint`.
    ///
    /// A new key inserted at capacity evicts the single oldest entry first and
    /// returns its key. An existing key keeps its place in the eviction order.
    pub fn put(&mut self, fingerprint: String, findings: Vec<Finding>) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(&fingerprint) {
            *slot = findings;
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
                evicted = Some(oldest);
            }
        }

        self.order.push_back(fingerprint.clone());
        self.entries.insert(fingerprint, findings);
        evicted
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(crate::MAX_CACHE_ITEMS)
    }
}
