//! Per-session memo of loaded return tables.
//!
//! There is no process-wide cache: callers build one `ReturnCache` per session
//! and pass it by `&mut` to [`load_returns`](super::acquire::load_returns).
//! Entries are never evicted. The key type is a parameter; any key built
//! `From<&ReturnRequest>` decides which requests share an entry.

use super::acquire::{LoadedReturns, ReturnRequest};
use crate::domain::NaPolicy;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

/// Default cache key. The label set is order-independent: `[A, B]` and `[B, A]`
/// share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReturnKey {
    pub labels: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub na_policy: NaPolicy,
}

impl From<&ReturnRequest> for ReturnKey {
    fn from(req: &ReturnRequest) -> Self {
        Self {
            labels: req.symbols.iter().cloned().collect(),
            start: req.start,
            end: req.end,
            na_policy: req.na_policy,
        }
    }
}

#[derive(Debug)]
pub struct ReturnCache<K = ReturnKey> {
    entries: HashMap<K, Arc<LoadedReturns>>,
    hits: u64,
    misses: u64,
}

impl<K> Default for ReturnCache<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: Eq + Hash> ReturnCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry, counting the hit or miss.
    pub fn get(&mut self, key: &K) -> Option<Arc<LoadedReturns>> {
        match self.entries.get(key) {
            Some(found) => {
                self.hits += 1;
                Some(Arc::clone(found))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: Arc<LoadedReturns>) {
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
