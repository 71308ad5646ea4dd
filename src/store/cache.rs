//! TTL Cache
//!
//! Generic get-or-populate cache backing the read paths. Strict TTL (reads
//! do not extend an entry's life), lazy eviction of expired entries, and a
//! bounded capacity with least-recently-used eviction on insert.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
    last_used: DateTime<Utc>,
}

/// Shared TTL cache safe under concurrent readers and writers.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache with the given TTL and maximum entry count.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Look up a live entry. Expired entries are removed, not just ignored.
    /// A hit refreshes the LRU position but never the TTL.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries.write().expect("RwLock poisoned");

        let expired = matches!(entries.get(key), Some(entry) if entry.expires_at <= now);
        if expired {
            entries.remove(key);
            return None;
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = now;
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    /// Store a value with `expires_at = now + ttl`. When the cache is full
    /// the least-recently-used entry is evicted first.
    pub fn insert(&self, key: K, value: V, now: DateTime<Utc>) {
        let mut entries = self.entries.write().expect("RwLock poisoned");

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let evict = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone());
            if let Some(k) = evict {
                entries.remove(&k);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
                last_used: now,
            },
        );
    }

    /// Drop an entry ahead of its TTL (write-through invalidation).
    pub fn invalidate(&self, key: &K) {
        self.entries.write().expect("RwLock poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("RwLock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
