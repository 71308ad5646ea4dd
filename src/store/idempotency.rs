//! Idempotency Store
//!
//! Prevents duplicate command processing using caller-supplied idempotency
//! keys. Records are unique per (key, participant) and TTL-bounded; an
//! in-flight placeholder is inserted before side effects run so that two
//! concurrent requests with the same key cannot both execute.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// A completed, replayable command result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub participant_id: String,
    pub request_hash: String,
    /// Opaque success payload, replayed byte-identically
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Expired records are treated as absent everywhere.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Slot state for one (key, participant) pair.
#[derive(Debug, Clone)]
enum Slot {
    /// Placeholder inserted before side effects run
    InFlight {
        request_hash: String,
        started_at: DateTime<Utc>,
    },
    Completed(IdempotencyRecord),
}

/// Outcome of claiming an idempotency key for execution.
#[derive(Debug, Clone)]
pub enum Begin {
    /// Key is new; the placeholder is in place and the caller must execute,
    /// then `complete` or `abort`
    Started,
    /// Key seen before with the same request hash; return the stored result
    Replay(IdempotencyRecord),
    /// Key seen before with a different request hash
    Conflict,
    /// Another request with the same key and hash is still executing
    InFlight,
}

/// In-memory keyed store mapping (key, participant) to a replayable result.
#[derive(Debug)]
pub struct IdempotencyStore {
    slots: RwLock<HashMap<(String, String), Slot>>,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Claim a key for execution.
    ///
    /// Atomically inserts the in-flight placeholder on a miss; this is the
    /// compare-and-swap guard that keeps side effects at-most-once under
    /// concurrent submissions of the same key.
    pub fn begin(
        &self,
        key: &str,
        participant_id: &str,
        request_hash: &str,
        now: DateTime<Utc>,
    ) -> Begin {
        use std::collections::hash_map::Entry;

        let mut slots = self.slots.write().expect("RwLock poisoned");
        let map_key = (key.to_string(), participant_id.to_string());

        // lazy eviction: an expired record is absent
        let expired = matches!(
            slots.get(&map_key),
            Some(Slot::Completed(record)) if record.is_expired(now)
        );
        if expired {
            slots.remove(&map_key);
        }

        match slots.entry(map_key) {
            Entry::Vacant(entry) => {
                entry.insert(Slot::InFlight {
                    request_hash: request_hash.to_string(),
                    started_at: now,
                });
                Begin::Started
            }
            Entry::Occupied(entry) => match entry.get() {
                Slot::InFlight {
                    request_hash: existing,
                    ..
                } => {
                    if existing == request_hash {
                        Begin::InFlight
                    } else {
                        Begin::Conflict
                    }
                }
                Slot::Completed(record) => {
                    if record.request_hash == request_hash {
                        Begin::Replay(record.clone())
                    } else {
                        Begin::Conflict
                    }
                }
            },
        }
    }

    /// Record the now-known result under a claimed key.
    pub fn complete(
        &self,
        key: &str,
        participant_id: &str,
        request_hash: &str,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let mut slots = self.slots.write().expect("RwLock poisoned");
        slots.insert(
            (key.to_string(), participant_id.to_string()),
            Slot::Completed(IdempotencyRecord {
                key: key.to_string(),
                participant_id: participant_id.to_string(),
                request_hash: request_hash.to_string(),
                result,
                created_at: now,
                expires_at: now + self.ttl,
            }),
        );
    }

    /// Release a claimed key after a failed command. Failed requests leave
    /// no record; the caller may retry with the same key.
    pub fn abort(&self, key: &str, participant_id: &str) {
        let mut slots = self.slots.write().expect("RwLock poisoned");
        let map_key = (key.to_string(), participant_id.to_string());
        let in_flight = matches!(slots.get(&map_key), Some(Slot::InFlight { .. }));
        if in_flight {
            slots.remove(&map_key);
        }
    }

    /// Look up a completed record, evicting it if expired.
    pub fn find(
        &self,
        key: &str,
        participant_id: &str,
        now: DateTime<Utc>,
    ) -> Option<IdempotencyRecord> {
        let mut slots = self.slots.write().expect("RwLock poisoned");
        let map_key = (key.to_string(), participant_id.to_string());

        let expired = matches!(
            slots.get(&map_key),
            Some(Slot::Completed(record)) if record.is_expired(now)
        );
        if expired {
            slots.remove(&map_key);
            return None;
        }

        match slots.get(&map_key) {
            Some(Slot::Completed(record)) => Some(record.clone()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().expect("RwLock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
