//! Authorization store.
//!
//! Maps an IPv4 source address to the monotonic timestamp of its most recent
//! accepted knock. The store is shared by every classification thread, so
//! the implementation is a sharded map with per-key atomic updates and no
//! global lock.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

/// Default maximum number of authorization entries.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// One authorized source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationEntry {
    /// Source address, most significant octet first.
    pub source: u32,
    /// Monotonic time of the last accepted knock.
    pub knocked_at_ns: u64,
}

/// Errors from store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("authorization store full ({capacity} entries)")]
    CapacityExhausted { capacity: usize },

    #[error("authorization store unavailable: {0}")]
    Unavailable(String),
}

/// Concurrent key-value store of authorization entries.
pub trait AuthStore: Send + Sync {
    /// Insert or overwrite the entry for `source`.
    ///
    /// Overwriting never fails on capacity; inserting a new key into a full
    /// store returns [`StoreError::CapacityExhausted`].
    fn insert(&self, source: u32, knocked_at_ns: u64) -> Result<(), StoreError>;

    /// Timestamp recorded for `source`, if any.
    fn lookup(&self, source: u32) -> Result<Option<u64>, StoreError>;

    /// Delete the entry for `source` if it still holds `seen_ns`.
    ///
    /// Returns true if an entry was removed. An entry refreshed since it was
    /// read is left in place.
    fn delete(&self, source: u32, seen_ns: u64) -> Result<bool, StoreError>;

    /// Remove every entry for which `keep` returns false; returns the number removed.
    fn retain(&self, keep: &mut dyn FnMut(u32, u64) -> bool) -> Result<usize, StoreError>;

    /// All entries, sorted by source address.
    fn entries(&self) -> Vec<AuthorizationEntry>;

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    fn capacity(&self) -> usize;
}

/// Sharded in-memory store with a hard entry limit.
#[derive(Debug)]
pub struct ShardedStore {
    map: DashMap<u32, u64>,
    occupied: AtomicUsize,
    capacity: usize,
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ShardedStore {
    /// Create a store holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::new(),
            occupied: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Reserve a slot for a new key.
    fn reserve(&self) -> bool {
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self, count: usize) {
        if count > 0 {
            self.occupied.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

impl AuthStore for ShardedStore {
    fn insert(&self, source: u32, knocked_at_ns: u64) -> Result<(), StoreError> {
        // The entry guard holds the shard lock, so the capacity reservation and
        // the insert are atomic with respect to other writers of this key.
        match self.map.entry(source) {
            Entry::Occupied(mut entry) => {
                entry.insert(knocked_at_ns);
                Ok(())
            }
            Entry::Vacant(entry) => {
                if !self.reserve() {
                    return Err(StoreError::CapacityExhausted {
                        capacity: self.capacity,
                    });
                }
                entry.insert(knocked_at_ns);
                Ok(())
            }
        }
    }

    fn lookup(&self, source: u32) -> Result<Option<u64>, StoreError> {
        Ok(self.map.get(&source).map(|entry| *entry.value()))
    }

    fn delete(&self, source: u32, seen_ns: u64) -> Result<bool, StoreError> {
        let removed = self
            .map
            .remove_if(&source, |_, knocked_at| *knocked_at == seen_ns)
            .is_some();
        if removed {
            self.release(1);
        }
        Ok(removed)
    }

    fn retain(&self, keep: &mut dyn FnMut(u32, u64) -> bool) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.map.retain(|source, knocked_at| {
            let kept = keep(*source, *knocked_at);
            if !kept {
                removed += 1;
            }
            kept
        });
        self.release(removed);
        Ok(removed)
    }

    fn entries(&self) -> Vec<AuthorizationEntry> {
        let mut entries: Vec<AuthorizationEntry> = self
            .map
            .iter()
            .map(|e| AuthorizationEntry {
                source: *e.key(),
                knocked_at_ns: *e.value(),
            })
            .collect();
        entries.sort_by_key(|e| e.source);
        entries
    }

    fn len(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
