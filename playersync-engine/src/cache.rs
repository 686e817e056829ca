//! Local record cache.
//!
//! In-process table keyed by player id. Never performs I/O; the engine is
//! responsible for filling it. Entries are copies of store data and never
//! authoritative: eviction is always safe, deletion of records is not its
//! job.
//!
//! Bounds: TTL per entry (shorter for negative entries), LRU eviction among
//! unpinned entries past `max_entries`. Entries backing an active session
//! are pinned - exempt from TTL sweep and LRU eviction, removed only by
//! explicit invalidation.

use playersync_core::{CacheConfig, PlayerId, PlayerRecord, RecordVersion};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedRecord {
    Hit(PlayerRecord),
    /// The store answered "no such player" recently; callers short-circuit
    /// to NotFound without a network call.
    Negative,
}

#[derive(Debug, Clone)]
enum EntryState {
    Record(PlayerRecord),
    Negative,
}

#[derive(Debug)]
struct Entry {
    state: EntryState,
    inserted_at: Instant,
    ttl: Duration,
    access_seq: u64,
    pinned: bool,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        !self.pinned && now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Counters mirroring what the cache has done since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: HashMap<PlayerId, Entry>,
    access_counter: u64,
}

pub struct LocalCache {
    inner: RwLock<Inner>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                access_counter: 0,
            }),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up `id`, touching its LRU position. Expired entries count as
    /// misses and are dropped on the spot.
    pub fn get(&self, id: &PlayerId) -> Option<CachedRecord> {
        let now = Instant::now();
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.access_counter += 1;
        let seq = inner.access_counter;
        match inner.entries.get_mut(id) {
            Some(entry) if !entry.expired(now) => {
                entry.access_seq = seq;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(match &entry.state {
                    EntryState::Record(record) => CachedRecord::Hit(record.clone()),
                    EntryState::Negative => CachedRecord::Negative,
                })
            }
            Some(_) => {
                inner.entries.remove(id);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace the record for `id`, resetting its expiry. A
    /// pre-existing pin survives the replacement.
    pub fn put(&self, record: PlayerRecord) {
        self.insert(record.id(), EntryState::Record(record), self.config.ttl());
    }

    /// Remember that `id` does not exist, with the shorter negative TTL.
    pub fn put_negative(&self, id: PlayerId) {
        self.insert(id, EntryState::Negative, self.config.negative_ttl());
    }

    fn insert(&self, id: PlayerId, state: EntryState, ttl: Duration) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.access_counter += 1;
        let seq = inner.access_counter;
        let pinned = inner.entries.get(&id).map(|e| e.pinned).unwrap_or(false);
        inner.entries.insert(
            id,
            Entry {
                state,
                inserted_at: Instant::now(),
                ttl,
                access_seq: seq,
                pinned,
            },
        );
        if inner.entries.len() > self.config.max_entries {
            self.evict_lru(&mut inner);
        }
    }

    /// Drop the least-recently-used unpinned entry. If every entry is
    /// pinned the cache temporarily exceeds capacity; session entries are
    /// never sacrificed.
    fn evict_lru(&self, inner: &mut Inner) {
        let victim = inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.pinned)
            .min_by_key(|(_, entry)| entry.access_seq)
            .map(|(id, _)| *id);
        if let Some(id) = victim {
            inner.entries.remove(&id);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove the entry for `id` if present. Idempotent.
    pub fn invalidate(&self, id: &PlayerId) -> bool {
        self.inner
            .write()
            .expect("cache lock poisoned")
            .entries
            .remove(id)
            .is_some()
    }

    /// Exempt `id` from TTL sweep and LRU eviction while its session lives.
    pub fn pin(&self, id: &PlayerId) {
        if let Some(entry) = self
            .inner
            .write()
            .expect("cache lock poisoned")
            .entries
            .get_mut(id)
        {
            entry.pinned = true;
        }
    }

    /// Re-expose `id` to expiry. The entry stays cached until TTL or LRU
    /// takes it.
    pub fn unpin(&self, id: &PlayerId) {
        if let Some(entry) = self
            .inner
            .write()
            .expect("cache lock poisoned")
            .entries
            .get_mut(id)
        {
            entry.pinned = false;
        }
    }

    /// Drop expired unpinned entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write().expect("cache lock poisoned");
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.expired(now));
        let swept = before - inner.entries.len();
        self.evictions.fetch_add(swept as u64, Ordering::Relaxed);
        swept
    }

    /// Version of the cached record without touching its LRU position.
    /// `None` for misses and negative entries.
    pub fn version_of(&self, id: &PlayerId) -> Option<RecordVersion> {
        let inner = self.inner.read().expect("cache lock poisoned");
        match inner.entries.get(id) {
            Some(Entry {
                state: EntryState::Record(record),
                ..
            }) => Some(record.version),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
        }
    }
}
