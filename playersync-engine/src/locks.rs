//! Per-player lock table.
//!
//! The engine serializes its own state transitions per player: no two
//! transitions for the same id run concurrently, while unrelated players
//! proceed fully in parallel. A sharded/keyed table instead of one global
//! lock keeps busy servers from serializing everyone behind one player.

use playersync_core::PlayerId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size at which `acquire` opportunistically drops idle locks.
const CLEANUP_THRESHOLD: usize = 1024;

#[derive(Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<PlayerId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `id`, waiting behind any in-flight transition for
    /// the same player.
    pub(crate) async fn acquire(&self, id: PlayerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock().expect("lock table poisoned");
            if table.len() > CLEANUP_THRESHOLD {
                // a strong count of 1 means nobody holds or awaits it
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(table.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().expect("lock table poisoned").len()
    }
}
