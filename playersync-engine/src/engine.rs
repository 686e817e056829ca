//! The synchronization engine.
//!
//! Orchestrates the local cache, the session registry, the remote store
//! client and the invalidation bus:
//!
//! - reads consult the cache and fall back to the store, populating the
//!   cache (negative entries for known-absent players);
//! - writes go through the store first (write-through), then update the
//!   cache and publish an invalidation;
//! - received invalidations evict lazily - the next reader refetches;
//! - host login/logout events load or release the player's record and
//!   pin/unpin its cache entry.
//!
//! All transitions for one player are serialized behind a per-player lock;
//! different players proceed in parallel.

use crate::cache::{CacheStats, CachedRecord, LocalCache};
use crate::locks::KeyedLocks;
use crate::session::SessionRegistry;
use chrono::Utc;
use futures::StreamExt;
use playersync_bus::InvalidationBus;
use playersync_core::{
    new_process_id, CacheConfig, InvalidationEvent, InvalidationReason, PlayerId, PlayerIdentity,
    PlayerRecord, ProcessId, RecordVersion, SessionHandle, StoreError, SyncError, SyncResult,
};
use playersync_store::RemoteStore;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Attempts for internal session writes (login/logout bookkeeping), which
/// retry through version conflicts by refetching. Caller-supplied writes
/// never do this; conflicts there surface to the caller.
const SESSION_WRITE_ATTEMPTS: u32 = 3;

/// Capacity of the local notice channel handed out by
/// [`SyncEngine::subscribe_events`].
const NOTICE_CAPACITY: usize = 256;

pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    bus: Arc<dyn InvalidationBus>,
    cache: LocalCache,
    sessions: SessionRegistry,
    locks: KeyedLocks,
    config: CacheConfig,
    process_id: ProcessId,
    /// Backend server name stamped on records while a player is online here.
    server_name: Option<String>,
    notices: broadcast::Sender<InvalidationEvent>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        bus: Arc<dyn InvalidationBus>,
        config: CacheConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            store,
            bus,
            cache: LocalCache::new(config.clone()),
            sessions: SessionRegistry::new(),
            locks: KeyedLocks::new(),
            config,
            process_id: new_process_id(),
            server_name: None,
            notices,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Name records report in `connected_server` while online here.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Players with an active session on this process.
    pub fn active_players(&self) -> Vec<PlayerIdentity> {
        self.sessions.active_players()
    }

    pub fn is_online_locally(&self, id: &PlayerId) -> bool {
        self.sessions.is_active(id)
    }

    /// Observe invalidation traffic: everything this engine publishes plus
    /// every foreign event it receives (own bus echoes excluded). Lets
    /// callers react to logins/logouts anywhere on the network.
    pub fn subscribe_events(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.notices.subscribe()
    }

    // ========================================================================
    // BACKGROUND TASKS
    // ========================================================================

    /// Subscribe to the bus and spawn the event and sweep loops. Call once
    /// after construction; reads and writes work without it, but cache
    /// coherence with other processes depends on it.
    pub async fn start(self: Arc<Self>) -> SyncResult<()> {
        let mut events = self.bus.subscribe().await?;

        // the loops hold only a weak handle: dropping the last external
        // reference tears the engine (and its tasks) down via Drop
        let engine = Arc::downgrade(&self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let event_loop = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    received = events.next() => match received {
                        Some(event) => match engine.upgrade() {
                            Some(engine) => engine.handle_event(event).await,
                            None => break,
                        },
                        None => {
                            warn!("invalidation stream closed, cache coherence degraded to TTL");
                            break;
                        }
                    }
                }
            }
        });

        let engine = Arc::downgrade(&self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let sweep_interval = self.config.sweep_interval();
        let sweep_loop = tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let Some(engine) = engine.upgrade() else { break };
                        let swept = engine.cache.sweep();
                        if swept > 0 {
                            debug!(swept, "swept expired cache entries");
                        }
                    }
                }
            }
        });

        let mut tasks = self.tasks.lock().expect("task list poisoned");
        tasks.push(event_loop);
        tasks.push(sweep_loop);
        info!(process_id = %self.process_id, "synchronization engine started");
        Ok(())
    }

    /// Stop the background loops. In-flight calls complete normally.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    // ========================================================================
    // HOST INTEGRATION API
    // ========================================================================

    /// Host login event. Loads the player's record (creating it on
    /// first-ever login), marks it online, pins the cache entry and
    /// registers the session.
    pub async fn on_login(&self, identity: PlayerIdentity) -> SyncResult<SessionHandle> {
        let id = identity.id;
        let _guard = self.locks.acquire(id).await;
        let handle = self.sessions.login(identity.clone());

        let server_name = self.server_name.clone();
        let written = self
            .session_write(id, Some(identity.clone()), move |record| {
                record.identity.name = identity.name.clone();
                record.last_login = Utc::now();
                record.online = true;
                record.connected_server = server_name.clone();
            })
            .await;

        match written {
            Ok(record) => {
                let version = record.version;
                // the per-player lock is held, so the session registered
                // above is still the live one
                self.cache.put(record);
                self.cache.pin(&id);
                self.publish_or_log(InvalidationEvent::updated(id, self.process_id, version))
                    .await;
                self.publish_or_log(InvalidationEvent::session_started(id, self.process_id))
                    .await;
                debug!(player = %id, session = handle.session_id, "session started");
                Ok(handle)
            }
            Err(error) => {
                // the session must not outlive a failed login
                self.sessions.logout(&handle);
                self.cache.invalidate(&id);
                Err(error.into())
            }
        }
    }

    /// Host logout/disconnect event. Writes session accounting back through
    /// the store, unpins the cache entry (it stays cached but becomes
    /// sweepable) and announces the logout.
    pub async fn on_logout(&self, handle: &SessionHandle) -> SyncResult<()> {
        let id = handle.player.id;
        let _guard = self.locks.acquire(id).await;
        if !self.sessions.logout(handle) {
            return Err(SyncError::NoSession { id });
        }
        self.cache.unpin(&id);

        let session_ms = handle.session_time_ms(Utc::now());
        let written = self
            .session_write(id, None, move |record| {
                record.playtime_ms += session_ms;
                record.last_login = Utc::now();
                record.online = false;
                record.connected_server = None;
                record.connected_proxy = None;
            })
            .await;

        let result = match written {
            Ok(record) => {
                let version = record.version;
                self.cache.put(record);
                self.publish_or_log(InvalidationEvent::updated(id, self.process_id, version))
                    .await;
                Ok(())
            }
            Err(error) => {
                // accounting failed; drop the entry so a stale online flag
                // is never served from this cache
                self.cache.invalidate(&id);
                warn!(player = %id, %error, "logout write-back failed");
                Err(error.into())
            }
        };

        self.publish_or_log(InvalidationEvent::session_ended(id, self.process_id))
            .await;
        debug!(player = %id, session = handle.session_id, "session ended");
        result
    }

    /// Read the player's record, served from the cache when possible.
    pub async fn read(&self, id: PlayerId) -> SyncResult<PlayerRecord> {
        if let Some(cached) = self.cache.get(&id) {
            return Self::unwrap_cached(id, cached);
        }
        let _guard = self.locks.acquire(id).await;
        // a concurrent reader may have filled the entry while we waited
        if let Some(cached) = self.cache.get(&id) {
            return Self::unwrap_cached(id, cached);
        }
        self.load_locked(id).await
    }

    /// Read by display name. Uncached on the name axis; the result record
    /// is cached under its id like any other read.
    pub async fn read_by_name(&self, name: &str) -> SyncResult<PlayerRecord> {
        let record = self.store.fetch_by_name(name).await?;
        let id = record.id();
        let _guard = self.locks.acquire(id).await;
        self.cache.put(record.clone());
        if self.sessions.is_active(&id) {
            self.cache.pin(&id);
        }
        Ok(record)
    }

    /// Mutate the player's record and write it through.
    ///
    /// The mutation runs against the latest locally-known copy; the write
    /// carries the version that copy had. On [`StoreError::VersionConflict`]
    /// the local entry is discarded (the next read refetches) and the
    /// conflict surfaces so the caller can retry against the fresh value.
    /// Writing a nonexistent player is `NotFound`; records are created by
    /// `on_login`, not by `write`.
    pub async fn write<F>(&self, id: PlayerId, mutate: F) -> SyncResult<RecordVersion>
    where
        F: FnOnce(&mut PlayerRecord),
    {
        let _guard = self.locks.acquire(id).await;
        let mut record = match self.cache.get(&id) {
            Some(CachedRecord::Hit(record)) => record,
            Some(CachedRecord::Negative) => return Err(StoreError::NotFound { id }.into()),
            None => self.load_locked(id).await?,
        };
        let observed = record.version;
        mutate(&mut record);
        // mutations cannot rename the key or forge versions
        record.identity.id = id;
        record.version = observed;

        match self.store.write(&record, observed).await {
            Ok(new_version) => {
                record.version = new_version;
                self.cache.put(record);
                self.publish_or_log(InvalidationEvent::updated(id, self.process_id, new_version))
                    .await;
                Ok(new_version)
            }
            Err(conflict @ StoreError::VersionConflict { .. }) => {
                self.cache.invalidate(&id);
                Err(conflict.into())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Delete the player's record everywhere.
    pub async fn delete(&self, id: PlayerId) -> SyncResult<()> {
        let _guard = self.locks.acquire(id).await;
        self.cache.invalidate(&id);
        self.store.delete(id).await?;
        self.publish_or_log(InvalidationEvent::removed(id, self.process_id))
            .await;
        Ok(())
    }

    /// One page of players whose attribute `key` equals `value`.
    pub async fn list_by_attribute(
        &self,
        key: &str,
        value: &playersync_core::AttributeValue,
        page_token: Option<&str>,
    ) -> SyncResult<playersync_store::PlayerPage> {
        Ok(self.store.list_by_attribute(key, value, page_token).await?)
    }

    /// Walk every page of `list_by_attribute`. Unbounded in principle;
    /// intended for administrative callers, not the hot path.
    pub async fn list_all_by_attribute(
        &self,
        key: &str,
        value: &playersync_core::AttributeValue,
    ) -> SyncResult<Vec<PlayerIdentity>> {
        let mut players = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_by_attribute(key, value, token.as_deref())
                .await?;
            players.extend(page.players);
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => return Ok(players),
            }
        }
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn unwrap_cached(id: PlayerId, cached: CachedRecord) -> SyncResult<PlayerRecord> {
        match cached {
            CachedRecord::Hit(record) => Ok(record),
            CachedRecord::Negative => Err(StoreError::NotFound { id }.into()),
        }
    }

    /// Fetch `id` and populate the cache. Caller holds the per-player lock,
    /// which also keeps login/logout out until the fill is done.
    async fn load_locked(&self, id: PlayerId) -> SyncResult<PlayerRecord> {
        match self.store.fetch(id).await {
            Ok(record) => {
                self.cache.put(record.clone());
                if self.sessions.is_active(&id) {
                    self.cache.pin(&id);
                }
                Ok(record)
            }
            Err(StoreError::NotFound { .. }) => {
                self.cache.put_negative(id);
                Err(StoreError::NotFound { id }.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Load-mutate-write with a small refetch loop across version
    /// conflicts. Only session bookkeeping uses this: those writes must
    /// land even when another process touched the record concurrently.
    /// `create_as` supplies the identity for a first-ever login.
    async fn session_write<F>(
        &self,
        id: PlayerId,
        create_as: Option<PlayerIdentity>,
        mutate: F,
    ) -> Result<PlayerRecord, StoreError>
    where
        F: Fn(&mut PlayerRecord),
    {
        let mut last_conflict = None;
        for _ in 0..SESSION_WRITE_ATTEMPTS {
            let mut record = match self.store.fetch(id).await {
                Ok(record) => record,
                Err(StoreError::NotFound { .. }) => match &create_as {
                    Some(identity) => PlayerRecord::new(identity.clone(), Utc::now()),
                    None => return Err(StoreError::NotFound { id }),
                },
                Err(error) => return Err(error),
            };
            let observed = record.version;
            mutate(&mut record);
            record.identity.id = id;
            record.version = observed;
            match self.store.write(&record, observed).await {
                Ok(new_version) => {
                    record.version = new_version;
                    return Ok(record);
                }
                Err(conflict @ StoreError::VersionConflict { .. }) => {
                    debug!(player = %id, "session write conflicted, refetching");
                    last_conflict = Some(conflict);
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_conflict.unwrap_or(StoreError::Unavailable {
            reason: "session write retries exhausted".into(),
        }))
    }

    /// Publish and mirror to local observers. A bus failure after a
    /// committed write is logged, not surfaced: the store already holds the
    /// truth and remote caches converge through their TTL.
    async fn publish_or_log(&self, event: InvalidationEvent) {
        let _ = self.notices.send(event.clone());
        if let Err(error) = self.bus.publish(&event).await {
            warn!(
                player = %event.player_id,
                reason = ?event.reason,
                %error,
                "failed to publish invalidation, remote caches converge via TTL"
            );
        }
    }

    /// Apply one received invalidation event.
    async fn handle_event(&self, event: InvalidationEvent) {
        if event.origin == self.process_id {
            // our own echo; local state was already updated at publish time
            return;
        }
        let _ = self.notices.send(event.clone());
        match event.reason {
            InvalidationReason::Updated => {
                let _guard = self.locks.acquire(event.player_id).await;
                match self.cache.version_of(&event.player_id) {
                    // a reordered event older than what we hold is ignored
                    Some(cached) if cached >= event.version => {}
                    _ => {
                        // evicts positive and negative entries alike; the
                        // next reader refetches (lazy policy)
                        self.cache.invalidate(&event.player_id);
                    }
                }
            }
            InvalidationReason::Removed => {
                let _guard = self.locks.acquire(event.player_id).await;
                self.cache.invalidate(&event.player_id);
            }
            InvalidationReason::SessionStarted | InvalidationReason::SessionEnded => {
                // informational; mirrored to local observers above
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &LocalCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) async fn apply_event(&self, event: InvalidationEvent) {
        self.handle_event(event).await;
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.lock().expect("task list poisoned").drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playersync_bus::InProcessBus;
    use playersync_store::InMemoryRemoteStore;
    use playersync_test_utils::stored_record;
    use uuid::Uuid;

    fn engine_with(store: Arc<InMemoryRemoteStore>) -> SyncEngine {
        SyncEngine::new(store, Arc::new(InProcessBus::new()), CacheConfig::default())
    }

    #[tokio::test]
    async fn own_echo_leaves_cache_alone() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let record = stored_record("Steve");
        let id = record.id();
        store.insert_raw(record);
        let engine = engine_with(store);

        engine.read(id).await.unwrap();
        let echo = InvalidationEvent::updated(id, engine.process_id(), 99);
        engine.apply_event(echo).await;
        assert_eq!(engine.cache().version_of(&id), Some(1));
    }

    #[tokio::test]
    async fn newer_foreign_update_evicts() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let record = stored_record("Steve");
        let id = record.id();
        store.insert_raw(record);
        let engine = engine_with(store);

        engine.read(id).await.unwrap();
        engine
            .apply_event(InvalidationEvent::updated(id, new_process_id(), 2))
            .await;
        assert_eq!(engine.cache().version_of(&id), None);
    }

    #[tokio::test]
    async fn stale_foreign_update_is_ignored() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let mut record = stored_record("Steve");
        record.version = 5;
        let id = record.id();
        store.insert_raw(record);
        let engine = engine_with(store);

        engine.read(id).await.unwrap();
        // reordered event carrying an older version than what we hold
        engine
            .apply_event(InvalidationEvent::updated(id, new_process_id(), 3))
            .await;
        assert_eq!(engine.cache().version_of(&id), Some(5));
        // same-version too
        engine
            .apply_event(InvalidationEvent::updated(id, new_process_id(), 5))
            .await;
        assert_eq!(engine.cache().version_of(&id), Some(5));
    }

    #[tokio::test]
    async fn duplicate_events_are_idempotent() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let record = stored_record("Steve");
        let id = record.id();
        store.insert_raw(record);
        let engine = engine_with(store);

        engine.read(id).await.unwrap();
        let event = InvalidationEvent::updated(id, new_process_id(), 2);
        engine.apply_event(event.clone()).await;
        engine.apply_event(event).await;
        // first delivery evicted, redelivery found nothing to do
        assert_eq!(engine.cache().version_of(&id), None);
        assert!(engine.read(id).await.is_ok());
    }

    #[tokio::test]
    async fn removal_evicts_even_pinned_entries() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let engine = engine_with(Arc::clone(&store));
        let handle = engine
            .on_login(PlayerIdentity::new(Uuid::new_v4(), "Steve"))
            .await
            .unwrap();
        let id = handle.player.id;
        assert!(engine.cache().version_of(&id).is_some());

        engine
            .apply_event(InvalidationEvent::removed(id, new_process_id()))
            .await;
        assert_eq!(engine.cache().version_of(&id), None);
    }

    #[tokio::test]
    async fn logout_racing_a_read_leaves_the_entry_unpinned() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let engine = SyncEngine::new(
            store,
            Arc::new(InProcessBus::new()),
            CacheConfig::new().with_ttl(std::time::Duration::from_millis(20)),
        );
        let player = PlayerIdentity::new(Uuid::new_v4(), "Steve");
        let id = player.id;
        let handle = engine.on_login(player).await.unwrap();
        engine.cache().invalidate(&id);

        // the per-player lock grants these in either order; whichever way
        // it falls, the session is over and the entry must not stay pinned
        let (read, logout) = tokio::join!(engine.read(id), engine.on_logout(&handle));
        read.unwrap();
        logout.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(engine.cache().sweep() >= 1);
        assert_eq!(engine.cache().version_of(&id), None);
    }

    #[tokio::test]
    async fn update_event_clears_negative_entry() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let engine = engine_with(Arc::clone(&store));
        let id = Uuid::new_v4();

        assert!(matches!(
            engine.read(id).await,
            Err(SyncError::Store(StoreError::NotFound { .. }))
        ));
        // absence is now cached; a foreign create must clear it
        let mut record = stored_record("Steve");
        record.identity.id = id;
        store.insert_raw(record);
        engine
            .apply_event(InvalidationEvent::updated(id, new_process_id(), 1))
            .await;
        assert!(engine.read(id).await.is_ok());
    }

    #[tokio::test]
    async fn session_notices_reach_local_subscribers() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let engine = engine_with(store);
        let mut notices = engine.subscribe_events();

        let handle = engine
            .on_login(PlayerIdentity::new(Uuid::new_v4(), "Steve"))
            .await
            .unwrap();
        let first = notices.recv().await.unwrap();
        assert_eq!(first.reason, InvalidationReason::Updated);
        let second = notices.recv().await.unwrap();
        assert_eq!(second.reason, InvalidationReason::SessionStarted);
        assert_eq!(second.player_id, handle.player.id);
    }
}
