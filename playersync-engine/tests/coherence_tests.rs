//! Two engines sharing one store and one bus: the fleet-coherence
//! guarantees. Event delivery is asynchronous, so these tests poll for the
//! expected steady state instead of sleeping a fixed amount.

use playersync_bus::InvalidationBus;
use playersync_engine::SyncEngine;
use playersync_store::RemoteStore;
use playersync_test_utils::{
    identity, new_process_id, stored_record, AttributeValue, CacheConfig, InMemoryRemoteStore,
    InProcessBus, InvalidationEvent, InvalidationReason, StoreError, SyncError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const POLL_ROUNDS: u32 = 400;
const POLL_STEP: Duration = Duration::from_millis(5);

struct Fleet {
    store: Arc<InMemoryRemoteStore>,
    bus: Arc<InProcessBus>,
}

impl Fleet {
    fn new() -> Self {
        playersync_test_utils::init_tracing();
        Self {
            store: Arc::new(InMemoryRemoteStore::new()),
            bus: Arc::new(InProcessBus::new()),
        }
    }

    async fn spawn_engine(&self, server: &str) -> Arc<SyncEngine> {
        self.spawn_engine_with(server, CacheConfig::default()).await
    }

    async fn spawn_engine_with(&self, server: &str, config: CacheConfig) -> Arc<SyncEngine> {
        let store: Arc<dyn RemoteStore> = Arc::clone(&self.store) as _;
        let bus: Arc<dyn InvalidationBus> = Arc::clone(&self.bus) as _;
        let engine = Arc::new(SyncEngine::new(store, bus, config).with_server_name(server));
        Arc::clone(&engine).start().await.unwrap();
        engine
    }
}

#[tokio::test]
async fn foreign_write_invalidates_the_local_copy() {
    let fleet = Fleet::new();
    fleet.store.insert_raw(stored_record("Steve"));
    let first = fleet.spawn_engine("lobby-1").await;
    let second = fleet.spawn_engine("lobby-2").await;
    let id = first.read_by_name("Steve").await.unwrap().id();
    second.read(id).await.unwrap();

    first
        .write(id, |r| r.set_attribute("coins", AttributeValue::Integer(9)))
        .await
        .unwrap();

    // the invalidation evicts second's copy; its next read refetches v2
    let mut converged = false;
    for _ in 0..POLL_ROUNDS {
        if second.read(id).await.unwrap().version == 2 {
            converged = true;
            break;
        }
        sleep(POLL_STEP).await;
    }
    assert!(converged, "second engine never observed the foreign write");
}

#[tokio::test]
async fn foreign_delete_propagates() {
    let fleet = Fleet::new();
    fleet.store.insert_raw(stored_record("Steve"));
    let first = fleet.spawn_engine("lobby-1").await;
    let second = fleet.spawn_engine("lobby-2").await;
    let id = first.read_by_name("Steve").await.unwrap().id();
    second.read(id).await.unwrap();

    first.delete(id).await.unwrap();

    let mut converged = false;
    for _ in 0..POLL_ROUNDS {
        if matches!(
            second.read(id).await,
            Err(SyncError::Store(StoreError::NotFound { .. }))
        ) {
            converged = true;
            break;
        }
        sleep(POLL_STEP).await;
    }
    assert!(converged, "second engine kept serving a deleted record");
}

#[tokio::test]
async fn session_notices_cross_processes() {
    let fleet = Fleet::new();
    let first = fleet.spawn_engine("lobby-1").await;
    let second = fleet.spawn_engine("lobby-2").await;
    let mut notices = second.subscribe_events();

    let player = identity("Steve");
    let handle = first.on_login(player).await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let event = timeout(Duration::from_secs(2), notices.recv())
            .await
            .expect("no login notice arrived")
            .unwrap();
        assert_eq!(event.origin, first.process_id());
        seen.push(event.reason);
    }
    assert!(seen.contains(&InvalidationReason::Updated));
    assert!(seen.contains(&InvalidationReason::SessionStarted));

    first.on_logout(&handle).await.unwrap();
    loop {
        let event = timeout(Duration::from_secs(2), notices.recv())
            .await
            .expect("no logout notice arrived")
            .unwrap();
        if event.reason == InvalidationReason::SessionEnded {
            break;
        }
    }
}

#[tokio::test]
async fn pinned_session_entry_survives_the_sweep() {
    let fleet = Fleet::new();
    let config = CacheConfig::new()
        .with_ttl(Duration::from_millis(30))
        .with_negative_ttl(Duration::from_millis(10))
        .with_sweep_interval(Duration::from_millis(10));
    let engine = fleet.spawn_engine_with("lobby-1", config).await;

    // an online player and a merely-read one
    let online = identity("online");
    engine.on_login(online.clone()).await.unwrap();
    let idle = stored_record("idle");
    let idle_id = idle.id();
    fleet.store.insert_raw(idle);
    engine.read(idle_id).await.unwrap();

    // several sweep cycles pass
    sleep(Duration::from_millis(100)).await;

    fleet.store.set_offline(true);
    // the session entry is pinned and still served
    assert!(engine.read(online.id).await.is_ok());
    // the idle entry expired and now needs the store
    assert!(matches!(
        engine.read(idle_id).await,
        Err(SyncError::Store(StoreError::Unavailable { .. }))
    ));
}

#[tokio::test]
async fn dropping_the_engine_releases_its_subscription() {
    let fleet = Fleet::new();
    let engine = fleet.spawn_engine("lobby-1").await;
    assert_eq!(fleet.bus.subscriber_count(), 1);

    // the background loops hold only weak handles, so this is the last
    // strong reference; teardown must stop them without an explicit
    // shutdown() call
    drop(engine);

    let mut released = false;
    for _ in 0..POLL_ROUNDS {
        if fleet.bus.subscriber_count() == 0 {
            released = true;
            break;
        }
        sleep(POLL_STEP).await;
    }
    assert!(released, "engine tasks kept the bus subscription alive");
}

#[tokio::test]
async fn reordered_stale_event_does_not_evict() {
    let fleet = Fleet::new();
    fleet.store.insert_raw(stored_record("Steve"));
    let engine = fleet.spawn_engine("lobby-1").await;
    let id = engine.read_by_name("Steve").await.unwrap().id();

    // a delayed event about the version we already hold
    let stale = InvalidationEvent::updated(id, new_process_id(), 1);
    fleet.bus.publish(&stale).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    fleet.store.set_offline(true);
    assert_eq!(engine.read(id).await.unwrap().version, 1);
}
