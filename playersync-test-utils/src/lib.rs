//! PlayerSync Test Utilities
//!
//! Centralized test infrastructure for the PlayerSync workspace:
//! - Fixture builders for player records and sessions
//! - Proptest generators for the core types
//! - Re-exported in-memory store and bus doubles

// Re-export the in-memory doubles from their source crates
pub use playersync_bus::InProcessBus;
pub use playersync_store::InMemoryRemoteStore;

// Re-export core types for convenience
pub use playersync_core::{
    new_process_id, AttributeValue, BusError, CacheConfig, InvalidationEvent, InvalidationReason,
    PlayerId, PlayerIdentity, PlayerRecord, PlayerSyncConfig, ProcessId, RecordVersion,
    SessionHandle, StoreError, SyncError, Timestamp, VERSION_NONE,
};

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .init();
});

/// Install the test tracing subscriber once per process. Safe to call from
/// every test; honors `RUST_LOG`.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A deterministic timestamp well in the past, for fixtures that should not
/// depend on the wall clock.
pub fn fixed_time() -> Timestamp {
    Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap()
}

/// Fresh identity with a random id.
pub fn identity(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(Uuid::new_v4(), name)
}

/// A never-logged-in record for `name`, version zero.
pub fn new_record(name: &str) -> PlayerRecord {
    PlayerRecord::new(identity(name), fixed_time())
}

/// A record as it would look after a store round-trip: version 1, some
/// playtime, one attribute.
pub fn stored_record(name: &str) -> PlayerRecord {
    let mut record = new_record(name);
    record.version = 1;
    record.playtime_ms = 3_600_000;
    record.set_attribute("rank", AttributeValue::Text("member".into()));
    record
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01, always representable
        (1_577_836_800_000i64..1_893_456_000_000i64)
            .prop_map(|ms| Utc.timestamp_millis_opt(ms).single().unwrap())
    }

    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_]{3,16}"
    }

    pub fn arb_attribute_value() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            "[a-z]{0,24}".prop_map(AttributeValue::Text),
            any::<i64>().prop_map(AttributeValue::Integer),
            (-1.0e9..1.0e9f64).prop_map(AttributeValue::Decimal),
            any::<bool>().prop_map(AttributeValue::Flag),
        ]
    }

    pub fn arb_identity() -> impl Strategy<Value = PlayerIdentity> {
        (arb_uuid(), arb_name()).prop_map(|(id, name)| PlayerIdentity::new(id, &name))
    }

    pub fn arb_record() -> impl Strategy<Value = PlayerRecord> {
        (
            arb_identity(),
            arb_timestamp(),
            arb_timestamp(),
            0u64..10_000_000_000,
            any::<bool>(),
            proptest::collection::btree_map("[a-z]{1,12}", arb_attribute_value(), 0..6),
            0u64..1_000_000,
        )
            .prop_map(
                |(identity, first_login, last_login, playtime_ms, online, attributes, version)| {
                    let mut record = PlayerRecord::new(identity, first_login);
                    record.last_login = last_login;
                    record.playtime_ms = playtime_ms as i64;
                    record.online = online;
                    record.attributes = attributes;
                    record.version = version;
                    record
                },
            )
    }

    pub fn arb_reason() -> impl Strategy<Value = InvalidationReason> {
        prop_oneof![
            Just(InvalidationReason::Updated),
            Just(InvalidationReason::Removed),
            Just(InvalidationReason::SessionStarted),
            Just(InvalidationReason::SessionEnded),
        ]
    }

    pub fn arb_event() -> impl Strategy<Value = InvalidationEvent> {
        (arb_uuid(), arb_reason(), arb_uuid(), any::<u64>()).prop_map(
            |(player_id, reason, origin, version)| InvalidationEvent {
                player_id,
                reason,
                origin,
                version,
            },
        )
    }
}
