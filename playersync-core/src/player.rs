//! Player identity and record types

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Globally unique player identifier. Minecraft account ids are v4 UUIDs.
///
/// The id is the sole cache and store key; display names are mutable and
/// only resolved through the store.
pub type PlayerId = Uuid;

/// Monotonically increasing record version used for optimistic concurrency.
pub type RecordVersion = u64;

/// Sentinel passed as `expected_version` when creating a record that does
/// not exist yet. A store that already holds the record rejects the write
/// with a version conflict.
pub const VERSION_NONE: RecordVersion = 0;

/// Immutable (id, display name) pair. The name is the display name at the
/// time the record was read; the id never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerIdentity {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Typed attribute value for cross-feature extensibility.
///
/// A closed union of known kinds rather than an untyped bag: unknown kinds
/// fail at the wire boundary instead of flowing through the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Flag(bool),
}

/// The versioned player payload.
///
/// Profile fields plus a map of named attributes. The `version` is assigned
/// by the authoritative store and increases by one on every committed write;
/// a write carrying a stale version is rejected, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub identity: PlayerIdentity,
    /// First-ever login on the network.
    pub first_login: Timestamp,
    /// Most recent login (or logout write-back).
    pub last_login: Timestamp,
    /// Accumulated playtime in milliseconds.
    pub playtime_ms: i64,
    /// Whether any process currently holds a session for this player.
    pub online: bool,
    /// Backend server the player is connected to, if online.
    pub connected_server: Option<String>,
    /// Proxy instance the player entered through, if online.
    pub connected_proxy: Option<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub version: RecordVersion,
}

impl PlayerRecord {
    /// A fresh record for a first-ever login, version `VERSION_NONE` so the
    /// store treats the first write as a create.
    pub fn new(identity: PlayerIdentity, now: Timestamp) -> Self {
        Self {
            identity,
            first_login: now,
            last_login: now,
            playtime_ms: 0,
            online: false,
            connected_server: None,
            connected_proxy: None,
            attributes: BTreeMap::new(),
            version: VERSION_NONE,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.identity.id
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }
}
