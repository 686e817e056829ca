//! PlayerSync Core - Shared Data Model
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types, errors and configuration - no I/O.

pub mod config;
pub mod error;
pub mod event;
pub mod player;
pub mod session;

pub use config::{BusConfig, CacheConfig, PlayerSyncConfig, RetryConfig, StoreConfig};
pub use error::{BusError, ConfigError, StoreError, SyncError, SyncResult};
pub use event::{InvalidationEvent, InvalidationReason};
pub use player::{
    AttributeValue, PlayerId, PlayerIdentity, PlayerRecord, RecordVersion, VERSION_NONE,
};
pub use session::{SessionHandle, SessionId};

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Identifier for one engine instance (one game-server process).
///
/// Carried on every published invalidation event so a process can tell its
/// own echoes apart from foreign mutations.
pub type ProcessId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh process id for this engine instance.
pub fn new_process_id() -> ProcessId {
    Uuid::new_v4()
}
