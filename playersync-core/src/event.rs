//! Invalidation event types carried on the shared bus

use crate::{PlayerId, ProcessId, RecordVersion};
use serde::{Deserialize, Serialize};

/// Why a record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// The record was written through to the store; `version` carries the
    /// committed version.
    Updated,
    /// The record was deleted from the store.
    Removed,
    /// A process created a session for this player.
    SessionStarted,
    /// A process destroyed its session for this player.
    SessionEnded,
}

/// Transient "record changed" notification. Never persisted.
///
/// Delivery is at-least-once with no cross-player ordering guarantee, so
/// consumers must be idempotent and compare `version` against what they
/// already hold before acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub player_id: PlayerId,
    pub reason: InvalidationReason,
    /// The engine instance that published the event.
    pub origin: ProcessId,
    /// Version the originating write committed, `0` when not applicable
    /// (removal, session notices).
    pub version: RecordVersion,
}

impl InvalidationEvent {
    pub fn updated(player_id: PlayerId, origin: ProcessId, version: RecordVersion) -> Self {
        Self {
            player_id,
            reason: InvalidationReason::Updated,
            origin,
            version,
        }
    }

    pub fn removed(player_id: PlayerId, origin: ProcessId) -> Self {
        Self {
            player_id,
            reason: InvalidationReason::Removed,
            origin,
            version: 0,
        }
    }

    pub fn session_started(player_id: PlayerId, origin: ProcessId) -> Self {
        Self {
            player_id,
            reason: InvalidationReason::SessionStarted,
            origin,
            version: 0,
        }
    }

    pub fn session_ended(player_id: PlayerId, origin: ProcessId) -> Self {
        Self {
            player_id,
            reason: InvalidationReason::SessionEnded,
            origin,
            version: 0,
        }
    }
}
