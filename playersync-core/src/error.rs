//! Error types for PlayerSync operations

use crate::{PlayerId, RecordVersion};
use thiserror::Error;

/// Remote store errors.
///
/// Domain errors (`NotFound`, `VersionConflict`) are surfaced immediately
/// and never retried; transport errors (`Unavailable`, `Timeout`) are
/// retried inside the store client up to a fixed bound before leaking out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No record for player {id}")]
    NotFound { id: PlayerId },

    #[error("No record for player named {name:?}")]
    NameNotFound { name: String },

    #[error("Version conflict for player {id}: expected {expected}, store holds {actual}")]
    VersionConflict {
        id: PlayerId,
        expected: RecordVersion,
        actual: RecordVersion,
    },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store call timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Malformed wire payload: {reason}")]
    Decode { reason: String },
}

impl StoreError {
    /// Transport-level failures are worth retrying; domain errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Invalidation bus errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("Bus connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Publish failed: {reason}")]
    PublishFailed { reason: String },

    #[error("Subscribe failed: {reason}")]
    SubscribeFailed { reason: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level engine error surfaced at the host integration boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("No active session for player {id} on this process")]
    NoSession { id: PlayerId },

    #[error("Engine is shut down")]
    ShutDown,
}

/// Result alias used throughout the engine.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn retryability_follows_taxonomy() {
        let id = Uuid::new_v4();
        assert!(!StoreError::NotFound { id }.is_retryable());
        assert!(!StoreError::VersionConflict {
            id,
            expected: 1,
            actual: 2
        }
        .is_retryable());
        assert!(StoreError::Unavailable {
            reason: "connection refused".into()
        }
        .is_retryable());
        assert!(StoreError::Timeout { millis: 500 }.is_retryable());
        assert!(!StoreError::Decode {
            reason: "bad uuid".into()
        }
        .is_retryable());
    }
}
