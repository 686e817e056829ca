//! PlayerSync Store - Remote Store Client
//!
//! Defines the `RemoteStore` seam between the synchronization engine and the
//! authoritative player store, the gRPC-backed production implementation and
//! an in-memory mock that enforces the same optimistic-concurrency rules the
//! real store does.
//!
//! Nothing in this crate touches the local cache; a store client's only side
//! effect is the network call itself.

pub mod grpc;
pub mod memory;

pub use grpc::GrpcRemoteStore;
pub use memory::InMemoryRemoteStore;

use async_trait::async_trait;
use playersync_core::{
    AttributeValue, PlayerId, PlayerIdentity, PlayerRecord, RecordVersion, StoreError,
};

/// One page of a `list_by_attribute` result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerPage {
    pub players: Vec<PlayerIdentity>,
    /// `None` when this was the last page.
    pub next_page_token: Option<String>,
}

/// Client-side contract against the authoritative player store.
///
/// Transport failures are classified by implementations into
/// [`StoreError::Unavailable`] / [`StoreError::Timeout`] (retried internally
/// up to a fixed bound) while domain errors ([`StoreError::NotFound`],
/// [`StoreError::VersionConflict`]) surface immediately and are never
/// retried. Retry mechanics never leak to the caller.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the record for `id`.
    async fn fetch(&self, id: PlayerId) -> Result<PlayerRecord, StoreError>;

    /// Fetch the record for the player currently using `name`.
    async fn fetch_by_name(&self, name: &str) -> Result<PlayerRecord, StoreError>;

    /// Write `record` through to the store.
    ///
    /// `expected_version` is the version the caller last observed
    /// ([`playersync_core::VERSION_NONE`] to create). On success the store
    /// returns the committed version, which is always `expected_version + 1`
    /// for an accepted write.
    async fn write(
        &self,
        record: &PlayerRecord,
        expected_version: RecordVersion,
    ) -> Result<RecordVersion, StoreError>;

    /// Delete the record for `id`.
    async fn delete(&self, id: PlayerId) -> Result<(), StoreError>;

    /// List players whose attribute `key` equals `value`, one bounded page
    /// at a time. Pass the previous page's token to continue.
    async fn list_by_attribute(
        &self,
        key: &str,
        value: &AttributeValue,
        page_token: Option<&str>,
    ) -> Result<PlayerPage, StoreError>;
}
