//! gRPC-backed remote store client.
//!
//! Wraps the wire stub with the failure semantics the engine relies on:
//! every call runs under a bounded deadline, transport failures are retried
//! a fixed number of times with exponential backoff, and domain errors pass
//! through untouched on the first occurrence.

use crate::{PlayerPage, RemoteStore};
use async_trait::async_trait;
use playersync_core::{
    AttributeValue, PlayerId, PlayerRecord, RecordVersion, RetryConfig, StoreConfig, StoreError,
};
use playersync_proto::{mapper, wire, PlayerStoreClient};
use std::future::Future;
use std::time::Duration;
use tonic::{Code, Status};
use tracing::{debug, warn};

/// Metadata key on which the store reports the current version alongside an
/// `ABORTED` status, so conflicts carry both sides of the disagreement.
const CURRENT_VERSION_METADATA: &str = "x-current-version";

pub struct GrpcRemoteStore {
    client: PlayerStoreClient,
    request_timeout: Duration,
    retry: RetryConfig,
}

impl GrpcRemoteStore {
    /// Connect to the store named in `config`. Fails fast: a store that is
    /// down at startup is a deployment problem, not something to mask.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = PlayerStoreClient::connect(config.endpoint.clone())
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("connect to {}: {e}", config.endpoint),
            })?;
        Ok(Self::new(client, config))
    }

    pub fn new(client: PlayerStoreClient, config: &StoreConfig) -> Self {
        Self {
            client,
            request_timeout: config.request_timeout(),
            retry: config.retry.clone(),
        }
    }

    /// Run `call` under the per-call deadline, retrying transport failures
    /// with bounded backoff. Domain errors return on first sight.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut(PlayerStoreClient) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let outcome = match tokio::time::timeout(self.request_timeout, call(self.client.clone()))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout {
                    millis: self.request_timeout.as_millis() as u64,
                }),
            };
            match outcome {
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    let backoff = self.retry.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %error,
                        "store call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(error) => {
                    debug!(operation, %error, "store call failed");
                    return Err(error);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

/// Classify a gRPC status into the engine's error taxonomy.
fn classify_get(status: &Status, id: PlayerId, deadline_ms: u64) -> StoreError {
    match status.code() {
        Code::NotFound => StoreError::NotFound { id },
        _ => classify_transport(status, deadline_ms),
    }
}

fn classify_transport(status: &Status, deadline_ms: u64) -> StoreError {
    match status.code() {
        Code::DeadlineExceeded => StoreError::Timeout {
            millis: deadline_ms,
        },
        _ => StoreError::Unavailable {
            reason: format!("{}: {}", status.code(), status.message()),
        },
    }
}

fn conflict_from_status(
    status: &Status,
    id: PlayerId,
    expected: RecordVersion,
) -> StoreError {
    let actual = status
        .metadata()
        .get(CURRENT_VERSION_METADATA)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<RecordVersion>().ok())
        .unwrap_or(0);
    StoreError::VersionConflict {
        id,
        expected,
        actual,
    }
}

#[async_trait]
impl RemoteStore for GrpcRemoteStore {
    async fn fetch(&self, id: PlayerId) -> Result<PlayerRecord, StoreError> {
        let deadline_ms = self.request_timeout.as_millis() as u64;
        self.with_retry("fetch", move |mut client| async move {
            let request = wire::GetPlayerRequest {
                player_id: id.to_string(),
            };
            let response = client
                .get_player(request)
                .await
                .map_err(|status| classify_get(&status, id, deadline_ms))?;
            let record = response
                .into_inner()
                .record
                .ok_or(StoreError::NotFound { id })?;
            mapper::record_from_wire(&record)
        })
        .await
    }

    async fn fetch_by_name(&self, name: &str) -> Result<PlayerRecord, StoreError> {
        let name = name.to_string();
        let deadline_ms = self.request_timeout.as_millis() as u64;
        self.with_retry("fetch_by_name", move |mut client| {
            let name = name.clone();
            async move {
                let request = wire::GetPlayerByNameRequest { name: name.clone() };
                let response = client.get_player_by_name(request).await.map_err(|status| {
                    match status.code() {
                        Code::NotFound => StoreError::NameNotFound { name: name.clone() },
                        _ => classify_transport(&status, deadline_ms),
                    }
                })?;
                let record = response
                    .into_inner()
                    .record
                    .ok_or(StoreError::NameNotFound { name })?;
                mapper::record_from_wire(&record)
            }
        })
        .await
    }

    async fn write(
        &self,
        record: &PlayerRecord,
        expected_version: RecordVersion,
    ) -> Result<RecordVersion, StoreError> {
        let id = record.id();
        let deadline_ms = self.request_timeout.as_millis() as u64;
        let wire_record = mapper::record_to_wire(record);
        self.with_retry("write", move |mut client| {
            let wire_record = wire_record.clone();
            async move {
                let request = wire::UpsertPlayerRequest {
                    record: Some(wire_record),
                    expected_version,
                };
                let response =
                    client
                        .upsert_player(request)
                        .await
                        .map_err(|status| match status.code() {
                            Code::Aborted => conflict_from_status(&status, id, expected_version),
                            Code::NotFound => StoreError::NotFound { id },
                            _ => classify_transport(&status, deadline_ms),
                        })?;
                Ok(response.into_inner().new_version)
            }
        })
        .await
    }

    async fn delete(&self, id: PlayerId) -> Result<(), StoreError> {
        let deadline_ms = self.request_timeout.as_millis() as u64;
        self.with_retry("delete", move |mut client| async move {
            let request = wire::DeletePlayerRequest {
                player_id: id.to_string(),
            };
            client
                .delete_player(request)
                .await
                .map_err(|status| classify_get(&status, id, deadline_ms))?;
            Ok(())
        })
        .await
    }

    async fn list_by_attribute(
        &self,
        key: &str,
        value: &AttributeValue,
        page_token: Option<&str>,
    ) -> Result<PlayerPage, StoreError> {
        let key = key.to_string();
        let value = mapper::attribute_to_wire(value);
        let page_token = page_token.unwrap_or_default().to_string();
        let deadline_ms = self.request_timeout.as_millis() as u64;
        self.with_retry("list_by_attribute", move |mut client| {
            let key = key.clone();
            let value = value.clone();
            let page_token = page_token.clone();
            async move {
                let request = wire::ListByAttributeRequest {
                    key,
                    value: Some(value),
                    page_size: 0, // server default
                    page_token,
                };
                let response = client
                    .list_by_attribute(request)
                    .await
                    .map_err(|status| classify_transport(&status, deadline_ms))?
                    .into_inner();
                let mut players = Vec::with_capacity(response.players.len());
                for identity in &response.players {
                    players.push(mapper::identity_from_wire(identity)?);
                }
                let next_page_token = if response.next_page_token.is_empty() {
                    None
                } else {
                    Some(response.next_page_token)
                };
                Ok(PlayerPage {
                    players,
                    next_page_token,
                })
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_status_maps_to_domain_error() {
        let id = Uuid::new_v4();
        let error = classify_get(&Status::not_found("no such player"), id, 2_000);
        assert_eq!(error, StoreError::NotFound { id });
        assert!(!error.is_retryable());
    }

    #[test]
    fn transport_statuses_are_retryable() {
        let id = Uuid::new_v4();
        assert!(classify_get(&Status::unavailable("connection reset"), id, 2_000).is_retryable());
        assert!(classify_get(&Status::deadline_exceeded("deadline"), id, 2_000).is_retryable());
        // an unrecognized code degrades to Unavailable rather than panicking
        assert!(classify_get(&Status::internal("boom"), id, 2_000).is_retryable());
    }

    #[test]
    fn conflict_reads_current_version_from_metadata() {
        let id = Uuid::new_v4();
        let mut status = Status::aborted("version conflict");
        status
            .metadata_mut()
            .insert(CURRENT_VERSION_METADATA, "7".parse().unwrap());
        assert_eq!(
            conflict_from_status(&status, id, 5),
            StoreError::VersionConflict {
                id,
                expected: 5,
                actual: 7
            }
        );

        // missing metadata still reports the conflict
        let bare = Status::aborted("version conflict");
        assert_eq!(
            conflict_from_status(&bare, id, 5),
            StoreError::VersionConflict {
                id,
                expected: 5,
                actual: 0
            }
        );
    }
}
