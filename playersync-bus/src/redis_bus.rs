//! Redis pub/sub bus.
//!
//! Publishes prost-encoded frames on one shared channel
//! ([`playersync_proto::INVALIDATION_CHANNEL`]). A frame that fails to
//! decode is logged and skipped; a malformed message from one process must
//! never take down another process's subscriber loop.

use crate::{EventStream, InvalidationBus};
use async_trait::async_trait;
use futures::StreamExt;
use playersync_core::{BusConfig, BusError, InvalidationEvent};
use playersync_proto::{mapper, wire, INVALIDATION_CHANNEL};
use prost::Message;
use redis::AsyncCommands;
use tracing::warn;

pub struct RedisBus {
    client: redis::Client,
    publish_conn: redis::aio::MultiplexedConnection,
    channel: String,
}

impl RedisBus {
    /// Connect to the Redis named in `config`.
    pub async fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let client = redis::Client::open(config.url()).map_err(|e| BusError::ConnectionFailed {
            reason: e.to_string(),
        })?;
        let publish_conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BusError::ConnectionFailed {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            publish_conn,
            channel: INVALIDATION_CHANNEL.to_string(),
        })
    }
}

#[async_trait]
impl InvalidationBus for RedisBus {
    async fn publish(&self, event: &InvalidationEvent) -> Result<(), BusError> {
        let frame = mapper::event_to_wire(event).encode_to_vec();
        let mut conn = self.publish_conn.clone();
        let _receivers: i64 = conn
            .publish(&self.channel, frame)
            .await
            .map_err(|e| BusError::PublishFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<EventStream, BusError> {
        // pub/sub needs a dedicated connection
        let mut pubsub =
            self.client
                .get_async_pubsub()
                .await
                .map_err(|e| BusError::SubscribeFailed {
                    reason: e.to_string(),
                })?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BusError::SubscribeFailed {
                reason: e.to_string(),
            })?;
        let stream = pubsub.into_on_message().filter_map(|message| async move {
            let payload: Vec<u8> = match message.get_payload() {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(%error, "invalidation frame with unreadable payload");
                    return None;
                }
            };
            let frame = match wire::InvalidationEvent::decode(payload.as_slice()) {
                Ok(frame) => frame,
                Err(error) => {
                    warn!(%error, "failed to decode invalidation frame");
                    return None;
                }
            };
            match mapper::event_from_wire(&frame) {
                Ok(event) => Some(event),
                Err(error) => {
                    warn!(%error, "invalid invalidation frame contents");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
