//! In-process bus over a tokio broadcast channel.
//!
//! Useful for tests and single-host deployments where every "process" is a
//! task in the same runtime. A lagging subscriber loses the oldest events
//! (broadcast semantics); that is acceptable because the cache TTL sweep is
//! the safety net for missed invalidations.

use crate::{EventStream, InvalidationBus};
use async_trait::async_trait;
use futures::StreamExt;
use playersync_core::{BusError, InvalidationEvent};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

const DEFAULT_CAPACITY: usize = 1024;

pub struct InProcessBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvalidationBus for InProcessBus {
    async fn publish(&self, event: &InvalidationEvent) -> Result<(), BusError> {
        // send only fails when there is no receiver at all, which is not an
        // error for a notification channel
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<EventStream, BusError> {
        let receiver = self.sender.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "invalidation subscriber lagged, events dropped");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
