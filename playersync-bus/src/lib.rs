//! PlayerSync Bus - Invalidation Propagation
//!
//! Publish/subscribe channel carrying "record changed" notifications between
//! engine instances. Delivery is at-least-once with no cross-player ordering
//! guarantee; the engine compensates by comparing event versions against its
//! cache, so every implementation here only has to move frames, not order
//! them.

mod memory;
#[cfg(feature = "redis")]
mod redis_bus;

pub use memory::InProcessBus;
#[cfg(feature = "redis")]
pub use redis_bus::RedisBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use playersync_core::{BusError, InvalidationEvent};

/// Stream of invalidation events as delivered to one subscriber.
pub type EventStream = BoxStream<'static, InvalidationEvent>;

/// Shared publish/subscribe medium for invalidation events.
///
/// Implementations never filter: every subscriber sees every event,
/// including the publisher's own echoes. Filtering (self-origin, stale
/// versions) is the consumer's job because only the consumer knows what it
/// has cached.
#[async_trait]
pub trait InvalidationBus: Send + Sync {
    /// Publish one event to all current subscribers.
    async fn publish(&self, event: &InvalidationEvent) -> Result<(), BusError>;

    /// Open a new subscription. Events published before this call are not
    /// replayed.
    async fn subscribe(&self) -> Result<EventStream, BusError>;
}
