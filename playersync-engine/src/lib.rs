//! PlayerSync Engine - per-process synchronization runtime
//!
//! One [`SyncEngine`] per host process. It owns the local record cache and
//! session registry, talks to the authoritative store through a
//! [`playersync_store::RemoteStore`], and keeps caches across the fleet
//! coherent through a [`playersync_bus::InvalidationBus`].

pub mod cache;
pub mod engine;
mod locks;
pub mod session;

pub use cache::{CacheStats, CachedRecord, LocalCache};
pub use engine::SyncEngine;
pub use session::SessionRegistry;
