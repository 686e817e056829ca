//! PlayerSync Wire Contract
//!
//! Message shapes exchanged over the remote procedure channel and the
//! invalidation channel, plus the unary gRPC client for the
//! `playersync.PlayerStore` service. The messages are written by hand with
//! prost derives; there is deliberately no codegen step.
//!
//! No logic lives here beyond encoding, decoding and mapping to the core
//! data model.

pub mod client;
pub mod mapper;
pub mod wire;

pub use client::PlayerStoreClient;
pub use mapper::{event_from_wire, event_to_wire, record_from_wire, record_to_wire};

/// Single shared pub/sub channel carrying all invalidation events, each
/// frame tagged with its player id. One channel for the whole namespace
/// keeps the subscription count bounded.
pub const INVALIDATION_CHANNEL: &str = "playersync:inv";
