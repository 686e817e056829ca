//! Protobuf message definitions for the `playersync.PlayerStore` service
//! and the invalidation channel frames.
//!
//! Field numbers are part of the wire contract; never reuse a retired tag.
//! Timestamps travel as milliseconds since the Unix epoch, UUIDs as their
//! canonical string form.

/// Immutable (id, display name) pair as it travels on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerIdentity {
    #[prost(string, tag = "1")]
    pub player_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
}

/// Typed attribute value; exactly one kind is set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributeValue {
    #[prost(oneof = "attribute_value::Kind", tags = "1, 2, 3, 4")]
    pub kind: ::core::option::Option<attribute_value::Kind>,
}

pub mod attribute_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(string, tag = "1")]
        Text(::prost::alloc::string::String),
        #[prost(int64, tag = "2")]
        Integer(i64),
        #[prost(double, tag = "3")]
        Decimal(f64),
        #[prost(bool, tag = "4")]
        Flag(bool),
    }
}

/// The versioned player payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerRecord {
    #[prost(message, optional, tag = "1")]
    pub identity: ::core::option::Option<PlayerIdentity>,
    #[prost(int64, tag = "2")]
    pub first_login_ms: i64,
    #[prost(int64, tag = "3")]
    pub last_login_ms: i64,
    #[prost(int64, tag = "4")]
    pub playtime_ms: i64,
    #[prost(bool, tag = "5")]
    pub online: bool,
    #[prost(string, optional, tag = "6")]
    pub connected_server: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "7")]
    pub connected_proxy: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(btree_map = "string, message", tag = "8")]
    pub attributes:
        ::prost::alloc::collections::BTreeMap<::prost::alloc::string::String, AttributeValue>,
    #[prost(uint64, tag = "9")]
    pub version: u64,
}

// ============================================================================
// REQUEST / RESPONSE MESSAGES
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPlayerRequest {
    #[prost(string, tag = "1")]
    pub player_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPlayerByNameRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPlayerResponse {
    #[prost(message, optional, tag = "1")]
    pub record: ::core::option::Option<PlayerRecord>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertPlayerRequest {
    #[prost(message, optional, tag = "1")]
    pub record: ::core::option::Option<PlayerRecord>,
    /// Version the caller last observed; `0` means "create new".
    #[prost(uint64, tag = "2")]
    pub expected_version: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpsertPlayerResponse {
    #[prost(uint64, tag = "1")]
    pub new_version: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeletePlayerRequest {
    #[prost(string, tag = "1")]
    pub player_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeletePlayerResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListByAttributeRequest {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<AttributeValue>,
    /// Upper bound on the page size; the server may return fewer.
    #[prost(uint32, tag = "3")]
    pub page_size: u32,
    /// Empty on the first request.
    #[prost(string, tag = "4")]
    pub page_token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListByAttributeResponse {
    #[prost(message, repeated, tag = "1")]
    pub players: ::prost::alloc::vec::Vec<PlayerIdentity>,
    /// Empty when there are no further pages.
    #[prost(string, tag = "2")]
    pub next_page_token: ::prost::alloc::string::String,
}

// ============================================================================
// INVALIDATION CHANNEL FRAME
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InvalidationReason {
    Unspecified = 0,
    Updated = 1,
    Removed = 2,
    SessionStarted = 3,
    SessionEnded = 4,
}

/// Frame published on [`crate::INVALIDATION_CHANNEL`]. Transient; never stored.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvalidationEvent {
    #[prost(string, tag = "1")]
    pub player_id: ::prost::alloc::string::String,
    #[prost(enumeration = "InvalidationReason", tag = "2")]
    pub reason: i32,
    /// Publishing process id, so subscribers can drop their own echoes.
    #[prost(string, tag = "3")]
    pub origin: ::prost::alloc::string::String,
    #[prost(uint64, tag = "4")]
    pub version: u64,
}
