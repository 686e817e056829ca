//! Conversions between wire messages and the core data model.
//!
//! Decoding is strict: malformed UUIDs, out-of-range timestamps and missing
//! required messages are rejected instead of being smoothed over.

use crate::wire;
use chrono::{TimeZone, Utc};
use playersync_core::{
    AttributeValue, InvalidationEvent, InvalidationReason, PlayerIdentity, PlayerRecord,
    StoreError, Timestamp,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn decode_error(reason: impl Into<String>) -> StoreError {
    StoreError::Decode {
        reason: reason.into(),
    }
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, StoreError> {
    value
        .parse::<Uuid>()
        .map_err(|_| decode_error(format!("invalid uuid in {field}: {value:?}")))
}

fn parse_millis(value: i64, field: &str) -> Result<Timestamp, StoreError> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| decode_error(format!("timestamp out of range in {field}: {value}")))
}

// ============================================================================
// IDENTITY
// ============================================================================

pub fn identity_from_wire(identity: &wire::PlayerIdentity) -> Result<PlayerIdentity, StoreError> {
    Ok(PlayerIdentity {
        id: parse_uuid(&identity.player_id, "identity.player_id")?,
        name: identity.name.clone(),
    })
}

pub fn identity_to_wire(identity: &PlayerIdentity) -> wire::PlayerIdentity {
    wire::PlayerIdentity {
        player_id: identity.id.to_string(),
        name: identity.name.clone(),
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

pub fn attribute_from_wire(value: &wire::AttributeValue) -> Result<AttributeValue, StoreError> {
    match &value.kind {
        Some(wire::attribute_value::Kind::Text(s)) => Ok(AttributeValue::Text(s.clone())),
        Some(wire::attribute_value::Kind::Integer(i)) => Ok(AttributeValue::Integer(*i)),
        Some(wire::attribute_value::Kind::Decimal(d)) => Ok(AttributeValue::Decimal(*d)),
        Some(wire::attribute_value::Kind::Flag(b)) => Ok(AttributeValue::Flag(*b)),
        None => Err(decode_error("attribute value with no kind set")),
    }
}

pub fn attribute_to_wire(value: &AttributeValue) -> wire::AttributeValue {
    let kind = match value {
        AttributeValue::Text(s) => wire::attribute_value::Kind::Text(s.clone()),
        AttributeValue::Integer(i) => wire::attribute_value::Kind::Integer(*i),
        AttributeValue::Decimal(d) => wire::attribute_value::Kind::Decimal(*d),
        AttributeValue::Flag(b) => wire::attribute_value::Kind::Flag(*b),
    };
    wire::AttributeValue { kind: Some(kind) }
}

// ============================================================================
// RECORD
// ============================================================================

pub fn record_from_wire(record: &wire::PlayerRecord) -> Result<PlayerRecord, StoreError> {
    let identity = record
        .identity
        .as_ref()
        .ok_or_else(|| decode_error("record without identity"))?;
    let mut attributes = BTreeMap::new();
    for (key, value) in &record.attributes {
        attributes.insert(key.clone(), attribute_from_wire(value)?);
    }
    Ok(PlayerRecord {
        identity: identity_from_wire(identity)?,
        first_login: parse_millis(record.first_login_ms, "record.first_login_ms")?,
        last_login: parse_millis(record.last_login_ms, "record.last_login_ms")?,
        playtime_ms: record.playtime_ms,
        online: record.online,
        connected_server: record.connected_server.clone(),
        connected_proxy: record.connected_proxy.clone(),
        attributes,
        version: record.version,
    })
}

pub fn record_to_wire(record: &PlayerRecord) -> wire::PlayerRecord {
    wire::PlayerRecord {
        identity: Some(identity_to_wire(&record.identity)),
        first_login_ms: record.first_login.timestamp_millis(),
        last_login_ms: record.last_login.timestamp_millis(),
        playtime_ms: record.playtime_ms,
        online: record.online,
        connected_server: record.connected_server.clone(),
        connected_proxy: record.connected_proxy.clone(),
        attributes: record
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), attribute_to_wire(v)))
            .collect(),
        version: record.version,
    }
}

// ============================================================================
// INVALIDATION EVENTS
// ============================================================================

pub fn event_from_wire(event: &wire::InvalidationEvent) -> Result<InvalidationEvent, StoreError> {
    let reason = match wire::InvalidationReason::try_from(event.reason) {
        Ok(wire::InvalidationReason::Updated) => InvalidationReason::Updated,
        Ok(wire::InvalidationReason::Removed) => InvalidationReason::Removed,
        Ok(wire::InvalidationReason::SessionStarted) => InvalidationReason::SessionStarted,
        Ok(wire::InvalidationReason::SessionEnded) => InvalidationReason::SessionEnded,
        Ok(wire::InvalidationReason::Unspecified) | Err(_) => {
            return Err(decode_error(format!(
                "unknown invalidation reason {}",
                event.reason
            )))
        }
    };
    Ok(InvalidationEvent {
        player_id: parse_uuid(&event.player_id, "event.player_id")?,
        reason,
        origin: parse_uuid(&event.origin, "event.origin")?,
        version: event.version,
    })
}

pub fn event_to_wire(event: &InvalidationEvent) -> wire::InvalidationEvent {
    let reason = match event.reason {
        InvalidationReason::Updated => wire::InvalidationReason::Updated,
        InvalidationReason::Removed => wire::InvalidationReason::Removed,
        InvalidationReason::SessionStarted => wire::InvalidationReason::SessionStarted,
        InvalidationReason::SessionEnded => wire::InvalidationReason::SessionEnded,
    };
    wire::InvalidationEvent {
        player_id: event.player_id.to_string(),
        reason: reason as i32,
        origin: event.origin.to_string(),
        version: event.version,
    }
}
