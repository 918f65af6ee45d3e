//! Message envelope and payload types

use core_types::{PortId, TaskId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a message ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Msg({})", self.0)
    }
}

/// Schema version carried by a payload
///
/// Versions with the same major number are compatible. Enforcement is
/// a receiver concern; the queue layer only transports the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u32,
    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Checks if this version is compatible with another
    pub fn is_compatible_with(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Payload encoding or decoding failure
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Value could not be serialized
    #[error("failed to encode payload: {0}")]
    Encode(serde_json::Error),
    /// Bytes could not be deserialized into the requested type
    #[error("failed to decode payload: {0}")]
    Decode(serde_json::Error),
}

/// Type-erased, serialized message payload
///
/// Senders encode a typed value; the queue treats the bytes as opaque;
/// the receiver decodes with the type it expects for the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    bytes: Vec<u8>,
}

impl MessagePayload {
    /// Encodes a value into a payload
    pub fn new<T: Serialize>(value: &T) -> Result<Self, PayloadError> {
        let bytes = serde_json::to_vec(value).map_err(PayloadError::Encode)?;
        Ok(Self { bytes })
    }

    /// An empty payload for body-less messages
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Decodes the payload into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_slice(&self.bytes).map_err(PayloadError::Decode)
    }

    /// Returns the serialized size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Message envelope containing routing and sender-asserted metadata
///
/// Ownership of an envelope passes from the sender to the destination
/// queue and from the queue to exactly one receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Unique identifier for this message
    pub id: MessageId,
    /// Destination port
    pub destination: PortId,
    /// Sending task, as asserted by the sender
    pub source: Option<TaskId>,
    /// Action or method to invoke
    pub action: String,
    /// Schema version of the payload
    pub schema_version: SchemaVersion,
    /// Correlation ID for request/response matching
    pub correlation_id: Option<MessageId>,
    /// Serialized payload (type-erased)
    pub payload: MessagePayload,
}

impl MessageEnvelope {
    /// Creates a new message envelope
    pub fn new(
        destination: PortId,
        action: String,
        schema_version: SchemaVersion,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id: MessageId::new(),
            destination,
            source: None,
            action,
            schema_version,
            correlation_id: None,
            payload,
        }
    }

    /// Sets the asserted source task
    pub fn with_source(mut self, source: TaskId) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the correlation ID for a response
    pub fn with_correlation(mut self, request: MessageId) -> Self {
        self.correlation_id = Some(request);
        self
    }

    /// Returns the payload size in bytes, used for receive bounds
    pub fn body_len(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
    }

    fn envelope(action: &str) -> MessageEnvelope {
        MessageEnvelope::new(
            PortId::new(),
            action.to_string(),
            SchemaVersion::new(1, 0),
            MessagePayload::new(&Ping { seq: 7 }).unwrap(),
        )
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = MessagePayload::new(&Ping { seq: 42 }).unwrap();
        let back: Ping = payload.decode().unwrap();
        assert_eq!(back, Ping { seq: 42 });
    }

    #[test]
    fn test_payload_decode_wrong_type_fails() {
        let payload = MessagePayload::new(&"a string").unwrap();
        let result: Result<Ping, _> = payload.decode();
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = envelope("x");
        let b = envelope("x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_envelope_correlation() {
        let request = envelope("req");
        let reply = envelope("rep").with_correlation(request.id);
        assert_eq!(reply.correlation_id, Some(request.id));
    }

    #[test]
    fn test_body_len_matches_payload() {
        let msg = envelope("x");
        assert_eq!(msg.body_len(), msg.payload.len());
        assert!(msg.body_len() > 0);
    }

    #[test]
    fn test_schema_compatibility() {
        let v1_0 = SchemaVersion::new(1, 0);
        let v1_3 = SchemaVersion::new(1, 3);
        let v2_0 = SchemaVersion::new(2, 0);
        assert!(v1_0.is_compatible_with(&v1_3));
        assert!(!v1_0.is_compatible_with(&v2_0));
    }
}
