//! # IPC Messages
//!
//! Pending-message envelopes and the kernel notification messages that
//! the IPC core itself originates.
//!
//! ## Philosophy
//!
//! The wire format of user payloads is not this crate's business: a
//! payload is an opaque, serialized blob that passes from sender to
//! queue to receiver exactly once. What this crate fixes is the
//! envelope around it (identity, destination port, sender-asserted
//! fields) and the small vocabulary of messages the kernel sends on
//! its own behalf (dead-name, port-deleted, send-once notifications).

pub mod message;
pub mod notify;

pub use message::{MessageEnvelope, MessageId, MessagePayload, PayloadError, SchemaVersion};
pub use notify::{
    dead_name_notification, port_deleted_notification, send_once_notification, NotifyBody,
    ACTION_DEAD_NAME, ACTION_PORT_DELETED, ACTION_SEND_ONCE, NOTIFY_SCHEMA_VERSION,
};
