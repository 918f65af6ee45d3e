//! Kernel notification messages
//!
//! These are the only messages the IPC core sends on its own behalf:
//! a dead-name notification when a port a task holds send rights to is
//! destroyed, a port-deleted notification when a name vanishes out
//! from under a registration, and a send-once notification when a
//! kernel-owned send-once right is destroyed without being used.

use crate::message::{MessageEnvelope, MessagePayload, SchemaVersion};
use core_types::{Name, PortId};
use serde::{Deserialize, Serialize};

/// Action identifier for dead-name notifications
pub const ACTION_DEAD_NAME: &str = "ipc.notify.dead-name";
/// Action identifier for port-deleted notifications
pub const ACTION_PORT_DELETED: &str = "ipc.notify.port-deleted";
/// Action identifier for send-once notifications
pub const ACTION_SEND_ONCE: &str = "ipc.notify.send-once";

/// Schema version of all notification payloads
pub const NOTIFY_SCHEMA_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

/// Payload of a kernel notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyBody {
    /// The name the notification concerns, in the requesting task's table
    pub name: Option<Name>,
}

fn notification(destination: PortId, action: &str, name: Option<Name>) -> MessageEnvelope {
    let payload =
        MessagePayload::new(&NotifyBody { name }).expect("notification body always encodes");
    MessageEnvelope::new(
        destination,
        action.to_string(),
        NOTIFY_SCHEMA_VERSION,
        payload,
    )
}

/// Builds the message delivered when a requested name becomes dead
pub fn dead_name_notification(destination: PortId, dead_name: Name) -> MessageEnvelope {
    notification(destination, ACTION_DEAD_NAME, Some(dead_name))
}

/// Builds the message delivered when a registered name was deleted outright
pub fn port_deleted_notification(destination: PortId, deleted_name: Name) -> MessageEnvelope {
    notification(destination, ACTION_PORT_DELETED, Some(deleted_name))
}

/// Builds the message delivered when a send-once right dies unused
pub fn send_once_notification(destination: PortId) -> MessageEnvelope {
    notification(destination, ACTION_SEND_ONCE, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_name_notification_carries_name() {
        let dest = PortId::new();
        let msg = dead_name_notification(dest, Name::from_index(12));
        assert_eq!(msg.action, ACTION_DEAD_NAME);
        assert_eq!(msg.destination, dest);
        let body: NotifyBody = msg.payload.decode().unwrap();
        assert_eq!(body.name, Some(Name::from_index(12)));
    }

    #[test]
    fn test_send_once_notification_has_no_name() {
        let msg = send_once_notification(PortId::new());
        assert_eq!(msg.action, ACTION_SEND_ONCE);
        let body: NotifyBody = msg.payload.decode().unwrap();
        assert_eq!(body.name, None);
    }

    #[test]
    fn test_notification_schema_version() {
        let msg = port_deleted_notification(PortId::new(), Name::from_index(0));
        assert!(msg.schema_version.is_compatible_with(&NOTIFY_SCHEMA_VERSION));
    }
}
