//! # IPC Core Contract Tests
//!
//! These tests define the stable cross-crate behavior of the
//! capability IPC core, so it cannot drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: the guaranteed properties are
//!   written as code, one module per property family.
//! - **Testability first**: blocking behavior runs against real
//!   threads; everything else runs against the deterministic hub.
//! - **Mechanism not policy**: the tests pin what the core promises,
//!   not how callers should use it.
//!
//! ## Structure
//!
//! - `rights` - reference ownership, de-duplication, dead-name
//!   transitions, copyin/undo round trips
//! - `queue` - at-most-once FIFO delivery and timeout behavior
//! - `blocking` - no permanent block once a queue or pool is
//!   invalidated, against real threads

pub mod blocking;
pub mod queue;
pub mod rights;

/// Common helpers for building test fixtures
pub mod test_helpers {
    use core_types::PortId;
    use ipc::{MessageEnvelope, MessagePayload, SchemaVersion};
    use ports::{Port, PortConfig, ReceiveRight};
    use sched_api::WaitHub;
    use serde::Serialize;
    use std::sync::Arc;

    /// Creates a port with default configuration on the given hub
    pub fn create_port(hub: &Arc<dyn WaitHub>) -> ReceiveRight {
        Port::create(Arc::clone(hub), PortConfig::default())
    }

    /// Creates a test envelope with a serialized payload
    pub fn envelope<T: Serialize>(destination: PortId, action: &str, payload: &T) -> MessageEnvelope {
        MessageEnvelope::new(
            destination,
            action.to_string(),
            SchemaVersion::new(1, 0),
            MessagePayload::new(payload).expect("test payload encodes"),
        )
    }
}
