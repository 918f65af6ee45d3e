//! Transferable right values
//!
//! A right in transit - captured out of one capability table and not
//! yet installed in another - is an owned value, not a counter. Moving
//! a right is moving the value; releasing it is dropping the value.
//! The port's send / send-once totals stay correct because every
//! constructor and every drop adjusts them in exactly one place.

use crate::port::PortRef;
use core_types::{PortId, RightClass};
use ipc::MessageEnvelope;
use std::fmt;

/// An owned send right in transit
///
/// Dropping the value releases the right quietly.
pub struct SendRight {
    port: Option<PortRef>,
}

impl SendRight {
    pub(crate) fn make(port: PortRef) -> Self {
        Self { port: Some(port) }
    }

    /// Adopts a right whose count an entry already holds
    ///
    /// Used when a table entry is emptied: the entry's accounting
    /// travels with the value, so no counter changes.
    pub fn from_transfer(port: PortRef) -> Self {
        Self { port: Some(port) }
    }

    /// Surrenders the right for installation into an entry
    ///
    /// The receiving entry takes over the accounting; no counter
    /// changes.
    pub fn into_transfer(mut self) -> PortRef {
        self.port.take().expect("send right already consumed")
    }

    /// The port this right refers to
    pub fn port(&self) -> &PortRef {
        self.port.as_ref().expect("send right already consumed")
    }
}

impl Drop for SendRight {
    fn drop(&mut self) {
        if let Some(port) = self.port.take() {
            port.release_sright();
        }
    }
}

impl fmt::Debug for SendRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "SendRight({})", port.id()),
            None => f.write_str("SendRight(consumed)"),
        }
    }
}

/// An owned send-once right in transit
///
/// Fires exactly one message, then the right is gone. Dropping the
/// value releases it quietly; [`SendOnceRight::destroy`] releases it
/// loudly, delivering a send-once notification to its port so the
/// receiver learns the promised message will never come.
pub struct SendOnceRight {
    port: Option<PortRef>,
}

impl SendOnceRight {
    pub(crate) fn make(port: PortRef) -> Self {
        Self { port: Some(port) }
    }

    /// Adopts a right whose count an entry already holds
    pub fn from_transfer(port: PortRef) -> Self {
        Self { port: Some(port) }
    }

    /// Surrenders the right for installation into an entry
    pub fn into_transfer(mut self) -> PortRef {
        self.port.take().expect("send-once right already consumed")
    }

    /// The port this right refers to
    pub fn port(&self) -> &PortRef {
        self.port.as_ref().expect("send-once right already consumed")
    }

    /// The destination port's ID, for building the one message
    pub fn port_id(&self) -> PortId {
        self.port().id()
    }

    /// Consumes the right delivering `message`, ignoring the queue
    /// bound. Returns false if the destination is already dead.
    pub fn fire(mut self, message: MessageEnvelope) -> bool {
        let port = self.port.take().expect("send-once right already consumed");
        let delivered = port.queue().force_send(message);
        port.release_soright();
        delivered
    }

    /// Consumes the right unused, delivering a send-once notification
    pub fn destroy(mut self) -> bool {
        let port = self.port.take().expect("send-once right already consumed");
        let delivered = port
            .queue()
            .force_send(ipc::send_once_notification(port.id()));
        port.release_soright();
        delivered
    }
}

impl Drop for SendOnceRight {
    fn drop(&mut self) {
        if let Some(port) = self.port.take() {
            port.release_soright();
        }
    }
}

impl fmt::Debug for SendOnceRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "SendOnceRight({})", port.id()),
            None => f.write_str("SendOnceRight(consumed)"),
        }
    }
}

/// The unique receive right for a port
///
/// Dropping the value destroys the port: the queue is invalidated,
/// registered dead-name requests fire, and outstanding send rights
/// become dead names.
pub struct ReceiveRight {
    port: Option<PortRef>,
}

impl ReceiveRight {
    /// Adopts the receive right out of an entry or at port creation
    pub fn from_transfer(port: PortRef) -> Self {
        Self { port: Some(port) }
    }

    /// Surrenders the right for installation into an entry
    pub fn into_transfer(mut self) -> PortRef {
        self.port.take().expect("receive right already consumed")
    }

    /// The port this right refers to
    pub fn port(&self) -> &PortRef {
        self.port.as_ref().expect("receive right already consumed")
    }

    /// Destroys the port explicitly
    pub fn destroy(mut self) {
        if let Some(port) = self.port.take() {
            port.destroy_receive();
        }
    }
}

impl Drop for ReceiveRight {
    fn drop(&mut self) {
        if let Some(port) = self.port.take() {
            port.destroy_receive();
        }
    }
}

impl fmt::Debug for ReceiveRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "ReceiveRight({})", port.id()),
            None => f.write_str("ReceiveRight(consumed)"),
        }
    }
}

/// A right captured by copyin, on its way through a message
#[derive(Debug)]
pub enum CapturedRight {
    /// A send right
    Send(SendRight),
    /// A send-once right
    SendOnce(SendOnceRight),
    /// The receive right
    Receive(ReceiveRight),
    /// A right whose port died before or during transit
    Dead,
}

impl CapturedRight {
    /// The class this right installs as, if copied out now
    pub fn class(&self) -> RightClass {
        match self {
            Self::Send(_) => RightClass::Send,
            Self::SendOnce(_) => RightClass::SendOnce,
            Self::Receive(_) => RightClass::Receive,
            Self::Dead => RightClass::DeadName,
        }
    }
}
