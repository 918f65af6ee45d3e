//! Right classes and kernel object type tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on user references held by a single entry
///
/// `delta` fails with a value error rather than exceeding this.
pub const UREFS_MAX: u32 = 65_535;

/// The class of right a name denotes
///
/// `delta` and `info` speak in classes; the entry itself additionally
/// tracks user-reference counts for the counted classes (send and
/// dead-name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RightClass {
    /// May enqueue messages on the port
    Send,
    /// May dequeue messages; at most one holder system-wide
    Receive,
    /// May enqueue exactly one message, then the right is consumed
    SendOnce,
    /// What a send right degrades into once the port is destroyed
    DeadName,
}

impl RightClass {
    /// Returns the stable wire tag for this class
    pub const fn as_u32(&self) -> u32 {
        match self {
            Self::Send => 0,
            Self::Receive => 1,
            Self::SendOnce => 2,
            Self::DeadName => 4,
        }
    }

    /// True if entries of this class carry a user-reference count
    pub const fn is_counted(&self) -> bool {
        matches!(self, Self::Send | Self::DeadName)
    }
}

impl fmt::Display for RightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::SendOnce => "send-once",
            Self::DeadName => "dead-name",
        };
        f.write_str(s)
    }
}

/// Type tag for a kernel object bound to a port
///
/// The tag routes inbound messages to the right service family and
/// selects the out-of-line memory copy strategy. It is assigned once
/// at bind time and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KobjectType {
    /// Task control object
    Task,
    /// Host information object
    Host,
    /// Privileged host control object
    HostPriv,
    /// Address space control object
    VmMap,
    /// Memory manager backing a region
    Pager,
    /// Device service object
    Device,
}

impl fmt::Display for KobjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Task => "task",
            Self::Host => "host",
            Self::HostPriv => "host-priv",
            Self::VmMap => "vm-map",
            Self::Pager => "pager",
            Self::Device => "device",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_class_tags_are_stable() {
        assert_eq!(RightClass::Send.as_u32(), 0);
        assert_eq!(RightClass::Receive.as_u32(), 1);
        assert_eq!(RightClass::SendOnce.as_u32(), 2);
        assert_eq!(RightClass::DeadName.as_u32(), 4);
    }

    #[test]
    fn test_counted_classes() {
        assert!(RightClass::Send.is_counted());
        assert!(RightClass::DeadName.is_counted());
        assert!(!RightClass::Receive.is_counted());
        assert!(!RightClass::SendOnce.is_counted());
    }

    #[test]
    fn test_kobject_type_display() {
        assert_eq!(KobjectType::Pager.to_string(), "pager");
        assert_eq!(KobjectType::HostPriv.to_string(), "host-priv");
    }
}
