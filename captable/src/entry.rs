//! Capability table entries

use core_types::RightClass;
use ports::{PortRef, RequestId};

/// Which right an entry holds, with user-reference counts for the
/// counted classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightKind {
    /// A send right with its user references
    Send { urefs: u32 },
    /// The receive right; always exactly one reference
    Receive,
    /// A send-once right; always exactly one reference
    SendOnce,
    /// A dead name carrying the references its right had when the
    /// port died
    DeadName { urefs: u32 },
}

/// One occupied slot in a capability table
///
/// A free slot is the absence of an entry. Live kinds hold a strong
/// port reference; dead names hold none - the port reference was
/// released when the entry was reconciled.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) object: Option<PortRef>,
    pub(crate) kind: RightKind,
    pub(crate) request: Option<RequestId>,
}

impl Entry {
    pub(crate) fn class(&self) -> RightClass {
        match self.kind {
            RightKind::Send { .. } => RightClass::Send,
            RightKind::Receive => RightClass::Receive,
            RightKind::SendOnce => RightClass::SendOnce,
            RightKind::DeadName { .. } => RightClass::DeadName,
        }
    }

    pub(crate) fn urefs(&self) -> u32 {
        match self.kind {
            RightKind::Send { urefs } | RightKind::DeadName { urefs } => urefs,
            RightKind::Receive | RightKind::SendOnce => 1,
        }
    }
}
