//! Audit events for right operations
//!
//! Right operations are security-relevant; every mutation of a table
//! emits one of these so tests (and debugging sessions) can verify the
//! exact sequence of transitions. The log itself lives with the table;
//! only the event vocabulary is shared here.

use crate::{Disposition, Name, RightClass};
use serde::{Deserialize, Serialize};

/// One capability-table transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RightsEvent {
    /// A fresh slot was allocated and populated
    Allocated { name: Name, class: RightClass },
    /// A right was installed via copyout (fresh slot or de-duplicated)
    Copyout {
        name: Name,
        class: RightClass,
        deduplicated: bool,
    },
    /// A right was captured out of an entry
    Copyin { name: Name, disposition: Disposition },
    /// A captured right was returned to its entry
    CopyinUndone { name: Name },
    /// A user-reference delta was applied
    Delta {
        name: Name,
        class: RightClass,
        delta: i32,
    },
    /// The slot was emptied and its references released
    Destroyed { name: Name },
    /// The entry moved to a different slot
    Renamed { old: Name, new: Name },
    /// A live right was reconciled to a dead name
    ReclassifiedDead { name: Name, urefs: u32 },
    /// A dead-name request was registered
    DeadNameRequested { name: Name, replaced_previous: bool },
    /// A pending dead-name request was cancelled
    DeadNameCancelled { name: Name },
}

impl RightsEvent {
    /// Returns the primary name this event concerns
    pub fn name(&self) -> Name {
        match self {
            Self::Allocated { name, .. }
            | Self::Copyout { name, .. }
            | Self::Copyin { name, .. }
            | Self::CopyinUndone { name }
            | Self::Delta { name, .. }
            | Self::Destroyed { name }
            | Self::ReclassifiedDead { name, .. }
            | Self::DeadNameRequested { name, .. }
            | Self::DeadNameCancelled { name } => *name,
            Self::Renamed { old, .. } => *old,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_primary_name() {
        let event = RightsEvent::Delta {
            name: Name::from_index(3),
            class: RightClass::Send,
            delta: -1,
        };
        assert_eq!(event.name(), Name::from_index(3));
    }

    #[test]
    fn test_renamed_reports_old_name() {
        let event = RightsEvent::Renamed {
            old: Name::from_index(1),
            new: Name::from_index(9),
        };
        assert_eq!(event.name(), Name::from_index(1));
    }

    #[test]
    fn test_events_serialize() {
        let event = RightsEvent::Copyout {
            name: Name::from_index(2),
            class: RightClass::Send,
            deduplicated: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: RightsEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
