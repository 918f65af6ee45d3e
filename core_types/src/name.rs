//! Capability names and copyin dispositions
//!
//! A name is how a task refers to a right: an index into its own
//! capability table. Names carry no authority by themselves and are
//! meaningless outside the table that issued them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A per-table capability name
///
/// Wraps the slot index in the owning table. Two tables can use the
/// same name for unrelated rights; equality is only meaningful within
/// one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(u32);

impl Name {
    /// Creates a name from a slot index
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index
    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name:{}", self.0)
    }
}

/// How a copyin consumes the named entry
///
/// The disposition decides both which right kinds are acceptable and
/// whether the entry keeps its right afterwards. `Move*` dispositions
/// take the right out of the entry; `Copy`/`Make` dispositions leave
/// the entry intact and produce a new right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Move the receive right out of the entry
    MoveReceive,
    /// Move one send user-reference; the right travels with the caller
    MoveSend,
    /// Move the send-once right out of the entry
    MoveSendOnce,
    /// Copy the send right; the entry keeps its references
    CopySend,
    /// Make a new send right from a receive right
    MakeSend,
    /// Make a new send-once right from a receive right
    MakeSendOnce,
}

impl Disposition {
    /// Returns the stable wire tag for this disposition
    ///
    /// These values cross the table/queue boundary inside marshaled
    /// messages and must not change.
    pub const fn as_u32(&self) -> u32 {
        match self {
            Self::MoveReceive => 16,
            Self::MoveSend => 17,
            Self::MoveSendOnce => 18,
            Self::CopySend => 19,
            Self::MakeSend => 20,
            Self::MakeSendOnce => 21,
        }
    }

    /// True if this disposition removes the right from the entry
    pub const fn is_move(&self) -> bool {
        matches!(self, Self::MoveReceive | Self::MoveSend | Self::MoveSendOnce)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MoveReceive => "move-receive",
            Self::MoveSend => "move-send",
            Self::MoveSendOnce => "move-send-once",
            Self::CopySend => "copy-send",
            Self::MakeSend => "make-send",
            Self::MakeSendOnce => "make-send-once",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        let name = Name::from_index(7);
        assert_eq!(name.index(), 7);
    }

    #[test]
    fn test_name_ordering_follows_index() {
        assert!(Name::from_index(1) < Name::from_index(2));
    }

    #[test]
    fn test_disposition_tags_are_stable() {
        assert_eq!(Disposition::MoveReceive.as_u32(), 16);
        assert_eq!(Disposition::MoveSend.as_u32(), 17);
        assert_eq!(Disposition::MoveSendOnce.as_u32(), 18);
        assert_eq!(Disposition::CopySend.as_u32(), 19);
        assert_eq!(Disposition::MakeSend.as_u32(), 20);
        assert_eq!(Disposition::MakeSendOnce.as_u32(), 21);
    }

    #[test]
    fn test_move_dispositions() {
        assert!(Disposition::MoveSend.is_move());
        assert!(Disposition::MoveReceive.is_move());
        assert!(!Disposition::CopySend.is_move());
        assert!(!Disposition::MakeSendOnce.is_move());
    }
}
