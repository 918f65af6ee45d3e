//! Right operation errors
//!
//! Every failure is synchronous and leaves the table exactly as it
//! was; retry is a caller-level policy. These kinds cross the
//! table/queue/pool boundary and are stable.

use core_types::Name;
use thiserror::Error;

/// Failure of a capability-table operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RightError {
    /// Name out of bounds or denoting a free slot
    #[error("invalid name {0}")]
    InvalidName(Name),

    /// The entry's right kind is incompatible with the request
    #[error("no right of the requested kind under {0}")]
    RightNotPresent(Name),

    /// The operation does not apply to the entry's right kind
    #[error("operation does not apply to the right under {0}")]
    InvalidRight(Name),

    /// The right has become a dead name and the caller forbade that
    #[error("{0} is a dead name and the operation forbids dead names")]
    DeadNotAllowed(Name),

    /// A delta would drive a user-reference count out of range
    #[error("user-reference delta out of range for {0}")]
    InvalidValue(Name),

    /// The rename target is already occupied
    #[error("target name {0} is already in use")]
    NameInUse(Name),

    /// Growth is impossible: the terminal size class was reached
    #[error("table is at its terminal size class")]
    NoSpace,
}
