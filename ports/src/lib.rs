//! # Ports
//!
//! The shared IPC endpoint and everything that lives on it: the
//! blocking message queue, the dead-name-request table, the kernel
//! object binding slot, and the transferable right values that move
//! authority between capability tables.
//!
//! ## Locking
//!
//! A port carries two locks and they guard different things. The
//! queue lock covers pending messages and queue validity; the port
//! lock covers the object itself (death, receiver backref, kobject
//! slot, right counters, registered requests). Capability tables have
//! their own locks for naming. Acquisition order is always
//! table -> port -> queue; nothing here ever calls back up into a
//! table.

pub mod dnrequest;
pub mod mqueue;
pub mod port;
pub mod right;

pub use dnrequest::RequestId;
pub use mqueue::{ChangeReason, MQueue, ReceiveError, SendError, SendMode};
pub use port::{KobjectBinding, BindError, Port, PortConfig, PortRef, RegisterError};
pub use right::{CapturedRight, ReceiveRight, SendOnceRight, SendRight};
