//! # Capability Table
//!
//! Per-task capability namespaces: name-indexed entries holding typed,
//! reference-counted rights over ports, and the transactional
//! operations that mutate them.
//!
//! ## Philosophy
//!
//! - **No half-mutations**: every operation either completes or leaves
//!   the table exactly as it found it. That property, not speed, is
//!   what the rest of the kernel builds on.
//! - **Explicit ownership**: rights in transit are owned values from
//!   the `ports` crate; installing one moves it into a slot, capturing
//!   one moves it back out. There is no raw counter arithmetic to get
//!   wrong.
//! - **Auditable**: every transition lands in a queryable audit log,
//!   in the order it happened.

pub mod audit;
pub mod entry;
pub mod error;
pub mod rights;
pub mod table;

pub use audit::{AuditRecord, RightsAuditLog};
pub use entry::RightKind;
pub use error::RightError;
pub use table::{CapabilityTable, TableConfig};
