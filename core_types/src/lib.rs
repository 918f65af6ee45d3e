//! # Core Types
//!
//! This crate defines the fundamental types used throughout Mica.
//!
//! ## Philosophy
//!
//! Core types are designed with these principles:
//! - **Explicit over implicit**: Rights are typed and cannot be confused.
//! - **No ambient authority**: Naming a port requires a slot in a table.
//! - **Testable**: Everything here is plain data that works under `cargo test`.
//!
//! ## Key Types
//!
//! - [`Name`]: A per-table capability name (slot index)
//! - [`RightClass`]: The kind of right a name denotes
//! - [`Disposition`]: How a copyin consumes an entry
//! - [`SizeClass`]: One step of the table growth sequence
//! - [`RightsEvent`]: An audit event emitted by right operations

pub mod events;
pub mod ids;
pub mod name;
pub mod rights;
pub mod table_size;

pub use events::RightsEvent;
pub use ids::{PortId, TableId, TaskId};
pub use name::{Disposition, Name};
pub use rights::{KobjectType, RightClass, UREFS_MAX};
pub use table_size::{build_size_classes, is_terminal, SizeClass, SizeClassConfig, PAGE_SIZE};
