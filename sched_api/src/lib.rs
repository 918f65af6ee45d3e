//! # Scheduler API
//!
//! This crate defines the seam between the IPC core and whatever
//! schedules threads: virtual-time-friendly `Instant`/`Duration`
//! types and a cancellable-wait capability ([`WaitHub`]).
//!
//! ## Philosophy
//!
//! **Mechanism, not policy.** The IPC core needs exactly three things
//! from a scheduler: declare intent to wait, block until woken or a
//! deadline, and wake waiters. It must not care whether "blocking"
//! means parking an OS thread or advancing a simulated clock. Code
//! written against [`WaitHub`] runs unmodified under `cargo test` with
//! a deterministic hub and in production with [`host::ThreadWaitHub`].

pub mod host;
pub mod time;
pub mod wait;

pub use host::ThreadWaitHub;
pub use time::{Duration, Instant};
pub use wait::{WaitEvent, WaitHub, WaitResult, WaitTicket};
