//! # Kernel Objects
//!
//! The kernel-resident side of a port: the worker pool that services
//! inbound messages, the one-time binding that routes a port's
//! traffic to its object, and the per-type out-of-line copy strategy.
//!
//! What a given message *means* is not decided here - the service
//! routine is injected as a [`MessageHandler`]. This crate decides
//! who runs it (a pooled worker), whether it can run at all
//! (`ObjectGone` once the binding or object is torn down), and how
//! its out-of-line memory would be copied in.

pub mod dispatch;
pub mod service;
pub mod strategy;
pub mod thread_pool;

pub use dispatch::{dispatch, service_next, strategy_for, DispatchError};
pub use service::{MessageHandler, ServiceObject};
pub use strategy::{copyin_strategy, OolCopyStrategy};
pub use thread_pool::{ThreadPool, WorkerId, WorkerState};
