//! Cancellable-wait capability
//!
//! A waiter declares intent with [`WaitHub::assert_wait`] while it
//! still holds the lock guarding the condition it is about to sleep
//! on, drops the lock, then calls [`WaitHub::block`]. Any wake posted
//! between the two is captured by the ticket's epoch, so the window
//! between unlock and sleep cannot lose a wakeup.
//!
//! Blocking is advisory in one direction only: a hub may wake a waiter
//! spuriously (in particular, `wake_one` may wake more than one), and
//! callers must re-check their condition in a loop. A hub must never
//! leave a waiter blocked after a wake has been posted to its event.

use crate::time::Instant;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_EVENT: AtomicU64 = AtomicU64::new(1);

/// A process-unique token naming one waitable condition
///
/// Each queue or pool allocates its own events at construction; two
/// objects never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitEvent(u64);

impl WaitEvent {
    /// Allocates a fresh, never-before-used event
    pub fn fresh() -> Self {
        Self(NEXT_EVENT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw token value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event:{}", self.0)
    }
}

/// Evidence of a declared wait: the event plus the epoch observed at
/// assert time
#[derive(Debug, Clone, Copy)]
pub struct WaitTicket {
    event: WaitEvent,
    epoch: u64,
}

impl WaitTicket {
    /// Creates a ticket; only hub implementations need this
    pub fn new(event: WaitEvent, epoch: u64) -> Self {
        Self { event, epoch }
    }

    /// The event this ticket waits on
    pub fn event(&self) -> WaitEvent {
        self.event
    }

    /// The epoch observed when the wait was asserted
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Outcome of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// A wake was posted to the event (possibly spuriously)
    Woken,
    /// The deadline elapsed first
    TimedOut,
}

/// Scheduler-provided wait primitives
///
/// Implementations: [`crate::host::ThreadWaitHub`] parks OS threads;
/// the `sim_sched` crate provides a deterministic test double.
pub trait WaitHub: Send + Sync {
    /// Current time on this hub's clock
    fn now(&self) -> Instant;

    /// Declares intent to wait on `event`
    ///
    /// Must be called before releasing the lock that guards the
    /// awaited condition.
    fn assert_wait(&self, event: WaitEvent) -> WaitTicket;

    /// Blocks until the asserted event is woken or `deadline` passes
    ///
    /// A wake posted after `assert_wait` but before `block` returns
    /// `Woken` immediately.
    fn block(&self, ticket: WaitTicket, deadline: Option<Instant>) -> WaitResult;

    /// Wakes at least one waiter asserted on `event`
    fn wake_one(&self, event: WaitEvent);

    /// Wakes every waiter asserted on `event`
    fn wake_all(&self, event: WaitEvent);
}
