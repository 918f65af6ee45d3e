//! OS-thread wait hub
//!
//! Production [`WaitHub`] that parks real threads. Per-event epochs
//! live in one map; a single condvar covers all events, so a wake
//! notifies everyone and each waiter re-checks its own epoch. That
//! trades a little spurious wakeup for a structure with no per-event
//! allocation to leak.

use crate::time::Instant;
use crate::wait::{WaitEvent, WaitHub, WaitResult, WaitTicket};
use std::collections::HashMap;
use std::sync::{Condvar, Mutex};

/// Wait hub backed by `std::sync::{Mutex, Condvar}`
pub struct ThreadWaitHub {
    origin: std::time::Instant,
    epochs: Mutex<HashMap<u64, u64>>,
    cv: Condvar,
}

impl ThreadWaitHub {
    /// Creates a hub whose clock starts now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
            epochs: Mutex::new(HashMap::new()),
            cv: Condvar::new(),
        }
    }

    fn bump(&self, event: WaitEvent) {
        let mut epochs = self.epochs.lock().expect("wait hub poisoned");
        *epochs.entry(event.raw()).or_insert(0) += 1;
        self.cv.notify_all();
    }
}

impl Default for ThreadWaitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitHub for ThreadWaitHub {
    fn now(&self) -> Instant {
        let nanos = self.origin.elapsed().as_nanos();
        Instant::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    fn assert_wait(&self, event: WaitEvent) -> WaitTicket {
        let mut epochs = self.epochs.lock().expect("wait hub poisoned");
        let epoch = *epochs.entry(event.raw()).or_insert(0);
        WaitTicket::new(event, epoch)
    }

    fn block(&self, ticket: WaitTicket, deadline: Option<Instant>) -> WaitResult {
        let mut epochs = self.epochs.lock().expect("wait hub poisoned");
        loop {
            let current = epochs.get(&ticket.event().raw()).copied().unwrap_or(0);
            if current != ticket.epoch() {
                return WaitResult::Woken;
            }
            match deadline {
                None => {
                    epochs = self.cv.wait(epochs).expect("wait hub poisoned");
                }
                Some(deadline) => {
                    let remaining = match self.now().checked_duration_until(deadline) {
                        Some(remaining) => remaining,
                        None => return WaitResult::TimedOut,
                    };
                    let (guard, _timed_out) = self
                        .cv
                        .wait_timeout(epochs, remaining.to_std())
                        .expect("wait hub poisoned");
                    epochs = guard;
                }
            }
        }
    }

    fn wake_one(&self, event: WaitEvent) {
        self.bump(event);
    }

    fn wake_all(&self, event: WaitEvent) {
        self.bump(event);
    }
}
