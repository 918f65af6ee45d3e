//! # Simulated Scheduler
//!
//! A deterministic [`WaitHub`] for testing the IPC core without real
//! threads.
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.** Blocking code
//! is the hardest part of an IPC core to get right and the easiest to
//! leave untested. This hub makes every suspension point run to
//! completion deterministically: a block with a deadline advances the
//! virtual clock to the deadline and times out; a block with no
//! deadline returns `Woken` immediately and records that it did, so a
//! test can assert how often a code path would have slept.
//!
//! This is not a mock of the trait - it is a complete implementation
//! whose scheduling policy happens to be "never actually wait".

use sched_api::{Duration, Instant, WaitEvent, WaitHub, WaitResult, WaitTicket};
use std::collections::HashMap;
use std::sync::Mutex;

/// Deterministic wait hub with a manually advanced clock
pub struct SimWaitHub {
    state: Mutex<SimState>,
}

struct SimState {
    now: Instant,
    epochs: HashMap<u64, u64>,
    forced_wakes: u64,
    timeouts: u64,
}

impl SimWaitHub {
    /// Creates a hub with the clock at zero
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                now: Instant::ZERO,
                epochs: HashMap::new(),
                forced_wakes: 0,
                timeouts: 0,
            }),
        }
    }

    /// Advances the virtual clock
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().expect("sim hub poisoned");
        state.now = state.now + duration;
    }

    /// Number of deadline-less blocks that were forced awake
    ///
    /// A nonzero count means the code under test reached a suspension
    /// point that a real scheduler would have slept in.
    pub fn forced_wakes(&self) -> u64 {
        self.state.lock().expect("sim hub poisoned").forced_wakes
    }

    /// Number of blocks that ended in a timeout
    pub fn timeouts(&self) -> u64 {
        self.state.lock().expect("sim hub poisoned").timeouts
    }
}

impl Default for SimWaitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitHub for SimWaitHub {
    fn now(&self) -> Instant {
        self.state.lock().expect("sim hub poisoned").now
    }

    fn assert_wait(&self, event: WaitEvent) -> WaitTicket {
        let mut state = self.state.lock().expect("sim hub poisoned");
        let epoch = *state.epochs.entry(event.raw()).or_insert(0);
        WaitTicket::new(event, epoch)
    }

    fn block(&self, ticket: WaitTicket, deadline: Option<Instant>) -> WaitResult {
        let mut state = self.state.lock().expect("sim hub poisoned");
        let current = state
            .epochs
            .get(&ticket.event().raw())
            .copied()
            .unwrap_or(0);
        if current != ticket.epoch() {
            return WaitResult::Woken;
        }
        match deadline {
            Some(deadline) => {
                if deadline > state.now {
                    state.now = deadline;
                }
                state.timeouts += 1;
                WaitResult::TimedOut
            }
            None => {
                state.forced_wakes += 1;
                WaitResult::Woken
            }
        }
    }

    fn wake_one(&self, event: WaitEvent) {
        let mut state = self.state.lock().expect("sim hub poisoned");
        *state.epochs.entry(event.raw()).or_insert(0) += 1;
    }

    fn wake_all(&self, event: WaitEvent) {
        self.wake_one(event);
    }
}
