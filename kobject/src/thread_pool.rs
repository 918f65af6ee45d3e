//! Per-object worker pool
//!
//! Each kernel-resident service object keeps a pool of idle worker
//! activations. A dispatching thread takes one, services exactly one
//! message, and puts it back. Workers live in an arena indexed by
//! stable handles; pool membership is a FIFO of handles, so insert
//! and remove are O(1) and nothing links through the workers
//! themselves.
//!
//! The pool's lock also guards the owning object's liveness flag.
//! That is deliberate: `put` must decide atomically between re-pooling
//! a worker and retiring it because the object died while the worker
//! was out.

use sched_api::{WaitEvent, WaitHub};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Stable handle to one worker activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u32);

/// Lifecycle of a worker activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// In the pool, available for dispatch
    Idle,
    /// Handed out, servicing one message
    Assigned,
}

struct Worker {
    state: WorkerState,
}

struct WorkerArena {
    workers: Vec<Option<Worker>>,
    free: Vec<u32>,
}

impl WorkerArena {
    fn insert(&mut self, worker: Worker) -> WorkerId {
        match self.free.pop() {
            Some(index) => {
                self.workers[index as usize] = Some(worker);
                WorkerId(index)
            }
            None => {
                self.workers.push(Some(worker));
                WorkerId((self.workers.len() - 1) as u32)
            }
        }
    }

    fn remove(&mut self, id: WorkerId) -> bool {
        match self.workers.get_mut(id.0 as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.free.push(id.0);
                true
            }
            _ => false,
        }
    }

    fn get_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        self.workers.get_mut(id.0 as usize).and_then(|slot| slot.as_mut())
    }

    fn get(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    fn live_count(&self) -> usize {
        self.workers.iter().filter(|slot| slot.is_some()).count()
    }
}

struct PoolState {
    arena: WorkerArena,
    idle: VecDeque<WorkerId>,
    waiting: u32,
    live: bool,
}

/// Pool of idle worker activations for one kernel object
pub struct ThreadPool {
    state: Mutex<PoolState>,
    hub: Arc<dyn WaitHub>,
    event: WaitEvent,
}

impl ThreadPool {
    /// Creates an empty, live pool
    pub fn new(hub: Arc<dyn WaitHub>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                arena: WorkerArena {
                    workers: Vec::new(),
                    free: Vec::new(),
                },
                idle: VecDeque::new(),
                waiting: 0,
                live: true,
            }),
            hub,
            event: WaitEvent::fresh(),
        }
    }

    /// Creates a worker and pools it idle
    ///
    /// Returns `None` once the owning object has been torn down.
    pub fn spawn_worker(&self) -> Option<WorkerId> {
        let mut state = self.state.lock().expect("pool poisoned");
        if !state.live {
            return None;
        }
        let id = state.arena.insert(Worker {
            state: WorkerState::Idle,
        });
        state.idle.push_back(id);
        if state.waiting > 0 {
            drop(state);
            self.hub.wake_one(self.event);
        }
        Some(id)
    }

    /// Returns a worker to the pool after it serviced a message
    ///
    /// Consults object liveness under the same lock: a worker whose
    /// object died while it was out is retired, not re-pooled. Wakes
    /// a blocked consumer if one is waiting.
    pub fn put(&self, id: WorkerId) {
        let mut state = self.state.lock().expect("pool poisoned");
        if !state.live {
            state.arena.remove(id);
            return;
        }
        match state.arena.get_mut(id) {
            Some(worker) => worker.state = WorkerState::Idle,
            None => return,
        }
        state.idle.push_back(id);
        let wake = state.waiting > 0;
        drop(state);
        if wake {
            self.hub.wake_one(self.event);
        }
    }

    /// Takes an idle worker for one message
    ///
    /// Non-blocking form returns `None` immediately when the pool is
    /// empty. Blocking form suspends until `put` supplies a worker or
    /// the owning object is destroyed, in which case it returns `None`
    /// rather than hanging forever.
    pub fn get(&self, block: bool) -> Option<WorkerId> {
        loop {
            let mut state = self.state.lock().expect("pool poisoned");
            if !state.live {
                return None;
            }
            if let Some(id) = state.idle.pop_front() {
                if let Some(worker) = state.arena.get_mut(id) {
                    worker.state = WorkerState::Assigned;
                }
                return Some(id);
            }
            if !block {
                return None;
            }
            state.waiting += 1;
            let ticket = self.hub.assert_wait(self.event);
            drop(state);
            let _ = self.hub.block(ticket, None);
            let mut state = self.state.lock().expect("pool poisoned");
            state.waiting = state.waiting.saturating_sub(1);
        }
    }

    /// Unlinks a specific worker, wherever it is
    ///
    /// Works on idle and assigned workers alike; used when a worker
    /// is destroyed or moves to another pool (remove here, insert
    /// there).
    pub fn remove(&self, id: WorkerId) -> bool {
        let mut state = self.state.lock().expect("pool poisoned");
        state.idle.retain(|&idle_id| idle_id != id);
        state.arena.remove(id)
    }

    /// Tears the pool down with its owning object
    ///
    /// Idle workers are retired immediately; assigned workers retire
    /// on their next `put`. Every blocked `get` wakes and returns
    /// `None`.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock().expect("pool poisoned");
            if !state.live {
                return;
            }
            state.live = false;
            let idle: Vec<WorkerId> = state.idle.drain(..).collect();
            for id in idle {
                state.arena.remove(id);
            }
        }
        self.hub.wake_all(self.event);
    }

    /// True until the owning object is torn down
    pub fn is_live(&self) -> bool {
        self.state.lock().expect("pool poisoned").live
    }

    /// Number of idle workers
    pub fn idle_count(&self) -> usize {
        self.state.lock().expect("pool poisoned").idle.len()
    }

    /// Number of workers not yet retired, idle or assigned
    pub fn worker_count(&self) -> usize {
        self.state.lock().expect("pool poisoned").arena.live_count()
    }

    /// Observes a worker's state; `None` once retired
    pub fn worker_state(&self, id: WorkerId) -> Option<WorkerState> {
        self.state
            .lock()
            .expect("pool poisoned")
            .arena
            .get(id)
            .map(|worker| worker.state)
    }
}
