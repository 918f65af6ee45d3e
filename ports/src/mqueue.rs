//! Blocking message queue
//!
//! One FIFO of pending messages per receive right. Senders append,
//! exactly one receiver dequeues each message, and both sides can
//! suspend through the injected [`WaitHub`]: receivers until a message
//! or invalidation arrives, senders until the queue has room. When the
//! owning port dies the queue is invalidated, pending messages are
//! dropped, and every blocked thread is released immediately - nothing
//! may sleep forever on a queue that can no longer deliver.

use ipc::MessageEnvelope;
use sched_api::{Instant, WaitEvent, WaitHub, WaitResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Why a queue was invalidated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// The owning port's receive right was destroyed
    PortDied,
    /// The owning receive right moved into an aggregate
    PortMoved,
}

/// Blocking behavior for a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Fail with `WouldBlock` instead of waiting for room
    NonBlocking,
    /// Wait for room, up to the deadline if one is given
    Block { deadline: Option<Instant> },
}

/// Send failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The queue is over its bound and the caller declined to wait
    #[error("queue is full and the send does not block")]
    WouldBlock,
    /// The deadline elapsed before room appeared
    #[error("send timed out")]
    TimedOut,
    /// The queue was invalidated
    #[error("queue destroyed: {0:?}")]
    QueueDestroyed(ChangeReason),
}

/// Receive failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// The deadline elapsed with no message
    #[error("receive timed out")]
    TimedOut,
    /// The queue was invalidated while waiting or before
    #[error("queue destroyed: {0:?}")]
    QueueDestroyed(ChangeReason),
    /// The head message exceeds the caller's size bound; it stays queued
    #[error("message too large: {needed} bytes needed")]
    TooLarge { needed: usize },
}

struct QueueState {
    messages: VecDeque<MessageEnvelope>,
    limit: usize,
    invalid: Option<ChangeReason>,
}

/// FIFO of pending messages with blocking send and receive
pub struct MQueue {
    state: Mutex<QueueState>,
    hub: Arc<dyn WaitHub>,
    recv_event: WaitEvent,
    send_event: WaitEvent,
}

impl MQueue {
    /// Creates an active queue bounded at `limit` pending messages
    pub fn new(hub: Arc<dyn WaitHub>, limit: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                limit,
                invalid: None,
            }),
            hub,
            recv_event: WaitEvent::fresh(),
            send_event: WaitEvent::fresh(),
        }
    }

    /// Returns the number of pending messages
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue poisoned").messages.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured bound
    pub fn limit(&self) -> usize {
        self.state.lock().expect("queue poisoned").limit
    }

    /// Returns the invalidation reason, if the queue has been changed
    pub fn invalidated(&self) -> Option<ChangeReason> {
        self.state.lock().expect("queue poisoned").invalid
    }

    /// Appends a message, waking one blocked receiver
    ///
    /// Bound enforcement applies only here; kernel notifications use
    /// [`MQueue::force_send`] and ignore it.
    pub fn send(&self, message: MessageEnvelope, mode: SendMode) -> Result<(), SendError> {
        loop {
            let mut state = self.state.lock().expect("queue poisoned");
            if let Some(reason) = state.invalid {
                return Err(SendError::QueueDestroyed(reason));
            }
            if state.messages.len() < state.limit {
                state.messages.push_back(message);
                drop(state);
                self.hub.wake_one(self.recv_event);
                return Ok(());
            }
            let deadline = match mode {
                SendMode::NonBlocking => return Err(SendError::WouldBlock),
                SendMode::Block { deadline } => deadline,
            };
            let ticket = self.hub.assert_wait(self.send_event);
            drop(state);
            match self.hub.block(ticket, deadline) {
                WaitResult::Woken => continue,
                WaitResult::TimedOut => return Err(SendError::TimedOut),
            }
        }
    }

    /// Appends a kernel notification, ignoring the bound
    ///
    /// Returns false (dropping the message) if the queue is invalid.
    pub fn force_send(&self, message: MessageEnvelope) -> bool {
        let mut state = self.state.lock().expect("queue poisoned");
        if state.invalid.is_some() {
            return false;
        }
        state.messages.push_back(message);
        drop(state);
        self.hub.wake_one(self.recv_event);
        true
    }

    /// Removes and returns the oldest message, blocking until one
    /// arrives, the queue is invalidated, or the deadline passes
    ///
    /// `max_size` bounds the payload the caller can accept; an
    /// oversized head message fails with [`ReceiveError::TooLarge`]
    /// and stays queued so the caller can retry with a larger bound.
    pub fn receive(
        &self,
        max_size: usize,
        deadline: Option<Instant>,
    ) -> Result<MessageEnvelope, ReceiveError> {
        loop {
            let mut state = self.state.lock().expect("queue poisoned");
            if let Some(reason) = state.invalid {
                return Err(ReceiveError::QueueDestroyed(reason));
            }
            if let Some(front) = state.messages.front() {
                let needed = front.body_len();
                if needed > max_size {
                    return Err(ReceiveError::TooLarge { needed });
                }
                let message = state.messages.pop_front().expect("front exists");
                drop(state);
                self.hub.wake_one(self.send_event);
                return Ok(message);
            }
            let ticket = self.hub.assert_wait(self.recv_event);
            drop(state);
            match self.hub.block(ticket, deadline) {
                WaitResult::Woken => continue,
                WaitResult::TimedOut => return Err(ReceiveError::TimedOut),
            }
        }
    }

    /// Moves every pending message to `dest`, preserving order
    ///
    /// Used when a receive right becomes part of an aggregate and its
    /// already-enqueued traffic must follow it.
    pub fn move_messages(&self, dest: &MQueue) {
        let drained: Vec<MessageEnvelope> = {
            let mut state = self.state.lock().expect("queue poisoned");
            state.messages.drain(..).collect()
        };
        if drained.is_empty() {
            return;
        }
        {
            let mut dest_state = dest.state.lock().expect("queue poisoned");
            if dest_state.invalid.is_some() {
                return;
            }
            dest_state.messages.extend(drained);
        }
        dest.hub.wake_all(dest.recv_event);
        self.hub.wake_all(self.send_event);
    }

    /// Invalidates the queue, dropping pending messages and waking
    /// every blocked sender and receiver with `reason`
    pub fn changed(&self, reason: ChangeReason) {
        {
            let mut state = self.state.lock().expect("queue poisoned");
            if state.invalid.is_none() {
                state.invalid = Some(reason);
            }
            state.messages.clear();
        }
        self.hub.wake_all(self.recv_event);
        self.hub.wake_all(self.send_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PortId;
    use ipc::{MessagePayload, SchemaVersion};
    use sim_sched::SimWaitHub;

    fn msg(action: &str) -> MessageEnvelope {
        MessageEnvelope::new(
            PortId::new(),
            action.to_string(),
            SchemaVersion::new(1, 0),
            MessagePayload::new(&action).unwrap(),
        )
    }

    fn queue(limit: usize) -> MQueue {
        MQueue::new(Arc::new(SimWaitHub::new()), limit)
    }

    #[test]
    fn test_fifo_ordering() {
        let q = queue(4);
        q.send(msg("a"), SendMode::NonBlocking).unwrap();
        q.send(msg("b"), SendMode::NonBlocking).unwrap();
        q.send(msg("c"), SendMode::NonBlocking).unwrap();

        assert_eq!(q.receive(usize::MAX, None).unwrap().action, "a");
        assert_eq!(q.receive(usize::MAX, None).unwrap().action, "b");
        assert_eq!(q.receive(usize::MAX, None).unwrap().action, "c");
    }

    #[test]
    fn test_nonblocking_send_over_bound() {
        let q = queue(2);
        q.send(msg("a"), SendMode::NonBlocking).unwrap();
        q.send(msg("b"), SendMode::NonBlocking).unwrap();
        assert_eq!(
            q.send(msg("c"), SendMode::NonBlocking),
            Err(SendError::WouldBlock)
        );
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_receive_timeout_has_no_side_effects() {
        let hub = Arc::new(SimWaitHub::new());
        let q = MQueue::new(Arc::clone(&hub) as Arc<dyn WaitHub>, 4);
        let deadline = hub.now() + sched_api::Duration::from_millis(10);
        assert_eq!(
            q.receive(usize::MAX, Some(deadline)).unwrap_err(),
            ReceiveError::TimedOut
        );
        // The clock ran to the deadline and the queue is untouched.
        assert_eq!(hub.now(), deadline);
        assert!(q.is_empty());
        assert!(q.invalidated().is_none());
    }

    #[test]
    fn test_changed_fails_blocked_and_future_receives() {
        let q = queue(4);
        q.send(msg("pending"), SendMode::NonBlocking).unwrap();
        q.changed(ChangeReason::PortDied);
        assert_eq!(
            q.receive(usize::MAX, None).unwrap_err(),
            ReceiveError::QueueDestroyed(ChangeReason::PortDied)
        );
        // Pending messages were dropped with the queue.
        assert_eq!(q.len(), 0);
        assert_eq!(
            q.send(msg("late"), SendMode::NonBlocking),
            Err(SendError::QueueDestroyed(ChangeReason::PortDied))
        );
    }

    #[test]
    fn test_too_large_leaves_message_queued() {
        let q = queue(4);
        q.send(msg("payload"), SendMode::NonBlocking).unwrap();
        let err = q.receive(0, None).unwrap_err();
        match err {
            ReceiveError::TooLarge { needed } => assert!(needed > 0),
            other => panic!("expected TooLarge, got {:?}", other),
        }
        assert_eq!(q.len(), 1);
        assert_eq!(q.receive(usize::MAX, None).unwrap().action, "payload");
    }

    #[test]
    fn test_force_send_ignores_bound_but_not_invalidation() {
        let q = queue(1);
        q.send(msg("a"), SendMode::NonBlocking).unwrap();
        assert!(q.force_send(msg("notify")));
        assert_eq!(q.len(), 2);

        q.changed(ChangeReason::PortDied);
        assert!(!q.force_send(msg("late")));
    }

    #[test]
    fn test_move_messages_preserves_order() {
        let src = queue(4);
        let dst = queue(8);
        src.send(msg("1"), SendMode::NonBlocking).unwrap();
        src.send(msg("2"), SendMode::NonBlocking).unwrap();
        dst.send(msg("0"), SendMode::NonBlocking).unwrap();

        src.move_messages(&dst);
        assert!(src.is_empty());
        assert_eq!(dst.receive(usize::MAX, None).unwrap().action, "0");
        assert_eq!(dst.receive(usize::MAX, None).unwrap().action, "1");
        assert_eq!(dst.receive(usize::MAX, None).unwrap().action, "2");
    }
}
