//! Message queue contract tests
//!
//! At-most-once delivery in FIFO order, and timeout behavior against
//! the real clock.

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use ipc::MessageId;
    use ports::{MQueue, ReceiveError, SendMode};
    use sched_api::{Duration, ThreadWaitHub, WaitHub};
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Serialize, Deserialize)]
    struct Tagged {
        sender: usize,
        seq: usize,
    }

    #[test]
    fn test_send_send_receive_receive_then_timeout() {
        // Two messages come back in order; a third receive with a
        // 10ms deadline and no further sends times out.
        let hub: Arc<dyn WaitHub> = Arc::new(ThreadWaitHub::new());
        let receive = create_port(&hub);
        let port = receive.port();

        port.queue()
            .send(envelope(port.id(), "m1", &1u32), SendMode::NonBlocking)
            .unwrap();
        port.queue()
            .send(envelope(port.id(), "m2", &2u32), SendMode::NonBlocking)
            .unwrap();

        assert_eq!(port.queue().receive(usize::MAX, None).unwrap().action, "m1");
        assert_eq!(port.queue().receive(usize::MAX, None).unwrap().action, "m2");

        let deadline = hub.now() + Duration::from_millis(10);
        assert_eq!(
            port.queue().receive(usize::MAX, Some(deadline)).unwrap_err(),
            ReceiveError::TimedOut
        );
    }

    #[test]
    fn test_interleaved_senders_at_most_once_fifo() {
        // Two threads send fifty messages each while the main thread
        // drains the queue: every message arrives exactly once, and
        // each sender's messages arrive in their send order.
        const PER_SENDER: usize = 50;
        let hub: Arc<dyn WaitHub> = Arc::new(ThreadWaitHub::new());
        let queue = Arc::new(MQueue::new(Arc::clone(&hub), 8));

        let senders: Vec<_> = (0..2)
            .map(|sender| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..PER_SENDER {
                        let message = crate::test_helpers::envelope(
                            core_types::PortId::new(),
                            "tagged",
                            &Tagged { sender, seq },
                        );
                        queue
                            .send(message, SendMode::Block { deadline: None })
                            .expect("bounded queue drains");
                    }
                })
            })
            .collect();

        let mut seen_ids: HashSet<MessageId> = HashSet::new();
        let mut next_seq = [0usize; 2];
        for _ in 0..2 * PER_SENDER {
            let deadline = hub.now() + Duration::from_secs(5);
            let message = queue
                .receive(usize::MAX, Some(deadline))
                .expect("senders keep the queue fed");
            assert!(seen_ids.insert(message.id), "message delivered twice");
            let tag: Tagged = message.payload.decode().unwrap();
            assert_eq!(tag.seq, next_seq[tag.sender], "per-sender order broken");
            next_seq[tag.sender] += 1;
        }
        assert_eq!(seen_ids.len(), 2 * PER_SENDER);
        assert!(queue.is_empty());

        for sender in senders {
            sender.join().unwrap();
        }
    }

    #[test]
    fn test_blocking_send_applies_backpressure() {
        let hub: Arc<dyn WaitHub> = Arc::new(ThreadWaitHub::new());
        let queue = Arc::new(MQueue::new(Arc::clone(&hub), 1));
        queue
            .send(
                crate::test_helpers::envelope(core_types::PortId::new(), "first", &0u32),
                SendMode::NonBlocking,
            )
            .unwrap();

        let sender = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.send(
                    crate::test_helpers::envelope(core_types::PortId::new(), "second", &1u32),
                    SendMode::Block { deadline: None },
                )
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(queue.receive(usize::MAX, None).unwrap().action, "first");
        sender.join().unwrap().expect("room appeared");
        assert_eq!(queue.receive(usize::MAX, None).unwrap().action, "second");
    }
}
