//! Invalidation-under-blocking contract tests
//!
//! The most failure-prone promise in the core: a thread suspended in
//! `receive` or in a blocking pool `get` must be released promptly
//! when the thing it waits on is invalidated. These run against real
//! threads and the OS-thread wait hub.

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use kobject::ThreadPool;
    use ports::{ChangeReason, ReceiveError};
    use sched_api::{ThreadWaitHub, WaitHub};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn hub() -> Arc<dyn WaitHub> {
        Arc::new(ThreadWaitHub::new())
    }

    #[test]
    fn test_blocked_receiver_released_by_port_death() {
        let hub = hub();
        let receive = create_port(&hub);
        let port = Arc::clone(receive.port());

        let receiver = {
            let port = Arc::clone(&port);
            thread::spawn(move || port.queue().receive(usize::MAX, None))
        };

        thread::sleep(StdDuration::from_millis(20));
        receive.destroy();

        let result = receiver.join().unwrap();
        assert_eq!(
            result.unwrap_err(),
            ReceiveError::QueueDestroyed(ChangeReason::PortDied)
        );
    }

    #[test]
    fn test_blocked_receiver_gets_late_message() {
        let hub = hub();
        let receive = create_port(&hub);
        let port = Arc::clone(receive.port());

        let receiver = {
            let port = Arc::clone(&port);
            thread::spawn(move || port.queue().receive(usize::MAX, None))
        };

        thread::sleep(StdDuration::from_millis(20));
        port.queue()
            .send(
                envelope(port.id(), "late", &0u32),
                ports::SendMode::NonBlocking,
            )
            .unwrap();

        let message = receiver.join().unwrap().expect("woken by the send");
        assert_eq!(message.action, "late");
    }

    #[test]
    fn test_blocked_pool_get_released_by_shutdown() {
        let pool = Arc::new(ThreadPool::new(hub()));

        let getter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.get(true))
        };

        thread::sleep(StdDuration::from_millis(20));
        pool.shutdown();

        assert_eq!(getter.join().unwrap(), None);
    }

    #[test]
    fn test_blocked_pool_get_woken_by_new_worker() {
        let pool = Arc::new(ThreadPool::new(hub()));

        let getter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.get(true))
        };

        thread::sleep(StdDuration::from_millis(20));
        let spawned = pool.spawn_worker().unwrap();

        assert_eq!(getter.join().unwrap(), Some(spawned));
    }

    #[test]
    fn test_blocked_pool_get_woken_by_put() {
        let pool = Arc::new(ThreadPool::new(hub()));
        let worker = pool.spawn_worker().unwrap();
        let held = pool.get(false).unwrap();
        assert_eq!(held, worker);

        let getter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.get(true))
        };

        thread::sleep(StdDuration::from_millis(20));
        pool.put(held);

        assert_eq!(getter.join().unwrap(), Some(worker));
    }
}
