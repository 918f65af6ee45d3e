//! Kobject message dispatch
//!
//! The synchronous path from a port's queue into the bound object's
//! service routine: resolve the binding, take a worker from the
//! object's pool, run the handler, put the worker back. Both failure
//! modes of the binding - never bound, or torn down since - surface
//! as `ObjectGone` rather than dispatching into freed state.

use crate::service::ServiceObject;
use crate::strategy::{copyin_strategy, OolCopyStrategy};
use ipc::MessageEnvelope;
use ports::{PortRef, ReceiveError};
use sched_api::Instant;
use thiserror::Error;

/// Dispatch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The port has no live kernel object behind it
    #[error("no live kernel object is bound to this port")]
    ObjectGone,
    /// Receiving from the port's queue failed
    #[error(transparent)]
    Receive(#[from] ReceiveError),
}

/// Returns the copy strategy messages to this port's object need
pub fn strategy_for(port: &PortRef) -> Option<OolCopyStrategy> {
    port.kobject_binding()
        .map(|binding| copyin_strategy(binding.kind))
}

/// Runs one message through the object bound to `port`
///
/// `block` chooses the worker-acquisition behavior: a blocking
/// dispatch waits for a worker and is woken with `ObjectGone` if the
/// object is destroyed mid-wait; a non-blocking dispatch fails
/// immediately when no worker is idle.
pub fn dispatch(
    port: &PortRef,
    message: MessageEnvelope,
    block: bool,
) -> Result<Option<MessageEnvelope>, DispatchError> {
    let binding = port.kobject_binding().ok_or(DispatchError::ObjectGone)?;
    let service = binding
        .object
        .downcast::<ServiceObject>()
        .map_err(|_| DispatchError::ObjectGone)?;
    let worker = service.pool().get(block).ok_or(DispatchError::ObjectGone)?;
    let reply = service.handle(message);
    service.pool().put(worker);
    Ok(reply)
}

/// Receives the next message from `port` and dispatches it
///
/// The kernel-side service loop: blocks on the queue up to `deadline`,
/// then runs the message on a pooled worker.
pub fn service_next(
    port: &PortRef,
    max_size: usize,
    deadline: Option<Instant>,
) -> Result<Option<MessageEnvelope>, DispatchError> {
    let message = port.queue().receive(max_size, deadline)?;
    dispatch(port, message, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MessageHandler;
    use core_types::{KobjectType, PortId};
    use ipc::{MessagePayload, SchemaVersion};
    use ports::{Port, PortConfig, SendMode};
    use sched_api::WaitHub;
    use sim_sched::SimWaitHub;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl MessageHandler for Recorder {
        fn handle(&self, message: MessageEnvelope) -> Option<MessageEnvelope> {
            self.seen.lock().unwrap().push(message.action.clone());
            Some(MessageEnvelope::new(
                message.destination,
                format!("{}.reply", message.action),
                message.schema_version,
                MessagePayload::empty(),
            ))
        }
    }

    fn hub() -> Arc<dyn WaitHub> {
        Arc::new(SimWaitHub::new())
    }

    fn msg(action: &str) -> MessageEnvelope {
        MessageEnvelope::new(
            PortId::new(),
            action.to_string(),
            SchemaVersion::new(1, 0),
            MessagePayload::empty(),
        )
    }

    fn service() -> (Arc<ServiceObject>, ports::ReceiveRight) {
        let wait_hub = hub();
        let service = ServiceObject::new(
            Arc::clone(&wait_hub),
            Box::new(Recorder {
                seen: Mutex::new(Vec::new()),
            }),
        );
        let receive = Port::create(wait_hub, PortConfig::default());
        (service, receive)
    }

    #[test]
    fn test_dispatch_unbound_port_is_object_gone() {
        let (_service, receive) = service();
        assert_eq!(
            dispatch(receive.port(), msg("ping"), false).unwrap_err(),
            DispatchError::ObjectGone
        );
    }

    #[test]
    fn test_dispatch_runs_handler_and_repools_worker() {
        let (service, receive) = service();
        service.bind_to(receive.port(), KobjectType::Task).unwrap();
        service.pool().spawn_worker().unwrap();

        let reply = dispatch(receive.port(), msg("ping"), false)
            .unwrap()
            .expect("recorder always replies");
        assert_eq!(reply.action, "ping.reply");
        assert_eq!(service.pool().idle_count(), 1);
    }

    #[test]
    fn test_dispatch_without_worker_nonblocking() {
        let (service, receive) = service();
        service.bind_to(receive.port(), KobjectType::Task).unwrap();
        assert_eq!(
            dispatch(receive.port(), msg("ping"), false).unwrap_err(),
            DispatchError::ObjectGone
        );
    }

    #[test]
    fn test_teardown_makes_dispatch_object_gone() {
        let (service, receive) = service();
        service.bind_to(receive.port(), KobjectType::Task).unwrap();
        service.pool().spawn_worker().unwrap();
        service.teardown(receive.port());
        assert_eq!(
            dispatch(receive.port(), msg("ping"), false).unwrap_err(),
            DispatchError::ObjectGone
        );
    }

    #[test]
    fn test_strategy_for_bound_port() {
        let (service, receive) = service();
        assert_eq!(strategy_for(receive.port()), None);
        service.bind_to(receive.port(), KobjectType::Pager).unwrap();
        assert_eq!(
            strategy_for(receive.port()),
            Some(OolCopyStrategy::PageListSteal)
        );
    }

    #[test]
    fn test_service_next_pulls_from_queue() {
        let (service, receive) = service();
        service.bind_to(receive.port(), KobjectType::Host).unwrap();
        service.pool().spawn_worker().unwrap();

        receive
            .port()
            .queue()
            .send(msg("info"), SendMode::NonBlocking)
            .unwrap();
        let reply = service_next(receive.port(), usize::MAX, None).unwrap();
        assert_eq!(reply.unwrap().action, "info.reply");
    }

    #[test]
    fn test_service_next_times_out_on_empty_queue() {
        let wait_hub: Arc<SimWaitHub> = Arc::new(SimWaitHub::new());
        let service = ServiceObject::new(
            Arc::clone(&wait_hub) as Arc<dyn WaitHub>,
            Box::new(Recorder {
                seen: Mutex::new(Vec::new()),
            }),
        );
        let receive = Port::create(
            Arc::clone(&wait_hub) as Arc<dyn WaitHub>,
            PortConfig::default(),
        );
        service.bind_to(receive.port(), KobjectType::Host).unwrap();

        let deadline = wait_hub.now() + sched_api::Duration::from_millis(10);
        assert_eq!(
            service_next(receive.port(), usize::MAX, Some(deadline)).unwrap_err(),
            DispatchError::Receive(ReceiveError::TimedOut)
        );
    }
}
