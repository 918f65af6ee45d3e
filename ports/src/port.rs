//! The shared IPC endpoint
//!
//! A port is the object a right refers to: one message queue, at most
//! one receiver, any number of senders. It is shared by every entry
//! and in-transit right naming it and lives as long as the longest
//! holder. The port lock guards object state (death, receiver
//! backref, kobject slot, counters, registered requests); the queue
//! has its own lock.

use crate::dnrequest::{DnRequest, DnRequestTable, RequestId};
use crate::mqueue::{ChangeReason, MQueue};
use crate::right::{ReceiveRight, SendOnceRight, SendRight};
use core_types::{build_size_classes, KobjectType, Name, PortId, SizeClass, SizeClassConfig, TableId};
use sched_api::WaitHub;
use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Strong shared handle to a port
pub type PortRef = Arc<Port>;

/// Number of size classes for dead-name-request tables
const REQUEST_CLASSES: usize = 16;

/// Association between a port and a kernel-resident service object
///
/// The object is stored type-erased behind the tag, the way a kernel
/// keeps a single pointer-plus-type field on the port; the dispatch
/// layer downcasts by tag.
#[derive(Clone)]
pub struct KobjectBinding {
    /// Type tag routing messages and selecting the copy strategy
    pub kind: KobjectType,
    /// The bound object
    pub object: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for KobjectBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KobjectBinding({})", self.kind)
    }
}

/// Binding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindError {
    /// The port already has a kernel object
    #[error("port is already bound to a kernel object")]
    AlreadyBound,
    /// The port died before the bind
    #[error("port is dead")]
    PortDead,
}

/// Dead-name-request registration failure; the right comes back
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The port died; the caller decides between firing and refusing
    #[error("port is dead")]
    PortDead(SendOnceRight),
    /// Every request size class is exhausted
    #[error("request table is full")]
    TableFull(SendOnceRight),
}

/// Construction parameters for a port
#[derive(Clone)]
pub struct PortConfig {
    /// Bound on pending messages for ordinary sends
    pub queue_limit: usize,
    /// Growth sequence for the dead-name-request table
    pub request_classes: Arc<Vec<SizeClass>>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            queue_limit: 16,
            request_classes: Arc::new(build_size_classes(&SizeClassConfig {
                classes: REQUEST_CLASSES,
                min_capacity: 2,
                elem_size: mem::size_of::<DnRequest>(),
            })),
        }
    }
}

struct PortState {
    dead: bool,
    receiver: Option<TableId>,
    kobject: Option<KobjectBinding>,
    requests: DnRequestTable,
    srights: u32,
    sorights: u32,
}

/// The addressable, shared IPC endpoint
pub struct Port {
    id: PortId,
    queue: MQueue,
    state: Mutex<PortState>,
}

impl Port {
    /// Creates a port and returns its receive right
    pub fn create(hub: Arc<dyn WaitHub>, config: PortConfig) -> ReceiveRight {
        let port = Arc::new(Port {
            id: PortId::new(),
            queue: MQueue::new(hub, config.queue_limit),
            state: Mutex::new(PortState {
                dead: false,
                receiver: None,
                kobject: None,
                requests: DnRequestTable::new(config.request_classes),
                srights: 0,
                sorights: 0,
            }),
        });
        ReceiveRight::from_transfer(port)
    }

    /// Returns the port's identity
    pub fn id(&self) -> PortId {
        self.id
    }

    /// The port's message queue
    pub fn queue(&self) -> &MQueue {
        &self.queue
    }

    /// True once the receive right has been destroyed
    pub fn is_dead(&self) -> bool {
        self.state.lock().expect("port poisoned").dead
    }

    /// Outstanding send rights across all tables and transit
    pub fn srights(&self) -> u32 {
        self.state.lock().expect("port poisoned").srights
    }

    /// Outstanding send-once rights across all tables and transit
    pub fn sorights(&self) -> u32 {
        self.state.lock().expect("port poisoned").sorights
    }

    /// The table currently holding the receive right, if installed
    pub fn receiver(&self) -> Option<TableId> {
        self.state.lock().expect("port poisoned").receiver
    }

    /// Records where the receive right lives; used by the capability
    /// table on copyout and capture
    pub fn set_receiver(&self, receiver: Option<TableId>) {
        self.state.lock().expect("port poisoned").receiver = receiver;
    }

    /// Creates a new send right to this port
    pub fn make_send(self: &Arc<Self>) -> SendRight {
        self.state.lock().expect("port poisoned").srights += 1;
        SendRight::make(Arc::clone(self))
    }

    /// Creates a new send-once right to this port
    pub fn make_send_once(self: &Arc<Self>) -> SendOnceRight {
        self.state.lock().expect("port poisoned").sorights += 1;
        SendOnceRight::make(Arc::clone(self))
    }

    /// Releases one send right whose accounting an entry held directly
    ///
    /// Transfer values release themselves on drop; this is for the
    /// capability table, which tracks its entries' rights in place.
    pub fn release_sright(&self) {
        let mut state = self.state.lock().expect("port poisoned");
        state.srights = state.srights.saturating_sub(1);
    }

    /// Releases one send-once right whose accounting an entry held
    /// directly
    pub fn release_soright(&self) {
        let mut state = self.state.lock().expect("port poisoned");
        state.sorights = state.sorights.saturating_sub(1);
    }

    /// Binds a kernel object to this port, one time only
    pub fn bind_kobject(
        &self,
        kind: KobjectType,
        object: Arc<dyn Any + Send + Sync>,
    ) -> Result<(), BindError> {
        let mut state = self.state.lock().expect("port poisoned");
        if state.dead {
            return Err(BindError::PortDead);
        }
        if state.kobject.is_some() {
            return Err(BindError::AlreadyBound);
        }
        state.kobject = Some(KobjectBinding { kind, object });
        Ok(())
    }

    /// Releases the kernel object association, part of object teardown
    pub fn unbind_kobject(&self) -> Option<KobjectBinding> {
        self.state.lock().expect("port poisoned").kobject.take()
    }

    /// Returns the current binding; `None` if unbound or dead
    pub fn kobject_binding(&self) -> Option<KobjectBinding> {
        let state = self.state.lock().expect("port poisoned");
        if state.dead {
            return None;
        }
        state.kobject.clone()
    }

    /// Registers a dead-name request against this port
    ///
    /// `name` is the registering task's name for the port and travels
    /// inside the eventual notification.
    pub fn register_request(
        &self,
        name: Name,
        notify: SendOnceRight,
    ) -> Result<RequestId, RegisterError> {
        let mut state = self.state.lock().expect("port poisoned");
        if state.dead {
            return Err(RegisterError::PortDead(notify));
        }
        state
            .requests
            .register(name, notify)
            .map_err(RegisterError::TableFull)
    }

    /// Cancels a pending request, returning the right for disposal
    ///
    /// Safe when nothing is pending under `id` (returns `None`).
    pub fn cancel_request(&self, id: RequestId) -> Option<SendOnceRight> {
        self.state.lock().expect("port poisoned").requests.cancel(id)
    }

    /// Updates the name a pending request will report
    pub fn rename_request(&self, id: RequestId, new_name: Name) -> bool {
        self.state
            .lock()
            .expect("port poisoned")
            .requests
            .rename(id, new_name)
    }

    /// Number of registered dead-name requests
    pub fn request_count(&self) -> usize {
        self.state.lock().expect("port poisoned").requests.len()
    }

    /// Destroys the port: marks it dead, drops the binding, fires
    /// every registered dead-name request exactly once, and
    /// invalidates the queue so no receiver or sender stays blocked
    ///
    /// Idempotent; only the first call has any effect.
    pub fn destroy_receive(&self) {
        let requests = {
            let mut state = self.state.lock().expect("port poisoned");
            if state.dead {
                return;
            }
            state.dead = true;
            state.receiver = None;
            state.kobject = None;
            state.requests.take_all()
        };
        self.queue.changed(ChangeReason::PortDied);
        for request in requests {
            let destination = request.notify.port_id();
            request
                .notify
                .fire(ipc::dead_name_notification(destination, request.name));
        }
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqueue::ReceiveError;
    use ipc::{NotifyBody, ACTION_DEAD_NAME};
    use sim_sched::SimWaitHub;

    fn hub() -> Arc<dyn WaitHub> {
        Arc::new(SimWaitHub::new())
    }

    #[test]
    fn test_create_is_alive_and_unreferenced() {
        let receive = Port::create(hub(), PortConfig::default());
        let port = receive.port();
        assert!(!port.is_dead());
        assert_eq!(port.srights(), 0);
        assert_eq!(port.sorights(), 0);
    }

    #[test]
    fn test_make_and_release_send_rights() {
        let receive = Port::create(hub(), PortConfig::default());
        let port = Arc::clone(receive.port());
        let send_a = port.make_send();
        let send_b = port.make_send();
        assert_eq!(port.srights(), 2);
        drop(send_a);
        assert_eq!(port.srights(), 1);
        drop(send_b);
        assert_eq!(port.srights(), 0);
    }

    #[test]
    fn test_bind_is_one_time() {
        let receive = Port::create(hub(), PortConfig::default());
        let port = receive.port();
        let object: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        port.bind_kobject(KobjectType::Task, Arc::clone(&object))
            .unwrap();
        assert_eq!(
            port.bind_kobject(KobjectType::Task, object),
            Err(BindError::AlreadyBound)
        );
        assert!(port.kobject_binding().is_some());
        port.unbind_kobject();
        assert!(port.kobject_binding().is_none());
    }

    #[test]
    fn test_destroy_invalidates_queue_and_binding() {
        let receive = Port::create(hub(), PortConfig::default());
        let port = Arc::clone(receive.port());
        port.bind_kobject(KobjectType::Device, Arc::new(0u8)).unwrap();
        receive.destroy();
        assert!(port.is_dead());
        assert!(port.kobject_binding().is_none());
        assert!(matches!(
            port.queue().receive(usize::MAX, None),
            Err(ReceiveError::QueueDestroyed(ChangeReason::PortDied))
        ));
    }

    #[test]
    fn test_destroy_fires_registered_requests() {
        let wait_hub = hub();
        let watched = Port::create(Arc::clone(&wait_hub), PortConfig::default());
        let notify_receive = Port::create(wait_hub, PortConfig::default());
        let notify_port = Arc::clone(notify_receive.port());

        let notify = notify_port.make_send_once();
        let name = Name::from_index(5);
        watched
            .port()
            .register_request(name, notify)
            .expect("registration on a live port");
        assert_eq!(watched.port().request_count(), 1);

        watched.destroy();

        let message = notify_port.queue().receive(usize::MAX, None).unwrap();
        assert_eq!(message.action, ACTION_DEAD_NAME);
        let body: NotifyBody = message.payload.decode().unwrap();
        assert_eq!(body.name, Some(name));
        // The send-once right was consumed by firing.
        assert_eq!(notify_port.sorights(), 0);
    }

    #[test]
    fn test_register_on_dead_port_returns_right() {
        let wait_hub = hub();
        let watched = Port::create(Arc::clone(&wait_hub), PortConfig::default());
        let port = Arc::clone(watched.port());
        watched.destroy();

        let notify_receive = Port::create(wait_hub, PortConfig::default());
        let notify = notify_receive.port().make_send_once();
        match port.register_request(Name::from_index(1), notify) {
            Err(RegisterError::PortDead(right)) => drop(right),
            other => panic!("expected PortDead, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_returns_right_and_is_idempotent() {
        let wait_hub = hub();
        let watched = Port::create(Arc::clone(&wait_hub), PortConfig::default());
        let notify_receive = Port::create(wait_hub, PortConfig::default());
        let notify = notify_receive.port().make_send_once();

        let id = watched
            .port()
            .register_request(Name::from_index(2), notify)
            .unwrap();
        let returned = watched.port().cancel_request(id);
        assert!(returned.is_some());
        assert!(watched.port().cancel_request(id).is_none());

        // Cancelled, not fired: destroying now delivers nothing.
        let notify_port = Arc::clone(notify_receive.port());
        drop(returned);
        watched.destroy();
        assert!(notify_port.queue().is_empty());
    }

    #[test]
    fn test_rename_request_updates_notification() {
        let wait_hub = hub();
        let watched = Port::create(Arc::clone(&wait_hub), PortConfig::default());
        let notify_receive = Port::create(wait_hub, PortConfig::default());
        let notify_port = Arc::clone(notify_receive.port());

        let id = watched
            .port()
            .register_request(Name::from_index(3), notify_port.make_send_once())
            .unwrap();
        assert!(watched.port().rename_request(id, Name::from_index(30)));

        watched.destroy();
        let message = notify_port.queue().receive(usize::MAX, None).unwrap();
        let body: NotifyBody = message.payload.decode().unwrap();
        assert_eq!(body.name, Some(Name::from_index(30)));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let receive = Port::create(hub(), PortConfig::default());
        let port = Arc::clone(receive.port());
        port.destroy_receive();
        port.destroy_receive();
        assert!(port.is_dead());
    }
}
