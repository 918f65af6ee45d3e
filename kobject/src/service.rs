//! Kernel-resident service objects

use crate::thread_pool::ThreadPool;
use core_types::KobjectType;
use ipc::MessageEnvelope;
use ports::{BindError, PortRef};
use sched_api::WaitHub;
use std::sync::Arc;

/// A service routine for one kernel object
///
/// Injected, not owned: which routine a type tag maps to is the
/// dispatch table's business, outside this core.
pub trait MessageHandler: Send + Sync {
    /// Services one message, optionally producing a reply
    fn handle(&self, message: MessageEnvelope) -> Option<MessageEnvelope>;
}

/// A kernel object bound to a port: a worker pool plus the routine
/// its messages run
pub struct ServiceObject {
    pool: ThreadPool,
    handler: Box<dyn MessageHandler>,
}

impl ServiceObject {
    /// Creates a service object with an empty worker pool
    pub fn new(hub: Arc<dyn WaitHub>, handler: Box<dyn MessageHandler>) -> Arc<Self> {
        Arc::new(Self {
            pool: ThreadPool::new(hub),
            handler,
        })
    }

    /// The object's worker pool
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Binds this object to `port` under `kind`, one time only
    pub fn bind_to(self: &Arc<Self>, port: &PortRef, kind: KobjectType) -> Result<(), BindError> {
        port.bind_kobject(kind, Arc::clone(self) as Arc<dyn std::any::Any + Send + Sync>)
    }

    /// Tears the object down: releases the port binding and the pool
    ///
    /// Messages already queued on the port stay queued; dispatching
    /// them fails with `ObjectGone` instead of reaching freed state.
    pub fn teardown(&self, port: &PortRef) {
        port.unbind_kobject();
        self.pool.shutdown();
    }

    /// Runs the service routine for one message
    pub fn handle(&self, message: MessageEnvelope) -> Option<MessageEnvelope> {
        self.handler.handle(message)
    }
}
