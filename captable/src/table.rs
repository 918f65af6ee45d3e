//! The capability table
//!
//! One table per task: a vector of slots indexed by name, a free list
//! of recycled indices, and a size-class cursor driving growth. The
//! table lock serializes every operation on the namespace; port state
//! has its own lock and is always taken after the table's.

use crate::audit::RightsAuditLog;
use crate::entry::{Entry, RightKind};
use crate::error::RightError;
use core_types::{
    build_size_classes, is_terminal, Name, RightClass, RightsEvent, SizeClass, SizeClassConfig,
    TableId, TaskId,
};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

/// Number of size classes for capability entry tables
const ENTRY_CLASSES: usize = 24;

/// Construction parameters for a capability table
#[derive(Clone)]
pub struct TableConfig {
    /// Growth sequence for the entry vector
    pub entry_classes: Arc<Vec<SizeClass>>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            entry_classes: Arc::new(build_size_classes(&SizeClassConfig {
                classes: ENTRY_CLASSES,
                min_capacity: 4,
                elem_size: mem::size_of::<Option<Entry>>(),
            })),
        }
    }
}

pub(crate) struct TableState {
    pub(crate) slots: Vec<Option<Entry>>,
    pub(crate) free: Vec<u32>,
    pub(crate) class_index: usize,
    pub(crate) audit: RightsAuditLog,
}

impl TableState {
    pub(crate) fn entry(&self, name: Name) -> Result<&Entry, RightError> {
        self.slots
            .get(name.index() as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(RightError::InvalidName(name))
    }

    pub(crate) fn entry_mut(&mut self, name: Name) -> Result<&mut Entry, RightError> {
        self.slots
            .get_mut(name.index() as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(RightError::InvalidName(name))
    }

    /// Empties a slot, recycling its index
    pub(crate) fn remove(&mut self, name: Name) -> Entry {
        let entry = self.slots[name.index() as usize]
            .take()
            .expect("removing a free slot");
        self.free.push(name.index());
        entry
    }

    /// Finds a slot for a fresh entry, growing if every slot is taken
    pub(crate) fn alloc_slot(&mut self, classes: &[SizeClass]) -> Result<Name, RightError> {
        if let Some(index) = self.free.pop() {
            return Ok(Name::from_index(index));
        }
        while self.slots.len() >= classes[self.class_index].capacity {
            if is_terminal(classes, self.class_index) {
                return Err(RightError::NoSpace);
            }
            self.class_index += 1;
        }
        self.slots
            .reserve_exact(classes[self.class_index].capacity - self.slots.len());
        self.slots.push(None);
        Ok(Name::from_index((self.slots.len() - 1) as u32))
    }

    /// Claims a specific name, growing through size classes until the
    /// table covers it
    pub(crate) fn alloc_named(&mut self, classes: &[SizeClass], name: Name) -> Result<(), RightError> {
        let index = name.index() as usize;
        while index >= classes[self.class_index].capacity {
            if is_terminal(classes, self.class_index) {
                return Err(RightError::NoSpace);
            }
            self.class_index += 1;
        }
        if index < self.slots.len() {
            if self.slots[index].is_some() {
                return Err(RightError::NameInUse(name));
            }
            self.free.retain(|&free_index| free_index as usize != index);
        } else {
            self.slots
                .reserve_exact(classes[self.class_index].capacity.min(index + 1) - self.slots.len());
            for hole in self.slots.len()..index {
                self.free.push(hole as u32);
            }
            self.slots.resize_with(index + 1, || None);
        }
        Ok(())
    }

    /// Reconciles an entry with its port's death, if any
    ///
    /// Returns true if the entry was reclassified to a dead name by
    /// this call. The entry's request slot is cleared - the port fired
    /// or dropped it at death - and the entry's reference is released.
    pub(crate) fn reconcile(&mut self, name: Name) -> bool {
        let Ok(entry) = self.entry_mut(name) else {
            return false;
        };
        let Some(port) = entry.object.clone() else {
            return false;
        };
        if !port.is_dead() {
            return false;
        }
        let urefs = match entry.kind {
            RightKind::Send { urefs } => {
                port.release_sright();
                urefs
            }
            RightKind::SendOnce => {
                port.release_soright();
                1
            }
            RightKind::Receive | RightKind::DeadName { .. } => {
                // A receive entry's port cannot die out from under it,
                // and dead-name entries hold no object.
                debug_assert!(false, "unreconcilable entry kind for a dead port");
                return false;
            }
        };
        entry.kind = RightKind::DeadName { urefs };
        entry.object = None;
        entry.request = None;
        self.audit.record(RightsEvent::ReclassifiedDead { name, urefs });
        true
    }
}

/// A task's capability namespace
///
/// All operations are local, synchronous, and serialized by the table
/// lock; a failed operation leaves the table in its prior valid state.
pub struct CapabilityTable {
    id: TableId,
    owner: TaskId,
    classes: Arc<Vec<SizeClass>>,
    pub(crate) state: Mutex<TableState>,
}

impl CapabilityTable {
    /// Creates an empty table for `owner`
    pub fn new(owner: TaskId, config: TableConfig) -> Self {
        Self {
            id: TableId::new(),
            owner,
            classes: config.entry_classes,
            state: Mutex::new(TableState {
                slots: Vec::new(),
                free: Vec::new(),
                class_index: 0,
                audit: RightsAuditLog::new(),
            }),
        }
    }

    /// Returns the table's identity
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the owning task
    pub fn owner(&self) -> TaskId {
        self.owner
    }

    /// Number of occupied slots
    pub fn live_entries(&self) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Current capacity in slots
    pub fn capacity(&self) -> usize {
        let state = self.lock();
        self.classes[state.class_index].capacity
    }

    /// Snapshot of the audit trail
    pub fn audit(&self) -> RightsAuditLog {
        self.lock().audit.clone()
    }

    /// Read-only snapshot of an entry: its class and user references
    ///
    /// Reconciles the entry first, so a name whose port died reports
    /// as a dead name.
    pub fn info(&self, name: Name) -> Result<(RightClass, u32), RightError> {
        let mut state = self.lock();
        state.reconcile(name);
        let entry = state.entry(name)?;
        Ok((entry.class(), entry.urefs()))
    }

    /// Detects a port-death transition for `name`
    ///
    /// Returns true if this call reconciled the entry to a dead name.
    pub fn check(&self, name: Name) -> Result<bool, RightError> {
        let mut state = self.lock();
        state.entry(name)?;
        Ok(state.reconcile(name))
    }

    /// Allocates a fresh dead-name entry with one user reference
    pub fn allocate_dead_name(&self) -> Result<Name, RightError> {
        let mut state = self.lock();
        let name = state.alloc_slot(&self.classes)?;
        state.slots[name.index() as usize] = Some(Entry {
            object: None,
            kind: RightKind::DeadName { urefs: 1 },
            request: None,
        });
        state.audit.record(RightsEvent::Allocated {
            name,
            class: RightClass::DeadName,
        });
        Ok(name)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().expect("capability table poisoned")
    }

    pub(crate) fn entry_classes(&self) -> &[SizeClass] {
        &self.classes
    }
}
