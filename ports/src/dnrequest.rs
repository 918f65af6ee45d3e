//! Per-port dead-name-request slots
//!
//! Registered requests live with the port because the port is what
//! dies: at destruction it walks this table and fires every request
//! exactly once. Entries keep the stable slot index so cancellation
//! and re-registration are O(1). The backing vector grows through the
//! same size-class sequence as capability tables.

use crate::right::SendOnceRight;
use core_types::{is_terminal, Name, SizeClass};
use std::sync::Arc;

/// Stable handle to one registered request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(u32);

impl RequestId {
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

pub(crate) struct DnRequest {
    pub(crate) name: Name,
    pub(crate) notify: SendOnceRight,
}

pub(crate) struct DnRequestTable {
    slots: Vec<Option<DnRequest>>,
    free: Vec<u32>,
    class_index: usize,
    classes: Arc<Vec<SizeClass>>,
}

impl DnRequestTable {
    pub(crate) fn new(classes: Arc<Vec<SizeClass>>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            class_index: 0,
            classes,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Registers a request, growing to the next size class if needed.
    /// Gives the right back if every class is exhausted.
    pub(crate) fn register(
        &mut self,
        name: Name,
        notify: SendOnceRight,
    ) -> Result<RequestId, SendOnceRight> {
        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            while self.slots.len() >= self.classes[self.class_index].capacity {
                if is_terminal(&self.classes, self.class_index) {
                    return Err(notify);
                }
                self.class_index += 1;
            }
            self.slots
                .reserve_exact(self.classes[self.class_index].capacity - self.slots.len());
            self.slots.push(None);
            (self.slots.len() - 1) as u32
        };
        self.slots[index as usize] = Some(DnRequest { name, notify });
        Ok(RequestId(index))
    }

    pub(crate) fn cancel(&mut self, id: RequestId) -> Option<SendOnceRight> {
        let slot = self.slots.get_mut(id.index())?;
        let request = slot.take()?;
        self.free.push(id.index() as u32);
        Some(request.notify)
    }

    pub(crate) fn rename(&mut self, id: RequestId, new_name: Name) -> bool {
        match self.slots.get_mut(id.index()).and_then(|slot| slot.as_mut()) {
            Some(request) => {
                request.name = new_name;
                true
            }
            None => false,
        }
    }

    /// Empties the table for firing at port death
    pub(crate) fn take_all(&mut self) -> Vec<DnRequest> {
        let requests = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.take())
            .collect();
        self.free.clear();
        for index in 0..self.slots.len() {
            self.free.push(index as u32);
        }
        requests
    }
}
