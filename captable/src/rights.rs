//! Right operations
//!
//! The transactional surface over table entries: capture rights out
//! (`copyin`), install rights in (`copyout`), adjust references
//! (`delta`/`dealloc`), remove (`destroy`), move (`rename`), observe
//! (`info`/`check`), and manage dead-name requests. All of it runs
//! under the table lock; port state is taken after, never before.
//!
//! `copyin_undo` exists for larger transactions: a copyin that
//! succeeds but whose transaction later fails is reversed exactly.
//! Calling it with a right that does not match the prior copyin is a
//! programming error and panics; it has no failure path by design.

use crate::entry::{Entry, RightKind};
use crate::error::RightError;
use crate::table::{CapabilityTable, TableState};
use core_types::{Disposition, Name, RightClass, RightsEvent, UREFS_MAX};
use ports::{CapturedRight, ReceiveRight, RegisterError, SendOnceRight, SendRight};
use std::sync::Arc;

impl CapabilityTable {
    /// Captures a right out of the entry under `name`
    ///
    /// Validates that the entry's kind is compatible with
    /// `disposition`, adjusts the entry's local accounting, and hands
    /// one owned right to the caller. The shared port is never
    /// destroyed by a copyin. If the capture empties the slot, any
    /// registered dead-name request is cancelled and its notify right
    /// returned for caller disposal.
    pub fn copyin(
        &self,
        name: Name,
        disposition: Disposition,
        allow_dead: bool,
    ) -> Result<(CapturedRight, Option<SendOnceRight>), RightError> {
        let mut state = self.lock();
        state.reconcile(name);
        let kind = state.entry(name)?.kind;

        if let RightKind::DeadName { urefs } = kind {
            let consumes_ref = match disposition {
                Disposition::MoveSend | Disposition::MoveSendOnce => true,
                Disposition::CopySend => false,
                Disposition::MoveReceive
                | Disposition::MakeSend
                | Disposition::MakeSendOnce => {
                    return Err(RightError::RightNotPresent(name));
                }
            };
            if !allow_dead {
                return Err(RightError::DeadNotAllowed(name));
            }
            if consumes_ref {
                if urefs == 1 {
                    state.remove(name);
                } else {
                    state.entry_mut(name)?.kind = RightKind::DeadName { urefs: urefs - 1 };
                }
            }
            state.audit.record(RightsEvent::Copyin { name, disposition });
            return Ok((CapturedRight::Dead, None));
        }

        let (captured, prior) = match (disposition, kind) {
            (Disposition::MoveReceive, RightKind::Receive) => {
                let entry = state.remove(name);
                let port = entry.object.expect("live entry holds its port");
                let prior = entry.request.and_then(|id| port.cancel_request(id));
                port.set_receiver(None);
                (
                    CapturedRight::Receive(ReceiveRight::from_transfer(port)),
                    prior,
                )
            }
            (Disposition::MoveSend, RightKind::Send { urefs: 1 }) => {
                let entry = state.remove(name);
                let port = entry.object.expect("live entry holds its port");
                let prior = entry.request.and_then(|id| port.cancel_request(id));
                (CapturedRight::Send(SendRight::from_transfer(port)), prior)
            }
            (Disposition::MoveSend, RightKind::Send { urefs }) => {
                let entry = state.entry_mut(name).expect("looked up above");
                entry.kind = RightKind::Send { urefs: urefs - 1 };
                let port = entry.object.clone().expect("live entry holds its port");
                (CapturedRight::Send(port.make_send()), None)
            }
            (Disposition::MoveSendOnce, RightKind::SendOnce) => {
                let entry = state.remove(name);
                let port = entry.object.expect("live entry holds its port");
                let prior = entry.request.and_then(|id| port.cancel_request(id));
                (
                    CapturedRight::SendOnce(SendOnceRight::from_transfer(port)),
                    prior,
                )
            }
            (Disposition::CopySend, RightKind::Send { .. }) => {
                let port = state
                    .entry(name)
                    .expect("looked up above")
                    .object
                    .clone()
                    .expect("live entry holds its port");
                (CapturedRight::Send(port.make_send()), None)
            }
            (Disposition::MakeSend, RightKind::Receive) => {
                let port = state
                    .entry(name)
                    .expect("looked up above")
                    .object
                    .clone()
                    .expect("live entry holds its port");
                (CapturedRight::Send(port.make_send()), None)
            }
            (Disposition::MakeSendOnce, RightKind::Receive | RightKind::Send { .. }) => {
                let port = state
                    .entry(name)
                    .expect("looked up above")
                    .object
                    .clone()
                    .expect("live entry holds its port");
                (CapturedRight::SendOnce(port.make_send_once()), None)
            }
            _ => return Err(RightError::RightNotPresent(name)),
        };
        state.audit.record(RightsEvent::Copyin { name, disposition });
        Ok((captured, prior))
    }

    /// Exact inverse of a successful [`CapabilityTable::copyin`]
    ///
    /// Restores the entry to a state indistinguishable from before
    /// the copyin (a cancelled dead-name request is not re-registered;
    /// its notify right was already handed to the caller). Cannot
    /// fail: a mismatch between `disposition`, `captured`, and the
    /// table means the calls were not paired and panics.
    pub fn copyin_undo(&self, name: Name, disposition: Disposition, captured: CapturedRight) {
        let mut state = self.lock();
        let occupied = state
            .slots
            .get(name.index() as usize)
            .map(|slot| slot.is_some())
            .unwrap_or(false);

        match (disposition, captured) {
            (Disposition::MoveReceive, CapturedRight::Receive(right)) => {
                state
                    .alloc_named(self.entry_classes(), name)
                    .expect("copyin_undo out of sequence: slot unavailable");
                let port = right.into_transfer();
                port.set_receiver(Some(self.id()));
                state.slots[name.index() as usize] = Some(Entry {
                    object: Some(port),
                    kind: RightKind::Receive,
                    request: None,
                });
            }
            (Disposition::MoveSend, CapturedRight::Send(right)) => {
                if occupied {
                    let matches_port = {
                        let entry = state.entry(name).expect("occupied");
                        matches!(entry.kind, RightKind::Send { .. })
                            && entry
                                .object
                                .as_ref()
                                .map(|port| Arc::ptr_eq(port, right.port()))
                                .unwrap_or(false)
                    };
                    assert!(
                        matches_port,
                        "copyin_undo out of sequence: entry mismatch under {name}"
                    );
                    let entry = state.entry_mut(name).expect("occupied");
                    let RightKind::Send { urefs } = entry.kind else {
                        unreachable!()
                    };
                    entry.kind = RightKind::Send { urefs: urefs + 1 };
                    drop(right);
                } else {
                    state
                        .alloc_named(self.entry_classes(), name)
                        .expect("copyin_undo out of sequence: slot unavailable");
                    state.slots[name.index() as usize] = Some(Entry {
                        object: Some(right.into_transfer()),
                        kind: RightKind::Send { urefs: 1 },
                        request: None,
                    });
                }
            }
            (Disposition::MoveSendOnce, CapturedRight::SendOnce(right)) => {
                state
                    .alloc_named(self.entry_classes(), name)
                    .expect("copyin_undo out of sequence: slot unavailable");
                state.slots[name.index() as usize] = Some(Entry {
                    object: Some(right.into_transfer()),
                    kind: RightKind::SendOnce,
                    request: None,
                });
            }
            (Disposition::CopySend, CapturedRight::Send(right)) => {
                let entry = state
                    .entry(name)
                    .expect("copyin_undo out of sequence: entry vanished");
                assert!(
                    matches!(entry.kind, RightKind::Send { .. }),
                    "copyin_undo out of sequence: entry mismatch under {name}"
                );
                drop(right);
            }
            (Disposition::MakeSend, CapturedRight::Send(right)) => {
                let entry = state
                    .entry(name)
                    .expect("copyin_undo out of sequence: entry vanished");
                assert!(
                    matches!(entry.kind, RightKind::Receive),
                    "copyin_undo out of sequence: entry mismatch under {name}"
                );
                drop(right);
            }
            (Disposition::MakeSendOnce, CapturedRight::SendOnce(right)) => {
                let entry = state
                    .entry(name)
                    .expect("copyin_undo out of sequence: entry vanished");
                assert!(
                    matches!(entry.kind, RightKind::Receive | RightKind::Send { .. }),
                    "copyin_undo out of sequence: entry mismatch under {name}"
                );
                drop(right);
            }
            (Disposition::CopySend, CapturedRight::Dead) => {
                let entry = state
                    .entry(name)
                    .expect("copyin_undo out of sequence: entry vanished");
                assert!(
                    matches!(entry.kind, RightKind::DeadName { .. }),
                    "copyin_undo out of sequence: entry mismatch under {name}"
                );
            }
            (Disposition::MoveSend | Disposition::MoveSendOnce, CapturedRight::Dead) => {
                if occupied {
                    let entry = state.entry_mut(name).expect("occupied");
                    let RightKind::DeadName { urefs } = entry.kind else {
                        panic!("copyin_undo out of sequence: entry mismatch under {name}")
                    };
                    entry.kind = RightKind::DeadName { urefs: urefs + 1 };
                } else {
                    state
                        .alloc_named(self.entry_classes(), name)
                        .expect("copyin_undo out of sequence: slot unavailable");
                    state.slots[name.index() as usize] = Some(Entry {
                        object: None,
                        kind: RightKind::DeadName { urefs: 1 },
                        request: None,
                    });
                }
            }
            _ => panic!("copyin_undo out of sequence: right does not match disposition"),
        }
        state.audit.record(RightsEvent::CopyinUndone { name });
    }

    /// Installs an in-transit right under a name in this table
    ///
    /// A send right aliases an existing send entry for the same port
    /// when one exists (its references merge); everything else takes
    /// a fresh slot. A right whose port died in transit installs as a
    /// dead name with one reference. On error the right is released.
    pub fn copyout(&self, right: CapturedRight) -> Result<Name, RightError> {
        let mut state = self.lock();
        match right {
            CapturedRight::Send(send) => {
                if send.port().is_dead() {
                    drop(send);
                    return self.install_dead(&mut state);
                }
                let alias = state.slots.iter().position(|slot| {
                    slot.as_ref()
                        .map(|entry| {
                            matches!(entry.kind, RightKind::Send { .. })
                                && entry
                                    .object
                                    .as_ref()
                                    .map(|port| Arc::ptr_eq(port, send.port()))
                                    .unwrap_or(false)
                        })
                        .unwrap_or(false)
                });
                if let Some(index) = alias {
                    let name = Name::from_index(index as u32);
                    let entry = state.entry_mut(name).expect("alias exists");
                    let RightKind::Send { urefs } = entry.kind else {
                        unreachable!()
                    };
                    if urefs >= UREFS_MAX {
                        return Err(RightError::InvalidValue(name));
                    }
                    entry.kind = RightKind::Send { urefs: urefs + 1 };
                    drop(send);
                    state.audit.record(RightsEvent::Copyout {
                        name,
                        class: RightClass::Send,
                        deduplicated: true,
                    });
                    return Ok(name);
                }
                let name = state.alloc_slot(self.entry_classes())?;
                state.slots[name.index() as usize] = Some(Entry {
                    object: Some(send.into_transfer()),
                    kind: RightKind::Send { urefs: 1 },
                    request: None,
                });
                state.audit.record(RightsEvent::Copyout {
                    name,
                    class: RightClass::Send,
                    deduplicated: false,
                });
                Ok(name)
            }
            CapturedRight::SendOnce(send_once) => {
                if send_once.port().is_dead() {
                    drop(send_once);
                    return self.install_dead(&mut state);
                }
                let name = state.alloc_slot(self.entry_classes())?;
                state.slots[name.index() as usize] = Some(Entry {
                    object: Some(send_once.into_transfer()),
                    kind: RightKind::SendOnce,
                    request: None,
                });
                state.audit.record(RightsEvent::Copyout {
                    name,
                    class: RightClass::SendOnce,
                    deduplicated: false,
                });
                Ok(name)
            }
            CapturedRight::Receive(receive) => {
                let name = state.alloc_slot(self.entry_classes())?;
                let port = receive.into_transfer();
                port.set_receiver(Some(self.id()));
                state.slots[name.index() as usize] = Some(Entry {
                    object: Some(port),
                    kind: RightKind::Receive,
                    request: None,
                });
                state.audit.record(RightsEvent::Copyout {
                    name,
                    class: RightClass::Receive,
                    deduplicated: false,
                });
                Ok(name)
            }
            CapturedRight::Dead => self.install_dead(&mut state),
        }
    }

    fn install_dead(&self, state: &mut TableState) -> Result<Name, RightError> {
        let name = state.alloc_slot(self.entry_classes())?;
        state.slots[name.index() as usize] = Some(Entry {
            object: None,
            kind: RightKind::DeadName { urefs: 1 },
            request: None,
        });
        state.audit.record(RightsEvent::Copyout {
            name,
            class: RightClass::DeadName,
            deduplicated: false,
        });
        Ok(name)
    }

    /// Adjusts the user-reference count of the right under `name`
    ///
    /// `right` must match the entry's current class. When a send or
    /// dead-name count reaches zero the entry reverts to a free slot
    /// and its references are released. Receive and send-once rights
    /// accept only deltas of 0 and -1; -1 destroys the right.
    pub fn delta(&self, name: Name, right: RightClass, delta: i32) -> Result<(), RightError> {
        let mut state = self.lock();
        state.reconcile(name);
        let entry = state.entry(name)?;
        if entry.class() != right {
            return Err(RightError::InvalidRight(name));
        }
        let urefs = entry.urefs();

        match right {
            RightClass::Send | RightClass::DeadName => {
                let updated = urefs as i64 + delta as i64;
                if updated < 0 || updated > UREFS_MAX as i64 {
                    return Err(RightError::InvalidValue(name));
                }
                if updated == 0 {
                    let entry = state.remove(name);
                    if let Some(port) = entry.object {
                        if let Some(id) = entry.request {
                            if let Some(notify) = port.cancel_request(id) {
                                let dest = notify.port_id();
                                notify.fire(ipc::port_deleted_notification(dest, name));
                            }
                        }
                        port.release_sright();
                    }
                } else {
                    let entry = state.entry_mut(name).expect("looked up above");
                    entry.kind = match right {
                        RightClass::Send => RightKind::Send {
                            urefs: updated as u32,
                        },
                        _ => RightKind::DeadName {
                            urefs: updated as u32,
                        },
                    };
                }
            }
            RightClass::Receive => match delta {
                0 => {}
                -1 => destroy_receive_entry(&mut state, name),
                _ => return Err(RightError::InvalidValue(name)),
            },
            RightClass::SendOnce => match delta {
                0 => {}
                -1 => destroy_send_once_entry(&mut state, name),
                _ => return Err(RightError::InvalidValue(name)),
            },
        }
        state.audit.record(RightsEvent::Delta {
            name,
            class: right,
            delta,
        });
        Ok(())
    }

    /// Releases one user reference, choosing the delta class from the
    /// entry's current kind
    ///
    /// Receive rights are not deallocatable this way; destroying a
    /// port is an explicit act.
    pub fn dealloc(&self, name: Name) -> Result<(), RightError> {
        let class = {
            let mut state = self.lock();
            state.reconcile(name);
            state.entry(name)?.class()
        };
        match class {
            RightClass::Receive => Err(RightError::InvalidRight(name)),
            class => self.delta(name, class, -1),
        }
    }

    /// Unconditionally removes whatever right occupies `name`
    ///
    /// Destroying a receive right destroys the port: its queue is
    /// invalidated and registered dead-name requests fire. The slot
    /// becomes free; subsequent lookups fail with `InvalidName`.
    pub fn destroy(&self, name: Name) -> Result<(), RightError> {
        let mut state = self.lock();
        state.reconcile(name);
        let class = state.entry(name)?.class();
        match class {
            RightClass::Receive => destroy_receive_entry(&mut state, name),
            RightClass::SendOnce => destroy_send_once_entry(&mut state, name),
            RightClass::Send => {
                let entry = state.remove(name);
                let port = entry.object.expect("live entry holds its port");
                if let Some(id) = entry.request {
                    if let Some(notify) = port.cancel_request(id) {
                        let dest = notify.port_id();
                        notify.fire(ipc::port_deleted_notification(dest, name));
                    }
                }
                port.release_sright();
            }
            RightClass::DeadName => {
                state.remove(name);
            }
        }
        state.audit.record(RightsEvent::Destroyed { name });
        Ok(())
    }

    /// Atomically moves the entry under `old` to the slot `new`
    ///
    /// The table grows through its size classes if `new` is beyond the
    /// current bound. A pending dead-name request follows the entry,
    /// so its eventual notification reports the new name.
    pub fn rename(&self, old: Name, new: Name) -> Result<(), RightError> {
        let mut state = self.lock();
        state.reconcile(old);
        state.entry(old)?;
        state.alloc_named(self.entry_classes(), new)?;
        let entry = state.remove(old);
        if let (Some(port), Some(id)) = (&entry.object, entry.request) {
            port.rename_request(id, new);
        }
        state.slots[new.index() as usize] = Some(entry);
        state.audit.record(RightsEvent::Renamed { old, new });
        Ok(())
    }

    /// Registers `notify` to fire when the port under `name` dies
    ///
    /// At most one request per entry: registering over an existing one
    /// returns the previous right to the caller for disposal. If the
    /// name is already dead and `immediate` is set, the notification
    /// fires synchronously instead of registering; if it is dead and
    /// `immediate` is not set, the operation fails and `notify` is
    /// destroyed (delivering its send-once notification) rather than
    /// silently dropped.
    pub fn dead_name_request(
        &self,
        name: Name,
        immediate: bool,
        notify: SendOnceRight,
    ) -> Result<Option<SendOnceRight>, RightError> {
        let mut state = self.lock();
        let mut notify = notify;
        loop {
            state.reconcile(name);
            let is_dead = matches!(state.entry(name)?.kind, RightKind::DeadName { .. });
            if is_dead {
                return if immediate {
                    let dest = notify.port_id();
                    notify.fire(ipc::dead_name_notification(dest, name));
                    state.audit.record(RightsEvent::DeadNameRequested {
                        name,
                        replaced_previous: false,
                    });
                    Ok(None)
                } else {
                    notify.destroy();
                    Err(RightError::DeadNotAllowed(name))
                };
            }
            let port = state
                .entry(name)
                .expect("looked up above")
                .object
                .clone()
                .expect("live entry holds its port");
            match port.register_request(name, notify) {
                Ok(id) => {
                    let entry = state.entry_mut(name).expect("looked up above");
                    let previous = entry.request.replace(id);
                    let prior = previous.and_then(|prev| port.cancel_request(prev));
                    state.audit.record(RightsEvent::DeadNameRequested {
                        name,
                        replaced_previous: prior.is_some(),
                    });
                    return Ok(prior);
                }
                Err(RegisterError::PortDead(returned)) => {
                    // The port died between the reconcile and the
                    // registration; go around and take the dead path.
                    notify = returned;
                }
                Err(RegisterError::TableFull(returned)) => {
                    returned.destroy();
                    return Err(RightError::NoSpace);
                }
            }
        }
    }

    /// Cancels the pending dead-name request under `name`
    ///
    /// Returns the registered right for caller disposal; `Ok(None)` if
    /// nothing was pending.
    pub fn dead_name_cancel(&self, name: Name) -> Result<Option<SendOnceRight>, RightError> {
        let mut state = self.lock();
        state.reconcile(name);
        let entry = state.entry_mut(name)?;
        let Some(id) = entry.request.take() else {
            return Ok(None);
        };
        let port = entry.object.clone().expect("entries with requests are live");
        let notify = port.cancel_request(id);
        state.audit.record(RightsEvent::DeadNameCancelled { name });
        Ok(notify)
    }

    /// Destroys every entry; used at task teardown
    pub fn teardown(&self) {
        let names: Vec<Name> = {
            let state = self.lock();
            state
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(|(index, _)| Name::from_index(index as u32))
                .collect()
        };
        for name in names {
            let _ = self.destroy(name);
        }
    }
}

/// Removes a receive entry and destroys its port
///
/// The entry's own request vanishes with the name, quietly; requests
/// registered by other holders fire from the port's destruction.
fn destroy_receive_entry(state: &mut TableState, name: Name) {
    let entry = state.remove(name);
    let port = entry.object.expect("receive entries hold the port");
    if let Some(id) = entry.request {
        drop(port.cancel_request(id));
    }
    port.destroy_receive();
}

/// Removes a send-once entry, notifying the port the message will
/// never come
fn destroy_send_once_entry(state: &mut TableState, name: Name) {
    let entry = state.remove(name);
    let port = entry.object.expect("live entry holds its port");
    if let Some(id) = entry.request {
        if let Some(notify) = port.cancel_request(id) {
            let dest = notify.port_id();
            notify.fire(ipc::port_deleted_notification(dest, name));
        }
    }
    SendOnceRight::from_transfer(port).destroy();
}
