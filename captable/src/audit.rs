//! Rights audit trail
//!
//! Chronological record of every table transition, for verification
//! in tests. Events are sequence-numbered rather than timestamped:
//! the table owns no clock, and a monotone sequence is all the
//! ordering assertions need.

use core_types::{Name, RightsEvent};

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Position in the table's history, starting at zero
    pub seq: u64,
    /// The transition that occurred
    pub event: RightsEvent,
}

/// Audit log for one capability table
#[derive(Debug, Clone, Default)]
pub struct RightsAuditLog {
    records: Vec<AuditRecord>,
}

impl RightsAuditLog {
    /// Creates a new empty audit log
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, event: RightsEvent) {
        let seq = self.records.len() as u64;
        self.records.push(AuditRecord { seq, event });
    }

    /// Returns all recorded events in order
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Returns the events that concern a specific name
    pub fn events_for_name(&self, name: Name) -> Vec<&AuditRecord> {
        self.records
            .iter()
            .filter(|record| record.event.name() == name)
            .collect()
    }

    /// Checks if any event matches the predicate
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&RightsEvent) -> bool,
    {
        self.records.iter().any(|record| predicate(&record.event))
    }

    /// Counts events matching the predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RightsEvent) -> bool,
    {
        self.records
            .iter()
            .filter(|record| predicate(&record.event))
            .count()
    }

    /// Returns the number of recorded events
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if the log is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RightClass;

    #[test]
    fn test_sequence_numbers_are_dense() {
        let mut log = RightsAuditLog::new();
        log.record(RightsEvent::Destroyed {
            name: Name::from_index(1),
        });
        log.record(RightsEvent::Destroyed {
            name: Name::from_index(2),
        });
        assert_eq!(log.records()[0].seq, 0);
        assert_eq!(log.records()[1].seq, 1);
    }

    #[test]
    fn test_query_by_name() {
        let mut log = RightsAuditLog::new();
        log.record(RightsEvent::Copyout {
            name: Name::from_index(4),
            class: RightClass::Send,
            deduplicated: false,
        });
        log.record(RightsEvent::Destroyed {
            name: Name::from_index(9),
        });
        assert_eq!(log.events_for_name(Name::from_index(4)).len(), 1);
        assert_eq!(
            log.count_events(|e| matches!(e, RightsEvent::Destroyed { .. })),
            1
        );
        assert!(log.has_event(|e| matches!(
            e,
            RightsEvent::Copyout {
                deduplicated: false,
                ..
            }
        )));
    }
}
