//! Capability table growth policy
//!
//! Tables back sparse collections (capability entries, pending
//! dead-name-request slots) with a contiguous allocation that grows
//! through a precomputed sequence of size classes: geometric while the
//! allocation is smaller than a page, then linear in page increments
//! with the increment doubling every [`PAGE_STEPS_PER_DOUBLING`]
//! classes so the class table itself stays short.
//!
//! The sequence is immutable configuration data. Whoever constructs a
//! table builds its class vector once with [`build_size_classes`] and
//! shares it; there is no process-wide mutable sizing state.
//!
//! The terminal two classes compare equal, so "already at the largest
//! class" is detected by adjacent equality ([`is_terminal`]) instead of
//! an out-of-bounds check.

use serde::{Deserialize, Serialize};

/// Allocation granularity for the linear growth phase
pub const PAGE_SIZE: usize = 4096;

/// Classes emitted between doublings of the page increment
pub const PAGE_STEPS_PER_DOUBLING: usize = 15;

/// One step of the growth sequence: a table capacity in elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeClass {
    /// Number of elements a table at this class can hold
    pub capacity: usize,
}

/// Parameters for one growth sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClassConfig {
    /// Total classes to emit, including the terminal sentinel
    pub classes: usize,
    /// Smallest capacity worth recording; tinier doubling steps are skipped
    pub min_capacity: usize,
    /// Size in bytes of one table element
    pub elem_size: usize,
}

/// Builds the growth sequence for one table kind
///
/// While the backing allocation is under a page, byte sizes double
/// (1, 2, 4, ...) and a class is recorded only once it holds at least
/// `min_capacity` elements. From one page up, sizes grow by a fixed
/// page increment that doubles every [`PAGE_STEPS_PER_DOUBLING`]
/// classes. The final class repeats its predecessor as the sentinel.
pub fn build_size_classes(config: &SizeClassConfig) -> Vec<SizeClass> {
    assert!(config.classes >= 2, "a sequence needs a class and a sentinel");
    assert!(config.elem_size > 0, "zero-sized table elements");

    let mut out = Vec::with_capacity(config.classes);
    let min_bytes = config.min_capacity.saturating_mul(config.elem_size);

    let mut bytes = 1usize;
    while bytes < PAGE_SIZE && out.len() + 1 < config.classes {
        if bytes >= min_bytes {
            out.push(SizeClass {
                capacity: bytes / config.elem_size,
            });
        }
        bytes <<= 1;
    }

    let mut increment = PAGE_SIZE;
    let mut steps = 0;
    while out.len() + 1 < config.classes {
        out.push(SizeClass {
            capacity: bytes / config.elem_size,
        });
        bytes = bytes.saturating_add(increment);
        steps += 1;
        if steps == PAGE_STEPS_PER_DOUBLING {
            increment = increment.saturating_mul(2);
            steps = 0;
        }
    }

    let last = *out.last().expect("at least one class before the sentinel");
    out.push(last);
    out
}

/// True if `index` is the largest usable class in the sequence
///
/// Detected by adjacent equality with the sentinel; growth from a
/// terminal class is impossible.
pub fn is_terminal(classes: &[SizeClass], index: usize) -> bool {
    match classes.get(index + 1) {
        Some(next) => classes[index].capacity == next.capacity,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(classes: usize, min_capacity: usize, elem_size: usize) -> SizeClassConfig {
        SizeClassConfig {
            classes,
            min_capacity,
            elem_size,
        }
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let classes = build_size_classes(&config(64, 4, 64));
        for pair in classes.windows(2) {
            assert!(pair[0].capacity <= pair[1].capacity);
        }
    }

    #[test]
    fn test_first_class_respects_min_capacity() {
        let classes = build_size_classes(&config(32, 8, 16));
        assert!(classes[0].capacity >= 8);
    }

    #[test]
    fn test_doubling_below_one_page() {
        let classes = build_size_classes(&config(32, 1, 16));
        // Recorded byte sizes double until a page: 16 elems = 256 bytes,
        // next class must be 32 elems.
        let first = classes[0].capacity;
        assert_eq!(classes[1].capacity, first * 2);
    }

    #[test]
    fn test_linear_phase_uses_page_increments() {
        let classes = build_size_classes(&config(20, 1, 64));
        let per_page = PAGE_SIZE / 64;
        // Find the first class at or beyond one page; the next non-sentinel
        // class adds exactly one page of elements.
        let i = classes
            .iter()
            .position(|c| c.capacity >= per_page)
            .expect("sequence reaches one page");
        assert_eq!(classes[i + 1].capacity, classes[i].capacity + per_page);
    }

    #[test]
    fn test_increment_doubles_after_fifteen_steps() {
        let elem = 64;
        let per_page = PAGE_SIZE / elem;
        let classes = build_size_classes(&config(40, 1, elem));
        let start = classes
            .iter()
            .position(|c| c.capacity >= per_page)
            .unwrap();
        // Steps 1..=15 advance by one page; step 16 advances by two.
        let step15 = classes[start + 15].capacity - classes[start + 14].capacity;
        let step16 = classes[start + 16].capacity - classes[start + 15].capacity;
        assert_eq!(step15, per_page);
        assert_eq!(step16, per_page * 2);
    }

    #[test]
    fn test_terminal_sentinel_is_adjacent_equal() {
        let classes = build_size_classes(&config(16, 4, 32));
        let len = classes.len();
        assert_eq!(len, 16);
        assert_eq!(classes[len - 1], classes[len - 2]);
        assert!(is_terminal(&classes, len - 2));
        assert!(is_terminal(&classes, len - 1));
        assert!(!is_terminal(&classes, 0));
    }

    #[test]
    fn test_smallest_valid_sequence() {
        let classes = build_size_classes(&config(2, 1, 8));
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0], classes[1]);
    }
}
