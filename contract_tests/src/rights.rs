//! Right lifecycle contract tests
//!
//! Reference ownership, send-right de-duplication, dead-name
//! transitions, and copyin/copyin_undo round trips, exercised across
//! tables the way the marshaling layer drives them.
