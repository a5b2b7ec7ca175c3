//! Debug assertion macros for the lock-free ring's slot-sequence protocol.
//!
//! Active only in debug builds; release builds pay nothing. Each macro checks
//! one invariant of the reserve-commit scheme in `ring.rs`.

/// Assert the in-flight count never exceeds capacity.
///
/// Invariant: `0 <= (tail - head) <= capacity`
macro_rules! debug_assert_bounded_count {
    ($tail:expr, $head:expr, $capacity:expr) => {
        debug_assert!(
            $tail.wrapping_sub($head) <= $capacity,
            "bounded-count violated: tail {} head {} capacity {}",
            $tail,
            $head,
            $capacity
        )
    };
}

/// Assert a slot is in the state the claiming side expects.
///
/// A producer claims a slot whose sequence equals its position; a consumer
/// claims one whose sequence equals position + 1. Anything else means the
/// claim raced past the CAS that was supposed to serialize it.
macro_rules! debug_assert_slot_claimed {
    ($seq:expr, $expected:expr) => {
        debug_assert!(
            $seq == $expected,
            "slot claimed out of protocol: sequence {} expected {}",
            $seq,
            $expected
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_slot_claimed;
