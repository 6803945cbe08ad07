//! Debug assertion macros for ring buffer and queue invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.
//!
//! Used by `RingBuffer<T>` and `BlockingQueue<T>`.

// =============================================================================
// INV-RB-01: Bounded Count
// =============================================================================

/// Assert that the occupied slot count does not exceed capacity.
///
/// **Invariant**: `0 ≤ count ≤ capacity`
///
/// Used in: `RingBuffer::push()` after incrementing count
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-RB-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-RB-02: Empty Sentinel
// =============================================================================

/// Assert that head/tail sit at the empty sentinel exactly when count is zero.
///
/// **Invariant**: `count == 0 ⟺ head.is_none() && tail.is_none()`
///
/// Used in: `RingBuffer::push()` and `RingBuffer::pop()` after mutation
macro_rules! debug_assert_sentinel {
    ($count:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            ($count == 0) == ($head.is_none() && $tail.is_none()),
            "INV-RB-02 violated: count {} with head {:?} tail {:?}",
            $count,
            $head,
            $tail
        )
    };
}

// =============================================================================
// INV-Q-01: Occupancy Re-checked Under Lock
// =============================================================================

/// Assert that the coordinator only touches the buffer after its wait loop
/// observed the right occupancy.
///
/// **Invariant**: publish sees `len < capacity`, consume sees `len > 0`
///
/// Used in: `BlockingQueue::publish_inner()` / `consume_inner()`
macro_rules! debug_assert_room {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len < $capacity,
            "INV-Q-01 violated: publishing into full buffer ({}/{})",
            $len,
            $capacity
        )
    };
}

macro_rules! debug_assert_available {
    ($len:expr) => {
        debug_assert!($len > 0, "INV-Q-01 violated: consuming from empty buffer")
    };
}

pub(crate) use debug_assert_available;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_room;
pub(crate) use debug_assert_sentinel;
