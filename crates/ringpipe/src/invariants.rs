//! Debug assertion macros for ring buffer invariants.
//!
//! They are only active in debug builds (`#[cfg(debug_assertions)]`), so there
//! is zero overhead in release builds.

// =============================================================================
// Capacity is a power of two
// =============================================================================

/// Assert that a byte capacity is a power of two.
///
/// **Invariant**: `bytes == 2^k`, so `mask = bytes - 1` wraps every index
///
/// Used in: `Capacity::for_elements()`
macro_rules! debug_assert_power_of_two {
    ($bytes:expr) => {
        debug_assert!(
            $bytes.is_power_of_two(),
            "capacity {} is not a power of two",
            $bytes
        )
    };
}

// =============================================================================
// Indices stay in range
// =============================================================================

/// Assert that a byte index is inside the storage.
///
/// **Invariant**: `0 ≤ index < capacity`
///
/// Used in: `RingState::raw_write()`, `RingState::raw_read()`, resize
macro_rules! debug_assert_index_in_range {
    ($name:literal, $index:expr, $capacity:expr) => {
        debug_assert!(
            $index < $capacity,
            "{} index {} outside storage of {} bytes",
            $name,
            $index,
            $capacity
        )
    };
}

// =============================================================================
// Occupied + free is conserved
// =============================================================================

/// Assert that readable and writable bytes add up to the usable capacity.
///
/// **Invariant**: `read_size + write_size == capacity - 1`
///
/// Used in: after every index update
macro_rules! debug_assert_conserved {
    ($read:expr, $write:expr, $capacity:expr) => {
        debug_assert!(
            $read + $write + 1 == $capacity,
            "occupancy not conserved: read {} + write {} + 1 != capacity {}",
            $read,
            $write,
            $capacity
        )
    };
}

// =============================================================================
// Blocking chunks never self-overlap
// =============================================================================

/// Assert that a blocking chunk fits in the space it was admitted into.
///
/// **Invariant**: `chunk ≤ available ≤ capacity - 1`
///
/// Used in: `RingBuffer::blocking_transfer()` before the raw copy
macro_rules! debug_assert_chunk_fits {
    ($chunk:expr, $available:expr) => {
        debug_assert!(
            $chunk <= $available,
            "chunk of {} bytes admitted with only {} bytes available",
            $chunk,
            $available
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_chunk_fits;
pub(crate) use debug_assert_conserved;
pub(crate) use debug_assert_index_in_range;
pub(crate) use debug_assert_power_of_two;
