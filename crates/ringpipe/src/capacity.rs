//! Capacity management: power-of-two sizing and storage allocation.

use crate::invariants::debug_assert_power_of_two;
use crate::RingError;
use std::sync::Arc;
use tracing::debug;

/// Byte geometry of a ring buffer.
///
/// `bytes` is always a power of two so that every index can be wrapped with
/// `& mask()`. One byte is reserved to tell "empty" from "full", which leaves
/// `bytes - 1` usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    bytes: usize,
    element_size: usize,
}

impl Capacity {
    /// Largest byte size that can be requested.
    ///
    /// The top bit is reserved so masked wraparound arithmetic stays defined.
    pub const MAX_BYTES: usize = usize::MAX >> 1;

    /// Computes the geometry for `elements` elements of `element_size` bytes.
    pub fn for_elements(elements: usize, element_size: usize) -> Result<Self, RingError> {
        if element_size == 0 {
            return Err(invalid("element size must be greater than 0"));
        }
        if elements == 0 {
            return Err(invalid("capacity must be greater than 0"));
        }
        let requested = elements
            .checked_mul(element_size)
            .filter(|&bytes| bytes <= Self::MAX_BYTES)
            .ok_or_else(|| invalid("requested byte size exceeds usize::MAX >> 1"))?;

        // requested <= 2^(N-1) - 1, so the next power of two still fits
        let bytes = requested.next_power_of_two();
        debug_assert_power_of_two!(bytes);

        Ok(Self {
            bytes,
            element_size,
        })
    }

    /// Total storage size in bytes.
    #[inline]
    pub const fn bytes(&self) -> usize {
        self.bytes
    }

    /// Mask used to wrap byte indices.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.bytes - 1
    }

    /// Bytes that can be occupied at once (one slot is reserved).
    #[inline]
    pub const fn usable_bytes(&self) -> usize {
        self.bytes - 1
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Total storage size in elements.
    #[inline]
    pub const fn elements(&self) -> usize {
        self.bytes / self.element_size
    }
}

fn invalid(reason: &'static str) -> RingError {
    debug!(reason, "rejected ring buffer size");
    RingError::InvalidSize { reason }
}

/// Source of ring storage.
///
/// Allocation failure is reported as a value so that a failed resize can be
/// rolled back instead of aborting the process.
pub trait StorageAllocator: Send + Sync {
    /// Returns zeroed storage of exactly `bytes` bytes.
    fn allocate(&self, bytes: usize) -> Result<Box<[u8]>, RingError>;
}

impl<T: StorageAllocator + ?Sized> StorageAllocator for Arc<T> {
    fn allocate(&self, bytes: usize) -> Result<Box<[u8]>, RingError> {
        (**self).allocate(bytes)
    }
}

/// Allocates storage from the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalStorage;

impl StorageAllocator for GlobalStorage {
    fn allocate(&self, bytes: usize) -> Result<Box<[u8]>, RingError> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(bytes)
            .map_err(|_| RingError::AllocationFailure { bytes })?;
        storage.resize(bytes, 0);
        Ok(storage.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_up_to_power_of_two() {
        let cap = Capacity::for_elements(10, 1).unwrap();
        assert_eq!(cap.bytes(), 16);
        assert_eq!(cap.mask(), 15);
        assert_eq!(cap.usable_bytes(), 15);
        assert_eq!(cap.elements(), 16);

        let cap = Capacity::for_elements(16, 1).unwrap();
        assert_eq!(cap.bytes(), 16);

        let cap = Capacity::for_elements(3, 12).unwrap();
        assert_eq!(cap.bytes(), 64);
        assert_eq!(cap.elements(), 5);
    }

    #[test]
    fn test_single_byte_capacity() {
        let cap = Capacity::for_elements(1, 1).unwrap();
        assert_eq!(cap.bytes(), 1);
        assert_eq!(cap.mask(), 0);
        assert_eq!(cap.usable_bytes(), 0);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        assert!(matches!(
            Capacity::for_elements(0, 1),
            Err(RingError::InvalidSize { .. })
        ));
        assert!(matches!(
            Capacity::for_elements(8, 0),
            Err(RingError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_request() {
        assert!(Capacity::for_elements(Capacity::MAX_BYTES, 1).is_ok());
        assert!(matches!(
            Capacity::for_elements(Capacity::MAX_BYTES + 1, 1),
            Err(RingError::InvalidSize { .. })
        ));
        assert!(matches!(
            Capacity::for_elements(usize::MAX, 2),
            Err(RingError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_global_storage_is_zeroed() {
        let storage = GlobalStorage.allocate(32).unwrap();
        assert_eq!(storage.len(), 32);
        assert!(storage.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_global_storage_reports_failure() {
        let err = GlobalStorage.allocate(usize::MAX).unwrap_err();
        assert_eq!(err, RingError::AllocationFailure { bytes: usize::MAX });
    }
}
