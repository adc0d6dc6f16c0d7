use crate::invariants::{debug_assert_conserved, debug_assert_index_in_range};
use crate::{Capacity, Metrics};

// =============================================================================
// INDEX ARITHMETIC
// =============================================================================
//
// `head` is the next byte to write, `tail` the next byte to read. Both are
// plain byte offsets in [0, capacity) and are wrapped with `& mask` after every
// advance, so there are no unbounded sequence numbers here.
//
// Occupancy is the masked distance from tail to head:
//
//     read_size  = (head - tail) & mask
//     write_size = capacity - 1 - read_size
//
// With only two indices, "head == tail" has to mean empty, so one byte of
// storage is never written by a bounded transfer. That is the reserved slot.
//
// Example with capacity 16 (mask 0b1111), tail = 12, head = 3:
//
//     (3 - 12) & 0b1111 = (-9) & 0b1111 = 7 readable bytes
//     [12, 13, 14, 15, 0, 1, 2]
//
// Nothing in this file takes a lock. `RingState` lives inside the buffer's
// mutex and every method assumes the caller holds it.
//
// =============================================================================

/// Lock-protected state of a ring buffer.
pub(crate) struct RingState {
    capacity: Capacity,
    /// Next write position
    head: usize,
    /// Next read position
    tail: usize,
    /// Blocking mode; cleared by `end_blocking`, set again by `reset`/resize
    blocking: bool,
    storage: Box<[u8]>,
    /// `None` when metrics are disabled
    metrics: Option<Metrics>,
}

impl RingState {
    pub(crate) fn new(capacity: Capacity, storage: Box<[u8]>, enable_metrics: bool) -> Self {
        debug_assert_eq!(storage.len(), capacity.bytes());
        Self {
            capacity,
            head: 0,
            tail: 0,
            blocking: true,
            storage,
            metrics: enable_metrics.then(Metrics::new),
        }
    }

    // ---------------------------------------------------------------------
    // GEOMETRY & STATUS
    // ---------------------------------------------------------------------

    #[inline]
    pub(crate) fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub(crate) fn is_blocking(&self) -> bool {
        self.blocking
    }

    #[inline]
    pub(crate) fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    /// Bytes available to read.
    #[inline]
    pub(crate) fn read_size(&self) -> usize {
        self.head.wrapping_sub(self.tail) & self.capacity.mask()
    }

    /// Bytes that can be written without overwriting unread data.
    #[inline]
    pub(crate) fn write_size(&self) -> usize {
        let distance = self.tail.wrapping_sub(self.head) & self.capacity.mask();
        // A zero distance is an empty ring: the whole storage is ahead of head
        let distance = if distance == 0 {
            self.capacity.bytes()
        } else {
            distance
        };
        distance - 1
    }

    pub(crate) fn metrics(&self) -> Metrics {
        self.metrics.unwrap_or_default()
    }

    #[inline]
    pub(crate) fn record(&mut self, update: impl FnOnce(&mut Metrics)) {
        if let Some(metrics) = self.metrics.as_mut() {
            update(metrics);
        }
    }

    // ---------------------------------------------------------------------
    // RAW TRANSFER
    // ---------------------------------------------------------------------

    /// Copies `src` into the ring at `head` and advances `head`.
    ///
    /// Does not look at free space. A source longer than the storage wraps
    /// more than once and only its last `capacity` bytes survive.
    pub(crate) fn raw_write(&mut self, src: &[u8]) {
        let bytes = self.capacity.bytes();
        let mask = self.capacity.mask();
        let mut written = 0;

        while written < src.len() {
            let contiguous = (bytes - self.head).min(src.len() - written);
            self.storage[self.head..self.head + contiguous]
                .copy_from_slice(&src[written..written + contiguous]);
            written += contiguous;
            self.head = (self.head + contiguous) & mask;
        }

        debug_assert_index_in_range!("head", self.head, bytes);
        debug_assert_conserved!(self.read_size(), self.write_size(), bytes);
    }

    /// Copies `dst.len()` bytes out of the ring at `tail` and advances `tail`.
    ///
    /// Does not look at available data; callers clamp `dst` first.
    pub(crate) fn raw_read(&mut self, dst: &mut [u8]) {
        let bytes = self.capacity.bytes();
        let mask = self.capacity.mask();
        let mut read = 0;

        while read < dst.len() {
            let contiguous = (bytes - self.tail).min(dst.len() - read);
            dst[read..read + contiguous]
                .copy_from_slice(&self.storage[self.tail..self.tail + contiguous]);
            read += contiguous;
            self.tail = (self.tail + contiguous) & mask;
        }

        debug_assert_index_in_range!("tail", self.tail, bytes);
        debug_assert_conserved!(self.read_size(), self.write_size(), bytes);
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Drops all buffered bytes and starts a new blocking session.
    pub(crate) fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.blocking = true;
    }

    /// Moves the readable bytes into `storage` and makes it the ring storage.
    ///
    /// The caller has checked that the readable bytes fit in
    /// `capacity.usable_bytes()`. The data is linearised to offset 0, so
    /// `tail = 0` and `head = occupied` afterwards.
    pub(crate) fn replace_storage(&mut self, capacity: Capacity, mut storage: Box<[u8]>) {
        let occupied = self.read_size();
        debug_assert!(occupied <= capacity.usable_bytes());
        debug_assert_eq!(storage.len(), capacity.bytes());

        let first = (self.capacity.bytes() - self.tail).min(occupied);
        storage[..first].copy_from_slice(&self.storage[self.tail..self.tail + first]);
        storage[first..occupied].copy_from_slice(&self.storage[..occupied - first]);

        self.storage = storage;
        self.capacity = capacity;
        self.tail = 0;
        self.head = occupied;
        self.blocking = true;

        debug_assert_index_in_range!("head", self.head, capacity.bytes());
        debug_assert_conserved!(self.read_size(), self.write_size(), capacity.bytes());
    }

    #[cfg(test)]
    fn indices(&self) -> (usize, usize) {
        (self.head, self.tail)
    }
}
