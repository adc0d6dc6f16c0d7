use crate::deadline::Deadline;
use crate::invariants::debug_assert_chunk_fits;
use crate::ring::RingState;
use crate::sync::{Condvar, Mutex, MutexGuard};
use crate::{Capacity, Config, GlobalStorage, Metrics, RingError, StorageAllocator};
use std::fmt;
use std::ops::Range;
use std::sync::PoisonError;
use std::time::Duration;
use tracing::{debug, trace, warn};

// =============================================================================
// MONITOR PROTOCOL
// =============================================================================
//
// All state lives in one `Mutex<RingState>`. A single condition variable,
// `changed`, is notified with `notify_all` after anything that can make a
// waiter's predicate true: indices advancing, `reset`, `end_blocking`,
// `resize`. Writers wait for free space and readers wait for data on the same
// condition, so a wake-up says nothing about *which* predicate changed. Every
// waiter re-checks its own predicate in a loop after every wake.
//
// A blocking call holds the lock for its whole duration except while parked
// in `Condvar::wait*`, which releases and re-acquires it atomically.
//
// Blocking calls move data in chunks of at most `capacity - 1` bytes, the
// largest amount that can be in the ring at once. A chunk is only copied
// once it fits entirely, so a bounded chunk never overwrites unread bytes.
//
// =============================================================================

/// A thread-safe bounded byte ring buffer.
///
/// Storage is a power-of-two number of bytes carved into fixed-size
/// elements. All lengths in the API are element counts; all return values are
/// element counts.
///
/// Two transfer modes share one lock:
/// - **Non-blocking** ([`write`](Self::write), [`read`](Self::read)): always
///   complete immediately. Writes overwrite unread data when the ring is
///   full; reads return what is there.
/// - **Blocking** ([`blocking_write`](Self::blocking_write),
///   [`blocking_read`](Self::blocking_read)): wait for space or data, bounded
///   by an optional timeout. They degrade to non-blocking after
///   [`end_blocking`](Self::end_blocking) until the next
///   [`reset`](Self::reset).
///
/// Share it between threads with `Arc<RingBuffer>`.
pub struct RingBuffer<A: StorageAllocator = GlobalStorage> {
    state: Mutex<RingState>,
    /// Notified on every state change; see MONITOR PROTOCOL above.
    changed: Condvar,
    allocator: A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    Signaled,
    TimedOut,
    Failed,
}

impl RingBuffer {
    /// Creates a buffer for `capacity` elements of `element_size` bytes.
    ///
    /// The byte capacity is rounded up to a power of two.
    pub fn new(capacity: usize, element_size: usize) -> Result<Self, RingError> {
        Self::with_config(Config::new(capacity, element_size, false))
    }

    /// Creates a buffer from a [`Config`].
    pub fn with_config(config: Config) -> Result<Self, RingError> {
        Self::with_allocator(config, GlobalStorage)
    }
}

impl<A: StorageAllocator> RingBuffer<A> {
    /// Creates a buffer whose storage comes from `allocator`.
    ///
    /// The same allocator is used for every later [`resize`](Self::resize).
    pub fn with_allocator(config: Config, allocator: A) -> Result<Self, RingError> {
        let capacity = Capacity::for_elements(config.capacity, config.element_size)?;
        let storage = allocator.allocate(capacity.bytes()).map_err(|err| {
            warn!(bytes = capacity.bytes(), error = %err, "ring buffer allocation failed");
            err
        })?;

        debug!(
            bytes = capacity.bytes(),
            element_size = capacity.element_size(),
            "ring buffer allocated"
        );

        Ok(Self {
            state: Mutex::new(RingState::new(capacity, storage, config.enable_metrics)),
            changed: Condvar::new(),
            allocator,
        })
    }

    /// Every mutation of `RingState` runs to completion without panicking, so
    /// the state behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // NON-BLOCKING API
    // ---------------------------------------------------------------------

    /// Writes `len` elements from `src` without waiting.
    ///
    /// This never checks free space: if `len` exceeds the free space, unread
    /// data is overwritten, and if it exceeds the whole storage only the last
    /// `byte_size()` bytes survive. Returns `len`.
    pub fn write(&self, src: &[u8], len: usize) -> Result<usize, RingError> {
        let mut state = self.lock();
        let bytes = transfer_bytes(&state, len, src.len())?;
        if bytes == 0 {
            return Ok(0);
        }
        let element_size = state.capacity().element_size();

        let written = overwrite(&mut state, &src[..bytes]);
        self.changed.notify_all();
        Ok(written / element_size)
    }

    /// Reads up to `len` elements into `dst` without waiting.
    ///
    /// Returns the number of elements actually read, which is less than `len`
    /// when less data is buffered.
    pub fn read(&self, dst: &mut [u8], len: usize) -> Result<usize, RingError> {
        let mut state = self.lock();
        let bytes = transfer_bytes(&state, len, dst.len())?;
        if bytes == 0 {
            return Ok(0);
        }
        let element_size = state.capacity().element_size();

        let read = drain(&mut state, &mut dst[..bytes]);
        self.changed.notify_all();
        Ok(read / element_size)
    }

    // ---------------------------------------------------------------------
    // BLOCKING API
    // ---------------------------------------------------------------------

    /// Writes `len` elements from `src`, waiting for free space.
    ///
    /// Never overwrites unread data while blocking is enabled. Returns `len`
    /// on success, or fewer elements if `timeout` elapses first. With
    /// `timeout = None` the call waits until the data is written or
    /// [`end_blocking`](Self::end_blocking) is called, after which the rest
    /// is written non-blocking. A timeout too large for the monotonic clock
    /// to represent waits without a bound.
    ///
    /// # Liveness
    ///
    /// Data moves in whole chunks of `min(remaining, byte_size() - 1)` bytes,
    /// and a chunk waits until it fits entirely. A writer and a reader whose
    /// chunks add up to more than `byte_size()` can therefore wait on each
    /// other forever. Keep per-call lengths of concurrent writers and readers
    /// within the capacity together, or pass a timeout.
    ///
    /// A chunk of `byte_size() - 1` bytes is not a whole number of elements
    /// when `element_size()` is even. If such a call times out, the ring can
    /// hold a partial element that the returned count does not include.
    pub fn blocking_write(
        &self,
        src: &[u8],
        len: usize,
        timeout: Option<Duration>,
    ) -> Result<usize, RingError> {
        self.blocking_transfer(Side::Write(src), len, timeout)
    }

    /// Reads `len` elements into `dst`, waiting for data.
    ///
    /// Returns `len` on success, or fewer elements if `timeout` elapses or
    /// [`end_blocking`](Self::end_blocking) is called first.
    ///
    /// Chunks are bounded by `byte_size() - 1` bytes, so with an even
    /// `element_size()` a timed-out read can consume part of an element
    /// that the returned count does not include.
    ///
    /// See the liveness note on [`blocking_write`](Self::blocking_write).
    pub fn blocking_read(
        &self,
        dst: &mut [u8],
        len: usize,
        timeout: Option<Duration>,
    ) -> Result<usize, RingError> {
        self.blocking_transfer(Side::Read(dst), len, timeout)
    }

    fn blocking_transfer(
        &self,
        mut side: Side<'_>,
        len: usize,
        timeout: Option<Duration>,
    ) -> Result<usize, RingError> {
        let mut state = self.lock();
        let bytes = transfer_bytes(&state, len, side.len())?;
        if bytes == 0 {
            return Ok(0);
        }
        let element_size = state.capacity().element_size();

        if !state.is_blocking() {
            let moved = side.nonblocking(&mut state, 0..bytes);
            self.changed.notify_all();
            return Ok(finish(&mut state, moved, bytes) / element_size);
        }

        let mut deadline = Deadline::new(timeout);
        let mut done = 0;

        while done < bytes {
            let remaining = bytes - done;
            let mut chunk = chunk_bytes(&state, remaining);

            while chunk > side.ready(&state) {
                let outcome;
                (state, outcome) = self.wait(state, &mut deadline);
                // A resize may have changed the capacity while we were parked
                chunk = chunk_bytes(&state, remaining);

                if outcome == WaitOutcome::Signaled && state.is_blocking() {
                    continue;
                }
                if !state.is_blocking() {
                    let moved = side.nonblocking(&mut state, done..bytes);
                    self.changed.notify_all();
                    return Ok(finish(&mut state, done + moved, bytes) / element_size);
                }
                if chunk <= side.ready(&state) {
                    break;
                }
                trace!(
                    direction = side.name(),
                    requested = bytes,
                    transferred = done,
                    ?outcome,
                    "short blocking transfer"
                );
                return Ok(finish(&mut state, done, bytes) / element_size);
            }

            debug_assert_chunk_fits!(chunk, side.ready(&state));
            side.transfer(&mut state, done..done + chunk);
            done += chunk;
            self.changed.notify_all();
        }

        Ok(done / element_size)
    }

    /// Parks on `changed` until notified or the deadline passes.
    fn wait<'a>(
        &self,
        mut state: MutexGuard<'a, RingState>,
        deadline: &mut Deadline,
    ) -> (MutexGuard<'a, RingState>, WaitOutcome) {
        state.record(|m| m.waits += 1);

        match deadline.remaining() {
            None => match self.changed.wait(state) {
                Ok(state) => (state, WaitOutcome::Signaled),
                Err(poisoned) => {
                    warn!(error = %POISONED_WAIT, "blocking wait abandoned");
                    (poisoned.into_inner(), WaitOutcome::Failed)
                }
            },
            Some(left) if left.is_zero() => (state, WaitOutcome::TimedOut),
            Some(left) => match self.changed.wait_timeout(state, left) {
                Ok((state, result)) if result.timed_out() => (state, WaitOutcome::TimedOut),
                Ok((state, _)) => (state, WaitOutcome::Signaled),
                Err(poisoned) => {
                    warn!(error = %POISONED_WAIT, "blocking wait abandoned");
                    (poisoned.into_inner().0, WaitOutcome::Failed)
                }
            },
        }
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Drops all buffered data and re-enables blocking.
    ///
    /// Wakes every waiter.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.reset();
        self.changed.notify_all();
        debug!("ring buffer reset");
    }

    /// Disables blocking for this session.
    ///
    /// Every blocking call in progress or issued later behaves like its
    /// non-blocking counterpart until [`reset`](Self::reset). Buffered data
    /// is kept, so a consumer can drain it while [`is_alive`](Self::is_alive)
    /// holds. Idempotent.
    pub fn end_blocking(&self) {
        let mut state = self.lock();
        state.set_blocking(false);
        self.changed.notify_all();
        debug!(buffered = state.read_size(), "ring buffer blocking ended");
    }

    /// Replaces the storage with room for `capacity` elements of
    /// `element_size` bytes and returns the new size in elements.
    ///
    /// Buffered bytes are kept. The new storage is allocated before the lock
    /// is taken and only swapped in once it is known to hold the buffered
    /// bytes; on any error the buffer is left exactly as it was. A successful
    /// resize re-enables blocking and wakes every waiter.
    ///
    /// Fails with [`RingError::InvalidSize`] for invalid sizes or when the
    /// new usable capacity is smaller than the buffered bytes, and with
    /// [`RingError::AllocationFailure`] if storage cannot be obtained.
    pub fn resize(&self, capacity: usize, element_size: usize) -> Result<usize, RingError> {
        let target = Capacity::for_elements(capacity, element_size)?;
        let storage = self.allocator.allocate(target.bytes()).map_err(|err| {
            warn!(
                bytes = target.bytes(),
                error = %err,
                "resize allocation failed, keeping current storage"
            );
            err
        })?;

        let mut state = self.lock();
        let occupied = state.read_size();
        if occupied > target.usable_bytes() {
            debug!(
                occupied,
                usable = target.usable_bytes(),
                "resize rejected, buffered data does not fit"
            );
            return Err(RingError::InvalidSize {
                reason: "new capacity cannot hold the buffered bytes",
            });
        }

        let previous = state.capacity();
        state.replace_storage(target, storage);
        self.changed.notify_all();

        debug!(
            from_bytes = previous.bytes(),
            to_bytes = target.bytes(),
            element_size = target.element_size(),
            "ring buffer resized"
        );
        Ok(target.elements())
    }

    // ---------------------------------------------------------------------
    // QUERIES
    // ---------------------------------------------------------------------
    //
    // Each query takes the lock once and returns a point-in-time snapshot.

    /// Returns `true` if no data is buffered.
    pub fn is_empty(&self) -> bool {
        self.lock().read_size() == 0
    }

    /// Returns `true` if no byte can be written without overwriting.
    pub fn is_full(&self) -> bool {
        self.lock().write_size() == 0
    }

    /// Returns `true` while the stream may still yield data: blocking is
    /// enabled or data is buffered.
    pub fn is_alive(&self) -> bool {
        let state = self.lock();
        state.is_blocking() || state.read_size() > 0
    }

    /// Returns `true` if blocking is enabled.
    pub fn still_blocking(&self) -> bool {
        self.lock().is_blocking()
    }

    /// Storage size in elements.
    pub fn size(&self) -> usize {
        self.lock().capacity().elements()
    }

    /// Storage size in bytes.
    pub fn byte_size(&self) -> usize {
        self.lock().capacity().bytes()
    }

    pub fn element_size(&self) -> usize {
        self.lock().capacity().element_size()
    }

    /// Elements that can be read.
    pub fn read_avail(&self) -> usize {
        let state = self.lock();
        state.read_size() / state.capacity().element_size()
    }

    pub fn read_avail_bytes(&self) -> usize {
        self.lock().read_size()
    }

    /// Elements that can be written without overwriting.
    pub fn write_avail(&self) -> usize {
        let state = self.lock();
        state.write_size() / state.capacity().element_size()
    }

    pub fn write_avail_bytes(&self) -> usize {
        self.lock().write_size()
    }

    /// Returns a snapshot of the transfer counters.
    ///
    /// All zero unless the buffer was built with `enable_metrics`.
    pub fn metrics(&self) -> Metrics {
        self.lock().metrics()
    }
}

impl<A: StorageAllocator> fmt::Debug for RingBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("RingBuffer");
        match self.state.try_lock() {
            Ok(state) => out
                .field("byte_size", &state.capacity().bytes())
                .field("element_size", &state.capacity().element_size())
                .field("buffered", &state.read_size())
                .field("blocking", &state.is_blocking()),
            Err(_) => out.field("state", &"<locked>"),
        };
        out.finish_non_exhaustive()
    }
}

const POISONED_WAIT: RingError = RingError::SystemFailure("lock poisoned during wait");

/// The caller's data slice for one blocking call.
enum Side<'d> {
    Write(&'d [u8]),
    Read(&'d mut [u8]),
}

impl Side<'_> {
    fn len(&self) -> usize {
        match self {
            Side::Write(src) => src.len(),
            Side::Read(dst) => dst.len(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Side::Write(_) => "write",
            Side::Read(_) => "read",
        }
    }

    /// Bytes this side can move right now without losing data.
    fn ready(&self, state: &RingState) -> usize {
        match self {
            Side::Write(_) => state.write_size(),
            Side::Read(_) => state.read_size(),
        }
    }

    /// Moves exactly `range`; the caller has checked that it fits.
    fn transfer(&mut self, state: &mut RingState, range: Range<usize>) {
        let moved = range.len() as u64;
        match self {
            Side::Write(src) => {
                state.raw_write(&src[range]);
                state.record(|m| m.bytes_written += moved);
            }
            Side::Read(dst) => {
                state.raw_read(&mut dst[range]);
                state.record(|m| m.bytes_read += moved);
            }
        }
    }

    /// Non-blocking semantics for `range`; returns bytes moved.
    fn nonblocking(&mut self, state: &mut RingState, range: Range<usize>) -> usize {
        match self {
            Side::Write(src) => overwrite(state, &src[range]),
            Side::Read(dst) => drain(state, &mut dst[range]),
        }
    }
}

/// Converts an element count to bytes and checks it against the caller's slice.
fn transfer_bytes(state: &RingState, len: usize, provided: usize) -> Result<usize, RingError> {
    let needed = len
        .checked_mul(state.capacity().element_size())
        .ok_or_else(|| {
            debug!(len, "transfer length overflows usize");
            RingError::InvalidSize {
                reason: "transfer length overflows usize",
            }
        })?;
    if provided < needed {
        debug!(needed, provided, "data buffer too short for transfer");
        return Err(RingError::ShortBuffer {
            needed,
            actual: provided,
        });
    }
    Ok(needed)
}

/// Largest chunk a blocking call may move in one step.
///
/// Never zero: a one-byte ring has no usable space, and a zero chunk would
/// spin instead of waiting.
fn chunk_bytes(state: &RingState, remaining: usize) -> usize {
    remaining.min(state.capacity().usable_bytes()).max(1)
}

/// Writes all of `src`, overwriting unread data if needed.
fn overwrite(state: &mut RingState, src: &[u8]) -> usize {
    let free = state.write_size();
    state.raw_write(src);
    let written = src.len() as u64;
    let overwritten = src.len().saturating_sub(free) as u64;
    state.record(|m| {
        m.bytes_written += written;
        m.bytes_overwritten += overwritten;
    });
    src.len()
}

/// Reads as much of `dst` as is buffered.
fn drain(state: &mut RingState, dst: &mut [u8]) -> usize {
    let n = dst.len().min(state.read_size());
    state.raw_read(&mut dst[..n]);
    state.record(|m| m.bytes_read += n as u64);
    n
}

fn finish(state: &mut RingState, done: usize, requested: usize) -> usize {
    if done < requested {
        state.record(|m| m.short_transfers += 1);
    }
    done
}
