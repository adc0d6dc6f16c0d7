//! Error types for ring buffer operations.

use thiserror::Error;

/// Errors that can occur in ring buffer operations.
///
/// Timeouts and shutdown are not errors: a blocking call that gives up early
/// returns `Ok(n)` with `n` smaller than the requested length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The data slice cannot hold the requested number of elements.
    #[error("data buffer too short: {needed} bytes required, {actual} provided")]
    ShortBuffer {
        /// Bytes required by the requested element count.
        needed: usize,
        /// Bytes actually provided by the caller.
        actual: usize,
    },

    /// A capacity, element size or length is out of range.
    #[error("invalid size: {reason}")]
    InvalidSize {
        /// What was wrong with the size.
        reason: &'static str,
    },

    /// Storage could not be allocated.
    #[error("failed to allocate {bytes} bytes of ring storage")]
    AllocationFailure {
        /// Size of the allocation that failed.
        bytes: usize,
    },

    /// The wait primitive reported an error.
    #[error("system failure: {0}")]
    SystemFailure(&'static str),
}

impl RingError {
    /// Returns `true` if the error was caused by the arguments of the call.
    #[inline]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::ShortBuffer { .. } | Self::InvalidSize { .. })
    }

    /// Returns `true` if the buffer is still usable after this error.
    ///
    /// Only a failed `init` leaves nothing behind; every error returned by an
    /// existing buffer leaves its state untouched.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SystemFailure(_))
    }
}
