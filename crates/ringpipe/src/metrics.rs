/// Optional counters for monitoring buffer traffic.
///
/// Collected under the buffer lock when [`Config::enable_metrics`] is set;
/// [`RingBuffer::metrics`] returns a point-in-time copy.
///
/// [`Config::enable_metrics`]: crate::Config::enable_metrics
/// [`RingBuffer::metrics`]: crate::RingBuffer::metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Bytes written past the free space by non-blocking writes
    pub bytes_overwritten: u64,
    /// Blocking calls that returned fewer elements than requested
    pub short_transfers: u64,
    /// Condition waits entered by blocking calls
    pub waits: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}
