/// Configuration for [`RingBuffer`](crate::RingBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Requested capacity in elements (rounded up to a power-of-two byte size)
    pub capacity: usize,
    /// Size of one element in bytes
    pub element_size: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, element_size: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            element_size,
            enable_metrics,
        }
    }

    /// Returns the requested capacity in bytes, or `None` on overflow.
    #[inline]
    pub const fn requested_bytes(&self) -> Option<usize> {
        self.capacity.checked_mul(self.element_size)
    }

    /// Enables or disables metrics collection.
    #[must_use]
    pub const fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1 << 16, // 64 KiB of bytes
            element_size: 1,
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (4 KiB, fits in L1 cache)
pub const LOW_LATENCY_CONFIG: Config = Config::new(1 << 12, 1, false);

/// High throughput configuration (1 MiB)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(1 << 20, 1, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_bytes() {
        assert_eq!(Config::new(10, 4, false).requested_bytes(), Some(40));
        assert_eq!(Config::new(usize::MAX, 2, false).requested_bytes(), None);
    }

    #[test]
    fn test_presets() {
        assert_eq!(Config::default().requested_bytes(), Some(65_536));
        assert_eq!(LOW_LATENCY_CONFIG.requested_bytes(), Some(4096));
        assert!(Config::default().with_metrics(true).enable_metrics);
    }
}
