use std::time::{Duration, Instant};
use tracing::debug;

/// One absolute deadline per blocking call.
///
/// The relative timeout is turned into an `Instant` on the first wait and
/// reused for every later wait of the same call, so the total time a call
/// spends blocked is bounded by one timeout, not one timeout per iteration.
#[derive(Debug)]
pub(crate) struct Deadline {
    timeout: Option<Duration>,
    at: Option<Instant>,
}

impl Deadline {
    /// `None` waits without a bound.
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        Self { timeout, at: None }
    }

    /// Time left before the deadline, or `None` for an unbounded wait.
    ///
    /// Returns `Duration::ZERO` once the deadline has passed. A timeout the
    /// monotonic clock cannot represent is waited out as an unbounded wait.
    pub(crate) fn remaining(&mut self) -> Option<Duration> {
        let timeout = self.timeout?;
        let now = Instant::now();
        let at = match self.at {
            Some(at) => at,
            None => match now.checked_add(timeout) {
                Some(at) => *self.at.insert(at),
                None => {
                    debug!(?timeout, "timeout past the end of the clock, waiting unbounded");
                    self.timeout = None;
                    return None;
                }
            },
        };
        Some(at.saturating_duration_since(now))
    }
}
