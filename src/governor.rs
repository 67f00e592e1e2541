//! Adaptive rate governor
//!
//! A single shared inter-call delay, consulted between per-block
//! operations and between chunked log queries. Shrinks on clean ticks,
//! grows on errors, bounded on both ends. Retry backoff inside the
//! retry executor is separate and unaffected.

use std::time::Duration;
use tracing::debug;

/// Delay multiplier applied after a tick with errors.
const GROWTH_FACTOR: f64 = 1.5;
/// Delay multiplier applied after a clean tick that processed blocks.
const DECAY_FACTOR: f64 = 0.8;

/// Adaptive inter-call delay, bounded to [min_delay, max_delay].
#[derive(Debug, Clone)]
pub struct RateGovernor {
    delay: Duration,
    min_delay: Duration,
    max_delay: Duration,
}

impl RateGovernor {
    /// Create a governor starting at the minimum delay.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            delay: min_delay,
            min_delay,
            max_delay,
        }
    }

    /// Current inter-call delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Shrink the delay after a tick with zero errors and at least one
    /// block processed.
    pub fn on_success(&mut self) {
        let shrunk = self.delay.mul_f64(DECAY_FACTOR);
        self.delay = shrunk.max(self.min_delay);
        debug!("rate governor delay now {:?}", self.delay);
    }

    /// Grow the delay after any error.
    pub fn on_error(&mut self) {
        let grown = self.delay.mul_f64(GROWTH_FACTOR);
        self.delay = grown.min(self.max_delay);
        debug!("rate governor delay now {:?}", self.delay);
    }

    /// Await the current delay.
    pub async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}
