//! # Fibonacci Backoff
//!
//! Retry delays for devices whose configuration keeps failing on the host.
//! Delays grow along the Fibonacci sequence (1, 1, 2, 3, 5, 8, ... times the
//! base step) up to a cap, which backs off more gently than doubling.

use std::time::Duration;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// First delay, and the unit of the sequence
    step: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Sequence `step, step, 2*step, 3*step, 5*step, ...` capped at `max`
    #[must_use]
    pub fn new(step: Duration, max: Duration) -> Self {
        Self {
            step,
            prev: Duration::ZERO,
            current: step.min(max),
            max,
        }
    }

    /// Returns the current delay and advances the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = (self.prev + self.current).min(self.max);
        self.prev = self.current;
        self.current = next;
        result
    }

    /// Restarts the sequence after a success
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.step.min(self.max);
    }
}
