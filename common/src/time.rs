//! Time utilities and constants for the currency service.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Service timing constants.
pub mod constants {
    use super::Duration;

    /// How long fetched rates stay fresh (1 hour).
    pub fn rate_cache_duration() -> Duration {
        Duration::hours(1)
    }

    /// Upstream rate fetch timeout (5 seconds).
    pub fn rate_fetch_timeout() -> std::time::Duration {
        std::time::Duration::from_millis(5000)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the current wall time.
    pub fn starting_now() -> Self {
        Self::new(now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    /// Jump to an instant.
    pub fn set(&self, to: Timestamp) {
        *self.current.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}
