//! Time source for the scan loop

use embassy_time::Instant;

/// Monotonic clock read once per scanned input
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The embassy-time driver clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
