//! Monotonic time source used for write deadlines and frame timestamps.
use embassy_time::Instant;

/// Monotonic clock. Readings never go backwards.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Clock backed by the embassy time driver of the target.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
