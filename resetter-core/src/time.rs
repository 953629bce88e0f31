//! Millisecond timestamps shared by the recorder, emitter, and controller.
//!
//! The device counts milliseconds since boot in a 32-bit word so the recorder
//! can publish a timestamp with a single atomic store. Arithmetic wraps, which
//! keeps elapsed-time checks correct across the ~49 day rollover as long as
//! the compared instants are less than half a wrap apart.

use core::{
    fmt,
    ops::{Add, AddAssign},
    time::Duration,
};

/// Monotonic millisecond instant (wraps at `u32::MAX`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PulseInstant(u32);

impl PulseInstant {
    /// Instant at boot.
    pub const ZERO: Self = Self(0);

    /// Builds an instant from raw milliseconds since boot.
    #[must_use]
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond counter.
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Time elapsed since `earlier`.
    ///
    /// An `earlier` that is actually ahead of `self` (a pulse stamped after the
    /// caller sampled the clock) reads as zero rather than as a near-full wrap.
    #[must_use]
    pub fn elapsed_since(self, earlier: Self) -> Duration {
        let delta = self.0.wrapping_sub(earlier.0);
        if delta > u32::MAX / 2 {
            return Duration::ZERO;
        }
        Duration::from_millis(u64::from(delta))
    }

    /// Advances the instant by `duration`, wrapping on overflow.
    #[must_use]
    pub fn wrapping_add(self, duration: Duration) -> Self {
        Self(self.0.wrapping_add(duration_to_millis(duration)))
    }
}

impl Add<Duration> for PulseInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.wrapping_add(rhs)
    }
}

impl AddAssign<Duration> for PulseInstant {
    fn add_assign(&mut self, rhs: Duration) {
        *self = self.wrapping_add(rhs);
    }
}

impl fmt::Display for PulseInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Converts a duration to whole milliseconds, truncating anything past `u32::MAX`.
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_since_handles_rollover() {
        let before = PulseInstant::from_millis(u32::MAX - 9);
        let after = before + Duration::from_millis(25);
        assert_eq!(after.as_millis(), 15);
        assert_eq!(after.elapsed_since(before), Duration::from_millis(25));
    }

    #[test]
    fn instant_ahead_of_now_reads_as_zero_elapsed() {
        let now = PulseInstant::from_millis(5_000);
        let stamped_later = PulseInstant::from_millis(5_001);
        assert_eq!(now.elapsed_since(stamped_later), Duration::ZERO);

        let now = PulseInstant::from_millis(u32::MAX);
        let stamped_after_rollover = now + Duration::from_millis(1);
        assert_eq!(now.elapsed_since(stamped_after_rollover), Duration::ZERO);
    }

    #[test]
    fn sub_millisecond_durations_truncate() {
        let start = PulseInstant::from_millis(10);
        assert_eq!(start + Duration::from_micros(999), start);
    }
}
