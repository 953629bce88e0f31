//! Interrupt-side pulse record shared with the polling controller.
//!
//! Each field is an independent word-sized atomic. The interrupt handler is the
//! only incrementer of the count and the only writer of the timestamp; the
//! controller is the only party that resets them. The three fields are not
//! updated as a group, so a poll may briefly observe a timestamp that is one
//! pulse ahead of the count. The next poll sees the settled values.
//!
//! Ordering inside [`PulseRecorder::record_pulse`] is timestamp, count, flag:
//! once the controller observes the flag it also observes a timestamp at least
//! as recent as the pulse that raised it.
//!
//! [`PulseRecorder::reset`] clears everything unconditionally. Edges recorded
//! between reading a burst and resetting it are dropped; on the DFAM those are
//! the trigger echoes of the correction pulses themselves.

use core::time::Duration;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::time::PulseInstant;

/// Pulses seen since the last resync, as observed by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PendingBurst {
    pub count: u32,
    pub last_pulse: PulseInstant,
}

/// Burst read by the controller when its timeout fires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseBurst {
    pub count: u32,
    pub since_last: Duration,
}

/// Lock-free pulse counter written from interrupt context.
#[derive(Debug)]
pub struct PulseRecorder {
    armed: AtomicBool,
    detected: AtomicBool,
    count: AtomicU32,
    last_pulse_ms: AtomicU32,
}

impl PulseRecorder {
    /// Creates a disarmed recorder suitable for a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            detected: AtomicBool::new(false),
            count: AtomicU32::new(0),
            last_pulse_ms: AtomicU32::new(0),
        }
    }

    /// Starts accepting pulses.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stops accepting pulses. Already recorded pulses are kept.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Records one falling edge observed at `at`.
    ///
    /// Runs in interrupt context: constant time, no blocking. Returns `false`
    /// when the recorder is not armed yet and the edge was ignored.
    pub fn record_pulse(&self, at: PulseInstant) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            return false;
        }

        self.last_pulse_ms.store(at.as_millis(), Ordering::Release);
        self.count.fetch_add(1, Ordering::AcqRel);
        self.detected.store(true, Ordering::Release);
        true
    }

    /// Returns the burst in progress, if any pulse arrived since the last reset.
    #[must_use]
    pub fn pending(&self) -> Option<PendingBurst> {
        if !self.detected.load(Ordering::Acquire) {
            return None;
        }

        Some(PendingBurst {
            count: self.count.load(Ordering::Acquire),
            last_pulse: PulseInstant::from_millis(self.last_pulse_ms.load(Ordering::Acquire)),
        })
    }

    /// Idle time since the most recent pulse, or `None` when no burst is pending.
    #[must_use]
    pub fn idle_for(&self, now: PulseInstant) -> Option<Duration> {
        self.pending().map(|burst| now.elapsed_since(burst.last_pulse))
    }

    /// Reads the burst as it stands at `now` without clearing it.
    #[must_use]
    pub fn burst(&self, now: PulseInstant) -> PulseBurst {
        let count = self.count.load(Ordering::Acquire);
        let last_pulse = PulseInstant::from_millis(self.last_pulse_ms.load(Ordering::Acquire));
        PulseBurst {
            count,
            since_last: now.elapsed_since(last_pulse),
        }
    }

    /// Zeroes the count and clears the detected flag, discarding any pulses
    /// recorded since the burst was read.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        self.detected.store(false, Ordering::Release);
    }

    /// Raw pulse count, for status displays.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Raw detected flag, for status displays.
    #[must_use]
    pub fn pulse_detected(&self) -> bool {
        self.detected.load(Ordering::Acquire)
    }
}

impl Default for PulseRecorder {
    fn default() -> Self {
        Self::new()
    }
}
