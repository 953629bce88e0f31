//! Blocking pulse train on the sequencer's ADV/CLK input.
//!
//! Each pulse drives the output active for one gate period and inactive for
//! another, so `n` pulses occupy the line for `n * 2 * gate`. The emitter
//! blocks its caller for the full train; only the interrupt-side recorder keeps
//! running underneath it.

use core::time::Duration;

use crate::time::PulseInstant;

/// Abstraction over the physical output line.
pub trait PulseOutput {
    /// Drives the line to its active (high) level.
    fn set_active(&mut self);

    /// Returns the line to its idle (low) level.
    fn set_inactive(&mut self);
}

/// Monotonic clock with a blocking hold.
pub trait PulseClock {
    /// Current millisecond instant.
    fn now(&self) -> PulseInstant;

    /// Blocks the caller for `duration`.
    fn hold(&mut self, duration: Duration);
}

impl<T: PulseOutput + ?Sized> PulseOutput for &mut T {
    fn set_active(&mut self) {
        (**self).set_active();
    }

    fn set_inactive(&mut self) {
        (**self).set_inactive();
    }
}

impl<T: PulseClock + ?Sized> PulseClock for &mut T {
    fn now(&self) -> PulseInstant {
        (**self).now()
    }

    fn hold(&mut self, duration: Duration) {
        (**self).hold(duration);
    }
}

/// Summary of one completed pulse train.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EmissionReport {
    pub pulses: u32,
    pub started_at: PulseInstant,
    pub finished_at: PulseInstant,
}

impl EmissionReport {
    /// Wall time the train occupied the output line.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.finished_at.elapsed_since(self.started_at)
    }
}

/// Emits gated pulse trains through a [`PulseOutput`] using a [`PulseClock`].
pub struct PulseEmitter<O, C> {
    output: O,
    clock: C,
    gate: Duration,
}

impl<O, C> PulseEmitter<O, C>
where
    O: PulseOutput,
    C: PulseClock,
{
    /// Creates an emitter and parks the output at its idle level.
    #[must_use]
    pub fn new(mut output: O, clock: C, gate: Duration) -> Self {
        output.set_inactive();
        Self {
            output,
            clock,
            gate,
        }
    }

    /// Sends `count` pulses, blocking for `count * 2 * gate`.
    pub fn emit(&mut self, count: u32) -> EmissionReport {
        let started_at = self.clock.now();
        for _ in 0..count {
            self.output.set_active();
            self.clock.hold(self.gate);
            self.output.set_inactive();
            self.clock.hold(self.gate);
        }

        EmissionReport {
            pulses: count,
            started_at,
            finished_at: self.clock.now(),
        }
    }

    /// Blocks without touching the output line.
    pub fn hold(&mut self, duration: Duration) {
        self.clock.hold(duration);
    }

    #[must_use]
    pub fn now(&self) -> PulseInstant {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{LineLevel, PulseTrace, TraceOutput, VirtualClock};

    #[test]
    fn zero_pulses_return_immediately() {
        let clock = VirtualClock::new();
        let trace = PulseTrace::new();
        let mut emitter =
            PulseEmitter::new(TraceOutput::new(&trace, &clock), &clock, Duration::from_millis(100));

        let report = emitter.emit(0);
        assert_eq!(report.pulses, 0);
        assert_eq!(report.duration(), Duration::ZERO);
        assert_eq!(trace.pulses(), 0);
        assert_eq!(clock.now(), PulseInstant::ZERO);
    }

    #[test]
    fn each_phase_holds_for_one_gate() {
        let clock = VirtualClock::new();
        let trace = PulseTrace::new();
        let mut emitter =
            PulseEmitter::new(TraceOutput::new(&trace, &clock), &clock, Duration::from_millis(100));

        let report = emitter.emit(3);
        assert_eq!(report.pulses, 3);
        assert_eq!(report.duration(), Duration::from_millis(600));
        assert_eq!(trace.pulses(), 3);
        assert_eq!(trace.level(), LineLevel::Low);
        assert_eq!(trace.shortest_high(), Some(Duration::from_millis(100)));
        assert_eq!(trace.longest_high(), Some(Duration::from_millis(100)));
        assert_eq!(trace.shortest_low(), Some(Duration::from_millis(100)));
    }
}
