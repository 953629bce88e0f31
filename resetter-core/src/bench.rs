//! Virtual bench for host tooling: a stepped clock and an output-line trace.
//!
//! [`VirtualClock`] advances in one millisecond ticks and delivers scheduled
//! input pulses to a [`PulseRecorder`] as it goes, which is how the host side
//! reproduces the interrupt handler firing while the emitter is blocked.
//! Nothing here allocates, so it builds alongside the rest of the `no_std` crate.

use core::cell::{Cell, RefCell};
use core::fmt;
use core::time::Duration;

use heapless::Deque;

use crate::emitter::{PulseClock, PulseOutput};
use crate::recorder::PulseRecorder;
use crate::time::{PulseInstant, duration_to_millis};

/// Upper bound on input pulses waiting for delivery.
pub const MAX_SCHEDULED_PULSES: usize = 256;

/// Reasons a pulse could not be scheduled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleError {
    /// The arrival precedes a pulse that is already queued.
    OutOfOrder(PulseInstant),
    /// The arrival queue is full.
    QueueFull,
    /// The clock has no recorder to deliver pulses to.
    NoInput,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::OutOfOrder(at) => write!(f, "pulse at {at} precedes a queued pulse"),
            ScheduleError::QueueFull => write!(
                f,
                "no more than {MAX_SCHEDULED_PULSES} pulses may be queued at once"
            ),
            ScheduleError::NoInput => f.write_str("clock has no input line attached"),
        }
    }
}

/// Millisecond clock advanced explicitly by the caller or by blocking holds.
pub struct VirtualClock<'r> {
    now: Cell<PulseInstant>,
    input: Option<&'r PulseRecorder>,
    arrivals: RefCell<Deque<PulseInstant, MAX_SCHEDULED_PULSES>>,
}

impl<'r> VirtualClock<'r> {
    /// Clock starting at boot with no input line attached.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Cell::new(PulseInstant::ZERO),
            input: None,
            arrivals: RefCell::new(Deque::new()),
        }
    }

    /// Clock that feeds scheduled pulses into `recorder`.
    #[must_use]
    pub const fn with_input(recorder: &'r PulseRecorder) -> Self {
        Self {
            now: Cell::new(PulseInstant::ZERO),
            input: Some(recorder),
            arrivals: RefCell::new(Deque::new()),
        }
    }

    #[must_use]
    pub fn now(&self) -> PulseInstant {
        self.now.get()
    }

    /// Queues an input pulse for delivery once the clock reaches `at`.
    ///
    /// Pulses due at or before the current instant are delivered immediately.
    pub fn schedule_pulse(&self, at: PulseInstant) -> Result<(), ScheduleError> {
        let recorder = self.input.ok_or(ScheduleError::NoInput)?;
        let mut arrivals = self.arrivals.borrow_mut();

        if let Some(last) = arrivals.back()
            && at.as_millis() < last.as_millis()
        {
            return Err(ScheduleError::OutOfOrder(at));
        }

        if arrivals.is_empty() && at.as_millis() <= self.now.get().as_millis() {
            recorder.record_pulse(self.now.get());
            return Ok(());
        }

        arrivals.push_back(at).map_err(|_| ScheduleError::QueueFull)
    }

    /// Number of pulses still waiting for delivery.
    #[must_use]
    pub fn scheduled(&self) -> usize {
        self.arrivals.borrow().len()
    }

    /// Moves time forward one millisecond at a time, delivering due pulses.
    pub fn advance(&self, duration: Duration) {
        for _ in 0..duration_to_millis(duration) {
            self.now.set(self.now.get() + Duration::from_millis(1));
            self.deliver_due();
        }
    }

    /// Advances until the clock reads `target`. Does nothing if already past it.
    pub fn advance_to(&self, target: PulseInstant) {
        let remaining = target.as_millis().saturating_sub(self.now.get().as_millis());
        self.advance(Duration::from_millis(u64::from(remaining)));
    }

    fn deliver_due(&self) {
        let Some(recorder) = self.input else {
            return;
        };

        let now = self.now.get();
        let mut arrivals = self.arrivals.borrow_mut();
        while let Some(next) = arrivals.front() {
            if next.as_millis() > now.as_millis() {
                break;
            }
            arrivals.pop_front();
            recorder.record_pulse(now);
        }
    }
}

impl Default for VirtualClock<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseClock for VirtualClock<'_> {
    fn now(&self) -> PulseInstant {
        self.now.get()
    }

    fn hold(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

impl PulseClock for &VirtualClock<'_> {
    fn now(&self) -> PulseInstant {
        self.now.get()
    }

    fn hold(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// Logical level of the traced output line.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LineLevel {
    #[default]
    Low,
    High,
}

/// Edge statistics for the output line.
#[derive(Debug, Default)]
pub struct PulseTrace {
    pulses: Cell<u32>,
    level: Cell<LineLevel>,
    last_edge: Cell<Option<PulseInstant>>,
    shortest_high: Cell<Option<Duration>>,
    longest_high: Cell<Option<Duration>>,
    shortest_low: Cell<Option<Duration>>,
}

impl PulseTrace {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pulses: Cell::new(0),
            level: Cell::new(LineLevel::Low),
            last_edge: Cell::new(None),
            shortest_high: Cell::new(None),
            longest_high: Cell::new(None),
            shortest_low: Cell::new(None),
        }
    }

    /// Rising edges seen so far.
    #[must_use]
    pub fn pulses(&self) -> u32 {
        self.pulses.get()
    }

    #[must_use]
    pub fn level(&self) -> LineLevel {
        self.level.get()
    }

    #[must_use]
    pub fn last_edge(&self) -> Option<PulseInstant> {
        self.last_edge.get()
    }

    #[must_use]
    pub fn shortest_high(&self) -> Option<Duration> {
        self.shortest_high.get()
    }

    #[must_use]
    pub fn longest_high(&self) -> Option<Duration> {
        self.longest_high.get()
    }

    /// Shortest low interval between a falling edge and the next rising edge.
    #[must_use]
    pub fn shortest_low(&self) -> Option<Duration> {
        self.shortest_low.get()
    }

    fn rise(&self, at: PulseInstant) {
        if self.level.get() == LineLevel::High {
            return;
        }
        if let Some(fell_at) = self.last_edge.get() {
            let low = at.elapsed_since(fell_at);
            self.shortest_low.set(Some(min_of(self.shortest_low.get(), low)));
        }
        self.level.set(LineLevel::High);
        self.pulses.set(self.pulses.get().wrapping_add(1));
        self.last_edge.set(Some(at));
    }

    fn fall(&self, at: PulseInstant) {
        if self.level.get() == LineLevel::Low {
            return;
        }
        if let Some(rose_at) = self.last_edge.get() {
            let high = at.elapsed_since(rose_at);
            self.shortest_high.set(Some(min_of(self.shortest_high.get(), high)));
            self.longest_high.set(Some(max_of(self.longest_high.get(), high)));
        }
        self.level.set(LineLevel::Low);
        self.last_edge.set(Some(at));
    }
}

fn min_of(current: Option<Duration>, candidate: Duration) -> Duration {
    current.map_or(candidate, |value| value.min(candidate))
}

fn max_of(current: Option<Duration>, candidate: Duration) -> Duration {
    current.map_or(candidate, |value| value.max(candidate))
}

/// Output line that timestamps its edges into a [`PulseTrace`].
pub struct TraceOutput<'a, C> {
    trace: &'a PulseTrace,
    clock: &'a C,
}

impl<'a, C: PulseClock> TraceOutput<'a, C> {
    #[must_use]
    pub const fn new(trace: &'a PulseTrace, clock: &'a C) -> Self {
        Self { trace, clock }
    }
}

impl<C: PulseClock> PulseOutput for TraceOutput<'_, C> {
    fn set_active(&mut self) {
        self.trace.rise(self.clock.now());
    }

    fn set_inactive(&mut self) {
        self.trace.fall(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_delivers_scheduled_pulses_in_order() {
        let recorder = PulseRecorder::new();
        recorder.arm();
        let clock = VirtualClock::with_input(&recorder);

        clock.schedule_pulse(PulseInstant::from_millis(5)).unwrap();
        clock.schedule_pulse(PulseInstant::from_millis(9)).unwrap();
        assert_eq!(clock.scheduled(), 2);

        clock.advance(Duration::from_millis(6));
        assert_eq!(recorder.count(), 1);

        clock.advance_to(PulseInstant::from_millis(20));
        assert_eq!(recorder.count(), 2);
        assert_eq!(
            recorder.pending().map(|burst| burst.last_pulse),
            Some(PulseInstant::from_millis(9))
        );
        assert_eq!(clock.scheduled(), 0);
    }

    #[test]
    fn schedule_rejects_out_of_order_and_missing_input() {
        let recorder = PulseRecorder::new();
        let clock = VirtualClock::with_input(&recorder);
        clock.schedule_pulse(PulseInstant::from_millis(10)).unwrap();
        assert_eq!(
            clock.schedule_pulse(PulseInstant::from_millis(4)),
            Err(ScheduleError::OutOfOrder(PulseInstant::from_millis(4)))
        );

        let detached = VirtualClock::new();
        assert_eq!(
            detached.schedule_pulse(PulseInstant::ZERO),
            Err(ScheduleError::NoInput)
        );
    }

    #[test]
    fn trace_ignores_repeated_levels() {
        let clock = VirtualClock::new();
        let trace = PulseTrace::new();
        let mut output = TraceOutput::new(&trace, &clock);

        output.set_inactive();
        output.set_active();
        output.set_active();
        clock.advance(Duration::from_millis(3));
        output.set_inactive();

        assert_eq!(trace.pulses(), 1);
        assert_eq!(trace.shortest_high(), Some(Duration::from_millis(3)));
        assert_eq!(trace.shortest_low(), None);
    }
}
