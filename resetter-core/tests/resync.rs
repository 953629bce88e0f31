use core::time::Duration;

use critical_section as _;
use resetter_core::bench::{PulseTrace, TraceOutput, VirtualClock};
use resetter_core::config::{DEFAULT_AUTO_RESET_TIME, ResetterConfig, Steps};
use resetter_core::controller::ResetController;
use resetter_core::emitter::PulseOutput;
use resetter_core::recorder::PulseRecorder;
use resetter_core::time::PulseInstant;

fn poll_until<F>(clock: &VirtualClock<'_>, limit: Duration, mut poll: F) -> Option<PulseInstant>
where
    F: FnMut() -> bool,
{
    let deadline = clock.now() + limit;
    while clock.now().as_millis() < deadline.as_millis() {
        let polled_at = clock.now();
        if poll() {
            return Some(polled_at);
        }
        clock.advance(Duration::from_millis(1));
    }
    None
}

#[test]
fn timeout_waits_for_strictly_more_than_window() {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::with_input(&recorder);
    let trace = PulseTrace::new();
    let mut controller = ResetController::new(
        ResetterConfig::DEFAULT,
        &recorder,
        TraceOutput::new(&trace, &clock),
        &clock,
    );
    controller.startup();

    let last_pulse = clock.now() + Duration::from_millis(10);
    clock.schedule_pulse(last_pulse).expect("schedule pulse");
    clock.advance_to(last_pulse);

    assert!(!controller.timeout_reached(last_pulse + DEFAULT_AUTO_RESET_TIME));
    assert!(controller.timeout_reached(
        last_pulse + DEFAULT_AUTO_RESET_TIME + Duration::from_millis(1)
    ));

    let fired_at = poll_until(&clock, Duration::from_secs(5), || {
        controller.poll().is_some()
    })
    .expect("resync fired");
    assert_eq!(
        fired_at,
        last_pulse + DEFAULT_AUTO_RESET_TIME + Duration::from_millis(1)
    );
}

#[test]
fn each_pulse_rearms_the_window() {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::with_input(&recorder);
    let trace = PulseTrace::new();
    let mut controller = ResetController::new(
        ResetterConfig::DEFAULT,
        &recorder,
        TraceOutput::new(&trace, &clock),
        &clock,
    );
    controller.startup();

    let start = clock.now();
    let mut last = start;
    for gap in [900, 900, 900] {
        last += Duration::from_millis(gap);
        clock.schedule_pulse(last).expect("schedule pulse");
    }

    let fired_at = poll_until(&clock, Duration::from_secs(10), || {
        controller.poll().is_some()
    })
    .expect("resync fired");

    assert_eq!(fired_at, last + Duration::from_millis(1_001));
    let report = controller.history().latest().copied().expect("report");
    assert_eq!(report.input_pulses, 3);
    assert_eq!(report.output_pulses, 5);
    assert_eq!(report.idle_for, Duration::from_millis(1_001));
}

#[test]
fn resync_with_empty_burst_sends_full_cycle_and_resets() {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::new();
    let trace = PulseTrace::new();
    let config = ResetterConfig::DEFAULT.with_steps(Steps::new(6).expect("valid steps"));
    let mut controller =
        ResetController::new(config, &recorder, TraceOutput::new(&trace, &clock), &clock);
    controller.startup();
    let after_startup = trace.pulses();

    let first = controller.resync();
    let second = controller.resync();

    assert_eq!(first.input_pulses, 0);
    assert_eq!(first.output_pulses, 6);
    assert_eq!(second.output_pulses, 6);
    assert_eq!(trace.pulses(), after_startup + 12);
    assert_eq!(recorder.count(), 0);
    assert!(!recorder.pulse_detected());
    assert_eq!(controller.history().total(), 2);
}

#[test]
fn pulses_during_emission_are_discarded() {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::with_input(&recorder);
    let trace = PulseTrace::new();
    let mut controller = ResetController::new(
        ResetterConfig::DEFAULT,
        &recorder,
        TraceOutput::new(&trace, &clock),
        &clock,
    );
    controller.startup();

    let burst_start = clock.now() + Duration::from_millis(5);
    for index in 0..5u32 {
        clock
            .schedule_pulse(burst_start + Duration::from_millis(u64::from(index) * 20))
            .expect("schedule pulse");
    }
    let last_in_burst = burst_start + Duration::from_millis(80);
    let timeout_at = last_in_burst + Duration::from_millis(1_001);

    // Two stray edges land while the three-pulse deficit (600 ms) is going out.
    clock
        .schedule_pulse(timeout_at + Duration::from_millis(150))
        .expect("schedule pulse");
    clock
        .schedule_pulse(timeout_at + Duration::from_millis(420))
        .expect("schedule pulse");

    clock.advance_to(timeout_at);
    let report = controller.poll().expect("resync fired");
    assert_eq!(report.input_pulses, 5);
    assert_eq!(report.output_pulses, 3);

    assert_eq!(clock.now(), timeout_at + Duration::from_millis(600));
    assert_eq!(clock.scheduled(), 0);
    assert_eq!(recorder.count(), 0);
    assert!(!recorder.pulse_detected());

    let followup = poll_until(&clock, Duration::from_secs(5), || {
        controller.poll().is_some()
    });
    assert_eq!(followup, None);
    assert_eq!(controller.history().total(), 1);
}

/// Output line that also echoes each rising edge back into the recorder, the
/// way the DFAM raises TRIGGER on every advance it is clocked through.
struct EchoOutput<'a> {
    line: TraceOutput<'a, VirtualClock<'a>>,
    recorder: &'a PulseRecorder,
    clock: &'a VirtualClock<'a>,
}

impl PulseOutput for EchoOutput<'_> {
    fn set_active(&mut self) {
        self.line.set_active();
        self.recorder.record_pulse(self.clock.now());
    }

    fn set_inactive(&mut self) {
        self.line.set_inactive();
    }
}

#[test]
fn trigger_echo_of_correction_pulses_settles_after_one_resync() {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::with_input(&recorder);
    let trace = PulseTrace::new();
    let output = EchoOutput {
        line: TraceOutput::new(&trace, &clock),
        recorder: &recorder,
        clock: &clock,
    };
    let mut controller = ResetController::new(ResetterConfig::DEFAULT, &recorder, output, &clock);

    let startup = controller.startup();
    assert_eq!(startup.pre_position.pulses, 7);
    assert_eq!(recorder.count(), 0, "pre-position echoes land before arming");

    let mut at = clock.now();
    for _ in 0..5 {
        at += Duration::from_millis(125);
        clock.schedule_pulse(at).expect("schedule pulse");
    }

    let end = clock.now() + Duration::from_secs(60);
    while clock.now().as_millis() < end.as_millis() {
        controller.poll();
        clock.advance(Duration::from_millis(1));
    }

    let history = controller.history();
    assert_eq!(history.total(), 1);
    let report = history.latest().copied().expect("report");
    assert_eq!(report.input_pulses, 5);
    assert_eq!(report.output_pulses, 3);
    assert_eq!(trace.pulses(), 7 + 3);
    assert_eq!(recorder.count(), 0);
    assert!(!recorder.pulse_detected());
}
