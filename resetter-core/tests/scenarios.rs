use core::time::Duration;

use critical_section as _;
use resetter_core::alignment::deficit_pulses;
use resetter_core::bench::{PulseTrace, TraceOutput, VirtualClock};
use resetter_core::config::{ResetterConfig, Steps};
use resetter_core::controller::{ResetController, ResyncReport};
use resetter_core::recorder::PulseRecorder;

const PULSE_SPACING: Duration = Duration::from_millis(125);

/// Boots a controller, plays `pulses` input edges, then stays silent for
/// `silence`, returning every resync report and the output pulses they sent.
fn run_burst(steps: Steps, pulses: u32, silence: Duration) -> (Vec<ResyncReport>, u32) {
    let recorder = PulseRecorder::new();
    let clock = VirtualClock::with_input(&recorder);
    let trace = PulseTrace::new();
    let config = ResetterConfig::DEFAULT.with_steps(steps);
    let mut controller =
        ResetController::new(config, &recorder, TraceOutput::new(&trace, &clock), &clock);
    controller.startup();
    let after_startup = trace.pulses();

    let mut at = clock.now();
    for _ in 0..pulses {
        at += PULSE_SPACING;
        clock.schedule_pulse(at).expect("schedule pulse");
    }

    let mut reports = Vec::new();
    let end = at + silence;
    while clock.now().as_millis() < end.as_millis() {
        if let Some(report) = controller.poll() {
            reports.push(report);
        }
        clock.advance(Duration::from_millis(1));
    }

    assert_eq!(recorder.count(), 0, "counter must be reset");
    assert!(!recorder.pulse_detected(), "flag must be cleared");
    (reports, trace.pulses() - after_startup)
}

#[test]
fn five_pulses_on_eight_steps_sends_three() {
    let (reports, emitted) = run_burst(Steps::MAX, 5, Duration::from_secs(3));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].input_pulses, 5);
    assert_eq!(reports[0].output_pulses, 3);
    assert_eq!(emitted, 3);
}

#[test]
fn exact_multiple_sends_a_full_cycle() {
    let (reports, emitted) = run_burst(Steps::MAX, 8, Duration::from_secs(3));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].input_pulses, 8);
    assert_eq!(reports[0].output_pulses, 8);
    assert_eq!(emitted, 8);
}

#[test]
fn silence_without_pulses_never_fires() {
    let (reports, emitted) = run_burst(Steps::MAX, 0, Duration::from_secs(30));
    assert!(reports.is_empty());
    assert_eq!(emitted, 0);
}

#[test]
fn single_step_cycle_always_sends_one() {
    for pulses in [1, 2, 5, 9] {
        let (reports, emitted) = run_burst(Steps::MIN, pulses, Duration::from_secs(3));
        assert_eq!(reports.len(), 1, "pulses={pulses}");
        assert_eq!(reports[0].output_pulses, 1, "pulses={pulses}");
        assert_eq!(emitted, 1, "pulses={pulses}");
    }
}

#[test]
fn every_cycle_length_lands_on_a_boundary() {
    for raw in 1..=8u8 {
        let steps = Steps::new(raw).expect("valid steps");
        for pulses in 1..=17 {
            let (reports, emitted) = run_burst(steps, pulses, Duration::from_millis(2_500));
            assert_eq!(reports.len(), 1, "steps={raw} pulses={pulses}");
            assert_eq!(emitted, deficit_pulses(pulses, steps));
            assert_eq!((pulses + emitted) % u32::from(raw), 0);
        }
    }
}
