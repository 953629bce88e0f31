//! Deficit arithmetic that walks the sequencer to its cycle boundary.
//!
//! After a burst of `count` input pulses the sequencer sits `count mod steps`
//! positions into its cycle. Sending `steps - (count mod steps)` more pulses
//! completes the cycle, so the result is always within `1..=steps`. A burst that
//! is already an exact multiple of `steps` therefore receives a full extra
//! cycle unless the configuration opts into [`AlignedBurst::Skip`].

use crate::config::Steps;

/// Treatment of bursts whose length is an exact multiple of the cycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AlignedBurst {
    /// Send a full cycle of `steps` pulses (the device's shipped behavior).
    #[default]
    FullCycle,
    /// Send nothing; the sequencer is already on a cycle boundary.
    Skip,
}

/// Pulses needed to complete the current cycle, in `1..=steps`.
#[must_use]
pub fn deficit_pulses(pulse_count: u32, steps: Steps) -> u32 {
    let steps = steps.as_u32();
    steps - (pulse_count % steps)
}

/// Output pulses for a finished burst under the given policy.
#[must_use]
pub fn output_pulses_for(pulse_count: u32, steps: Steps, policy: AlignedBurst) -> u32 {
    let deficit = deficit_pulses(pulse_count, steps);
    match policy {
        AlignedBurst::Skip if deficit == steps.as_u32() => 0,
        _ => deficit,
    }
}

/// Pulses sent at power-on to park a freshly reset sequencer on its last step.
#[must_use]
pub fn pre_position_pulses(steps: Steps) -> u32 {
    steps.as_u32() - 1
}
