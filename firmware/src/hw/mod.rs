//! Board bindings for the resetter's output line and clock.
//!
//! The ADV/CLK output is a push-pull GPIO idling low. Holds busy-wait with
//! `block_for`, so the resync task keeps the thread executor for the whole
//! train while the pulse task, running on the interrupt executor, still
//! preempts it.

use core::time::Duration;

use embassy_stm32::gpio::Output;
use embassy_time::{Instant, block_for};
use resetter_core::emitter::{PulseClock, PulseOutput};
use resetter_core::time::{PulseInstant, duration_to_millis};

/// Sequencer ADV/CLK output.
pub struct GateOutput<'d> {
    pin: Output<'d>,
}

impl<'d> GateOutput<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl PulseOutput for GateOutput<'_> {
    fn set_active(&mut self) {
        self.pin.set_high();
    }

    fn set_inactive(&mut self) {
        self.pin.set_low();
    }
}

/// Embassy's monotonic time base, truncated to wrapping milliseconds.
pub struct EmbassyClock;

impl PulseClock for EmbassyClock {
    fn now(&self) -> PulseInstant {
        now()
    }

    fn hold(&mut self, duration: Duration) {
        let millis = u64::from(duration_to_millis(duration));
        block_for(embassy_time::Duration::from_millis(millis));
    }
}

/// Current instant on the pulse time base.
pub fn now() -> PulseInstant {
    // Wraps with `PulseInstant` after ~49 days of uptime.
    #[allow(clippy::cast_possible_truncation)]
    let millis = Instant::now().as_millis() as u32;
    PulseInstant::from_millis(millis)
}
