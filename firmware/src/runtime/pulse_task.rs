use embassy_stm32::exti::ExtiInput;
use resetter_core::recorder::PulseRecorder;

use super::ArmSignal;
use crate::hw;

/// Counts falling edges on the trigger input once startup has finished.
#[embassy_executor::task]
pub async fn run(
    mut trigger: ExtiInput<'static>,
    recorder: &'static PulseRecorder,
    armed: &'static ArmSignal,
) -> ! {
    armed.wait().await;
    defmt::info!("recorder: listening for trigger pulses");

    loop {
        trigger.wait_for_falling_edge().await;
        let at = hw::now();
        if recorder.record_pulse(at) {
            defmt::debug!("recorder: pulse {} at {}ms", recorder.count(), at.as_millis());
        } else {
            defmt::warn!("recorder: pulse dropped while disarmed");
        }
    }
}
