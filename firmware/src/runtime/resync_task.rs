use defmt::Display2Format;
use embassy_time::Timer;
use resetter_core::controller::ResetController;

use super::ArmSignal;
use crate::hw::{EmbassyClock, GateOutput};
use crate::status::StatusBoard;

const POLL_INTERVAL_MS: u64 = 1;

type Controller = ResetController<'static, GateOutput<'static>, EmbassyClock>;

#[embassy_executor::task]
pub async fn run(
    mut controller: Controller,
    armed: &'static ArmSignal,
    status: &'static StatusBoard,
) -> ! {
    let startup = controller.startup();
    status.record_startup(&startup);
    defmt::info!("{}", Display2Format(&startup));
    armed.signal(());

    loop {
        if let Some(report) = controller.poll() {
            status.record_resync(&report);
            defmt::info!("{}", Display2Format(&report));

            let totals = status.snapshot();
            defmt::debug!(
                "resync #{}: {} input / {} output pulses since boot",
                totals.resyncs,
                totals.input_pulses,
                totals.output_pulses
            );
        }

        Timer::after_millis(POLL_INTERVAL_MS).await;
    }
}
