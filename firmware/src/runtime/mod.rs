use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use resetter_core::config::ResetterConfig;
use resetter_core::controller::ResetController;
use resetter_core::recorder::PulseRecorder;

use crate::hw::{EmbassyClock, GateOutput};
use crate::status::StatusBoard;

mod pulse_task;
mod resync_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

/// Raised once startup has pre-positioned the sequencer.
pub(super) type ArmSignal = Signal<CriticalSectionRawMutex, ()>;

const CONFIG: ResetterConfig = ResetterConfig::DEFAULT;

pub(super) static RECORDER: PulseRecorder = PulseRecorder::new();
pub(super) static ARMED: ArmSignal = Signal::new();
pub(super) static STATUS: StatusBoard = StatusBoard::new();

/// Runs the pulse task above the thread executor so edges are counted while
/// the resync task blocks inside an emission.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn USART3_4_5_6_LPUART1() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals { PA0, PA1, EXTI0, .. } = hal::init(config);

    CONFIG.validate().expect("resetter configuration");

    let trigger = ExtiInput::new(PA0, EXTI0, Pull::Up);
    let output = GateOutput::new(Output::new(PA1, Level::Low, Speed::Low));
    let controller = ResetController::new(CONFIG, &RECORDER, output, EmbassyClock);

    interrupt::USART3_4_5_6_LPUART1.set_priority(Priority::P1);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::USART3_4_5_6_LPUART1);
    high_spawner
        .spawn(pulse_task::run(trigger, &RECORDER, &ARMED))
        .expect("failed to spawn pulse recorder task");

    spawner
        .spawn(resync_task::run(controller, &ARMED, &STATUS))
        .expect("failed to spawn resync task");

    core::future::pending::<()>().await;
}
