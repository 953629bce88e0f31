//! Reset controller: startup pre-positioning and idle-timeout resync.
//!
//! The controller owns the emitter and polls the shared [`PulseRecorder`]. It
//! moves through three phases:
//!
//! - `Startup`: wait out power-on transients, walk the sequencer to its last
//!   step, then arm the recorder.
//! - `Listening`: poll until a burst has been idle for longer than the
//!   auto-reset window.
//! - `Resyncing`: read the burst, emit the deficit, clear the recorder, and
//!   go back to listening.
//!
//! The recorder is cleared *after* the deficit is emitted. The DFAM echoes
//! every advance on its trigger output, including the ones the correction
//! causes, so edges seen during the emission are discarded rather than
//! treated as a new burst.

use core::{fmt, time::Duration};

use crate::alignment::{output_pulses_for, pre_position_pulses};
use crate::config::{ResetterConfig, Steps};
use crate::emitter::{EmissionReport, PulseClock, PulseEmitter, PulseOutput};
use crate::history::ResyncHistory;
use crate::limiter::{FixedSteps, StepLimiter};
use crate::recorder::PulseRecorder;
use crate::time::PulseInstant;

/// Lifecycle phase of the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerPhase {
    Startup,
    Listening,
    Resyncing,
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerPhase::Startup => f.write_str("startup"),
            ControllerPhase::Listening => f.write_str("listening"),
            ControllerPhase::Resyncing => f.write_str("resyncing"),
        }
    }
}

/// Outcome of the one-shot startup routine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StartupReport {
    pub steps: Steps,
    pub pre_position: EmissionReport,
    pub armed_at: PulseInstant,
}

impl fmt::Display for StartupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Startup complete. Sent {} pre-position pulses for {} steps. Listening from {}.",
            self.pre_position.pulses, self.steps, self.armed_at
        )
    }
}

/// Outcome of one timeout handling pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResyncReport {
    pub at: PulseInstant,
    pub input_pulses: u32,
    pub output_pulses: u32,
    pub steps: Steps,
    pub idle_for: Duration,
}

impl fmt::Display for ResyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.output_pulses > 0 {
            write!(
                f,
                "Timeout reached. Input pulses: {}. Sending {} output pulses.",
                self.input_pulses, self.output_pulses
            )
        } else {
            write!(
                f,
                "Timeout reached. Input pulses: {}. No output pulses needed.",
                self.input_pulses
            )
        }
    }
}

/// Polling state machine that keeps the sequencer aligned to its cycle.
pub struct ResetController<'r, O, C, L = FixedSteps> {
    config: ResetterConfig,
    recorder: &'r PulseRecorder,
    emitter: PulseEmitter<O, C>,
    limiter: L,
    phase: ControllerPhase,
    history: ResyncHistory,
}

impl<'r, O, C> ResetController<'r, O, C, FixedSteps>
where
    O: PulseOutput,
    C: PulseClock,
{
    /// Creates a controller whose cycle length comes from `config.steps`.
    #[must_use]
    pub fn new(config: ResetterConfig, recorder: &'r PulseRecorder, output: O, clock: C) -> Self {
        let limiter = FixedSteps(config.steps);
        Self::with_limiter(config, recorder, output, clock, limiter)
    }
}

impl<'r, O, C, L> ResetController<'r, O, C, L>
where
    O: PulseOutput,
    C: PulseClock,
    L: StepLimiter,
{
    /// Creates a controller that asks `limiter` for the cycle length.
    #[must_use]
    pub fn with_limiter(
        config: ResetterConfig,
        recorder: &'r PulseRecorder,
        output: O,
        clock: C,
        limiter: L,
    ) -> Self {
        Self {
            emitter: PulseEmitter::new(output, clock, config.gate),
            config,
            recorder,
            limiter,
            phase: ControllerPhase::Startup,
            history: ResyncHistory::new(),
        }
    }

    /// Runs the power-on routine. Blocks for the startup delay plus the
    /// pre-position train, and leaves the recorder armed.
    pub fn startup(&mut self) -> StartupReport {
        self.phase = ControllerPhase::Startup;
        self.recorder.disarm();
        self.emitter.hold(self.config.startup_delay);

        let steps = self.limiter.steps();
        let pre_position = self.emitter.emit(pre_position_pulses(steps));

        self.recorder.arm();
        self.phase = ControllerPhase::Listening;

        StartupReport {
            steps,
            pre_position,
            armed_at: self.emitter.now(),
        }
    }

    /// `true` once a pending burst has been idle for longer than the window.
    #[must_use]
    pub fn timeout_reached(&self, now: PulseInstant) -> bool {
        self.recorder
            .idle_for(now)
            .is_some_and(|idle| idle > self.config.auto_reset_time)
    }

    /// One non-blocking poll iteration. Resyncs when the timeout is reached.
    pub fn poll(&mut self) -> Option<ResyncReport> {
        if self.phase != ControllerPhase::Listening {
            return None;
        }

        // Sample the burst before the clock so a pulse stamped in between can
        // only look newer than `now`, never a full wrap older.
        let pending = self.recorder.pending()?;
        let idle = self.emitter.now().elapsed_since(pending.last_pulse);
        if idle <= self.config.auto_reset_time {
            return None;
        }

        Some(self.resync())
    }

    /// Timeout handler: read the burst, emit the deficit, then clear the
    /// recorder. Leaves the count at zero and the flag cleared.
    pub fn resync(&mut self) -> ResyncReport {
        self.phase = ControllerPhase::Resyncing;

        let at = self.emitter.now();
        let steps = self.limiter.steps();
        let burst = self.recorder.burst(at);
        let output_pulses = output_pulses_for(burst.count, steps, self.config.aligned_burst);

        if output_pulses > 0 {
            self.emitter.emit(output_pulses);
        }
        self.recorder.reset();

        self.phase = ControllerPhase::Listening;

        let report = ResyncReport {
            at,
            input_pulses: burst.count,
            output_pulses,
            steps,
            idle_for: burst.since_last,
        };
        self.history.record(report);
        report
    }

    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &ResetterConfig {
        &self.config
    }

    #[must_use]
    pub fn history(&self) -> &ResyncHistory {
        &self.history
    }

    /// Current instant on the controller's clock.
    #[must_use]
    pub fn now(&self) -> PulseInstant {
        self.emitter.now()
    }
}
