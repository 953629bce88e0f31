//! Timing and step configuration for the resetter.
//!
//! The firmware runs with [`ResetterConfig::DEFAULT`]; host tooling builds
//! variants with the `with_*` helpers and checks them with
//! [`ResetterConfig::validate`] before handing them to the controller.

use core::{fmt, time::Duration};

use crate::alignment::AlignedBurst;

/// Hold time of each output phase (high, then low).
pub const DEFAULT_GATE: Duration = Duration::from_millis(100);
/// Idle time after the last input pulse before a resync fires.
pub const DEFAULT_AUTO_RESET_TIME: Duration = Duration::from_millis(1_000);
/// Delay after boot before pre-positioning and input detection begin.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(1_000);
/// Number of positions in the sequencer cycle.
pub const DEFAULT_STEPS: Steps = Steps::MAX;

/// Errors reported while building a configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Step count outside `1..=8`.
    StepsOutOfRange(u8),
    /// Gate duration shorter than one millisecond.
    ZeroGate,
    /// Auto-reset window shorter than one millisecond.
    ZeroAutoResetTime,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::StepsOutOfRange(value) => write!(
                f,
                "steps must be between {} and {}, got {value}",
                Steps::MIN.get(),
                Steps::MAX.get()
            ),
            ConfigError::ZeroGate => f.write_str("gate must be at least 1 ms"),
            ConfigError::ZeroAutoResetTime => {
                f.write_str("auto-reset time must be at least 1 ms")
            }
        }
    }
}

/// Cycle length of the external sequencer, always within `1..=8`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Steps(u8);

impl Steps {
    /// Shortest cycle: every input pulse lands on the boundary.
    pub const MIN: Self = Self(1);
    /// Full eight-step cycle of the DFAM sequencer.
    pub const MAX: Self = Self(8);

    /// Validates a raw step count.
    pub const fn new(value: u8) -> Result<Self, ConfigError> {
        if value >= Self::MIN.0 && value <= Self::MAX.0 {
            Ok(Self(value))
        } else {
            Err(ConfigError::StepsOutOfRange(value))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Step count widened for pulse arithmetic.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        u32::from(self.0)
    }

    /// One fewer step, wrapping from 1 back to 8.
    #[must_use]
    pub const fn decremented_wrapping(self) -> Self {
        if self.0 <= Self::MIN.0 {
            Self::MAX
        } else {
            Self(self.0 - 1)
        }
    }
}

impl Default for Steps {
    fn default() -> Self {
        DEFAULT_STEPS
    }
}

impl TryFrom<u8> for Steps {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable configuration handed to the controller at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResetterConfig {
    pub gate: Duration,
    pub steps: Steps,
    pub auto_reset_time: Duration,
    pub startup_delay: Duration,
    pub aligned_burst: AlignedBurst,
}

impl ResetterConfig {
    /// Values the firmware is built with.
    pub const DEFAULT: Self = Self {
        gate: DEFAULT_GATE,
        steps: DEFAULT_STEPS,
        auto_reset_time: DEFAULT_AUTO_RESET_TIME,
        startup_delay: DEFAULT_STARTUP_DELAY,
        aligned_burst: AlignedBurst::FullCycle,
    };

    #[must_use]
    pub const fn with_gate(mut self, gate: Duration) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub const fn with_steps(mut self, steps: Steps) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub const fn with_auto_reset_time(mut self, auto_reset_time: Duration) -> Self {
        self.auto_reset_time = auto_reset_time;
        self
    }

    #[must_use]
    pub const fn with_startup_delay(mut self, startup_delay: Duration) -> Self {
        self.startup_delay = startup_delay;
        self
    }

    #[must_use]
    pub const fn with_aligned_burst(mut self, aligned_burst: AlignedBurst) -> Self {
        self.aligned_burst = aligned_burst;
        self
    }

    /// Rejects durations that would collapse to zero at millisecond resolution.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.as_millis() == 0 {
            return Err(ConfigError::ZeroGate);
        }
        if self.auto_reset_time.as_millis() == 0 {
            return Err(ConfigError::ZeroAutoResetTime);
        }
        Ok(())
    }
}

impl Default for ResetterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
