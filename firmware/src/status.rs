#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status counters for the firmware target.
//!
//! The resync task records every startup and resync here so the defmt log can
//! report running totals without the controller exposing its history across
//! tasks.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use resetter_core::controller::{ResyncReport, StartupReport};
use resetter_core::time::PulseInstant;

/// Point-in-time copy of the counters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub listening: bool,
    pub resyncs: u32,
    pub input_pulses: u32,
    pub output_pulses: u32,
    pub last_resync: Option<PulseInstant>,
}

/// Lock-free counters shared between tasks.
pub struct StatusBoard {
    listening: AtomicBool,
    resyncs: AtomicU32,
    input_pulses: AtomicU32,
    output_pulses: AtomicU32,
    /// Raised with the first resync; `last_resync_ms` is meaningless before it.
    resynced: AtomicBool,
    last_resync_ms: AtomicU32,
}

impl StatusBoard {
    pub const fn new() -> Self {
        Self {
            listening: AtomicBool::new(false),
            resyncs: AtomicU32::new(0),
            input_pulses: AtomicU32::new(0),
            output_pulses: AtomicU32::new(0),
            resynced: AtomicBool::new(false),
            last_resync_ms: AtomicU32::new(0),
        }
    }

    /// Counts the pre-position train and marks the controller as listening.
    pub fn record_startup(&self, report: &StartupReport) {
        self.output_pulses
            .fetch_add(report.pre_position.pulses, Ordering::Relaxed);
        self.listening.store(true, Ordering::Release);
    }

    pub fn record_resync(&self, report: &ResyncReport) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
        self.input_pulses
            .fetch_add(report.input_pulses, Ordering::Relaxed);
        self.output_pulses
            .fetch_add(report.output_pulses, Ordering::Relaxed);
        self.last_resync_ms
            .store(report.at.as_millis(), Ordering::Relaxed);
        self.resynced.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            listening: self.listening.load(Ordering::Acquire),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            input_pulses: self.input_pulses.load(Ordering::Relaxed),
            output_pulses: self.output_pulses.load(Ordering::Relaxed),
            last_resync: self.last_resync(),
        }
    }

    fn last_resync(&self) -> Option<PulseInstant> {
        self.resynced
            .load(Ordering::Acquire)
            .then(|| PulseInstant::from_millis(self.last_resync_ms.load(Ordering::Relaxed)))
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
