//! Bounded log of recent resync events.

use heapless::{HistoryBuf, OldestOrdered};

use crate::controller::ResyncReport;

/// Number of resync reports retained.
pub const RESYNC_HISTORY_CAPACITY: usize = 16;

/// Ring of the most recent resync reports, oldest entries overwritten first.
pub struct ResyncHistory {
    ring: HistoryBuf<ResyncReport, RESYNC_HISTORY_CAPACITY>,
    total: u32,
}

impl ResyncHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            total: 0,
        }
    }

    pub fn record(&mut self, report: ResyncReport) {
        self.total = self.total.wrapping_add(1);
        self.ring.write(report);
    }

    #[must_use]
    pub fn latest(&self) -> Option<&ResyncReport> {
        self.ring.recent()
    }

    /// Retained reports in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, ResyncReport> {
        self.ring.oldest_ordered()
    }

    /// Retained reports (at most [`RESYNC_HISTORY_CAPACITY`]).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Resyncs handled since boot, including ones no longer retained.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }
}

impl Default for ResyncHistory {
    fn default() -> Self {
        Self::new()
    }
}
