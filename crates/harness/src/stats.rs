//! Per-run totals shared by all workers.

use parking_lot::Mutex;
use std::time::Duration;

/// Totals accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedCounters {
    /// Prepare/commit cycles completed by all workers
    pub completed_total_cycles: u64,
    /// Sum of every worker's loop duration
    pub total_worker_duration: Duration,
}

impl SharedCounters {
    /// Sum of worker loop durations in whole milliseconds.
    pub fn total_worker_duration_millis(&self) -> u64 {
        self.total_worker_duration.as_millis() as u64
    }
}

/// Accumulator workers report into once each.
///
/// Both totals change under one lock, so no reader can see a count without
/// its matching duration. Create one per run; there is no reset.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    counters: Mutex<SharedCounters>,
}

impl StatsAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one worker's cycles and loop duration.
    pub fn record(&self, cycles_completed: u64, duration: Duration) {
        let mut counters = self.counters.lock();
        counters.completed_total_cycles += cycles_completed;
        counters.total_worker_duration += duration;
    }

    /// Current totals.
    ///
    /// Only meaningful once the stop barrier has released: that wait is what
    /// orders every worker's `record` before this read.
    pub fn snapshot(&self) -> SharedCounters {
        *self.counters.lock()
    }
}
