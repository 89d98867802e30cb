//! A single load-generating worker.

use crate::barrier::{StartStopBarrier, StopSignal};
use crate::stats::StatsAccumulator;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use txlog_core::{TransactionLog, Xid};

/// Reports a worker's progress and signals stop when dropped.
///
/// Lives for the whole of [`Worker::run`], so partial progress is recorded
/// and the driver is released on normal return, on a log failure and on
/// panic alike. Recording happens before the stop signal: the driver reads
/// the accumulator as soon as the last stop arrives.
struct CompletionGuard<'a> {
    stats: &'a StatsAccumulator,
    completed: u64,
    started: Option<Instant>,
    finished: Option<Instant>,
    // Fields drop after `drop` has run, so stop follows the record
    _stop: StopSignal<'a>,
}

impl CompletionGuard<'_> {
    fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self
                .finished
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.stats.record(self.completed, self.elapsed());
    }
}

/// One worker of a run: `cycles` prepare/commit pairs against a shared log.
pub struct Worker<'a, L: TransactionLog + ?Sized> {
    /// Index of this worker within the run
    pub id: usize,
    /// Log shared by every worker in the run
    pub log: &'a L,
    /// Transaction identifier used for every cycle
    pub xid: &'a Xid,
    /// Resource names passed to every prepare
    pub names: &'a [String],
    /// Cycles to attempt
    pub cycles: u64,
    /// Run barrier
    pub barrier: &'a StartStopBarrier,
    /// Run accumulator
    pub stats: &'a StatsAccumulator,
}

impl<L: TransactionLog + ?Sized> Worker<'_, L> {
    /// Register, wait for release, run the cycles, then report.
    ///
    /// A prepare or commit failure ends this worker's loop early; the cycles
    /// it completed are still reported and the run carries on.
    pub fn run(self) {
        let mut guard = CompletionGuard {
            stats: self.stats,
            completed: 0,
            started: None,
            finished: None,
            _stop: self.barrier.stop_guard(),
        };

        if !self.barrier.register_and_wait_for_start() {
            debug!(target: "txlog::worker", worker = self.id, "Run aborted before start");
            return;
        }

        guard.started = Some(Instant::now());
        for _ in 0..self.cycles {
            let outcome = self
                .log
                .prepare(self.xid, self.names)
                .and_then(|mark| self.log.commit(self.xid, mark));
            if let Err(e) = outcome {
                warn!(
                    target: "txlog::worker",
                    worker = self.id,
                    completed = guard.completed,
                    error = %e,
                    "Worker stopped after log failure"
                );
                break;
            }
            guard.completed += 1;
        }
        guard.finished = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use txlog_durability::MemoryLog;

    fn started_log(log: MemoryLog) -> MemoryLog {
        let mut log = log;
        txlog_core::TransactionLog::start(&mut log).unwrap();
        log
    }

    fn run_one(log: &MemoryLog, cycles: u64) -> (StatsAccumulator, StartStopBarrier) {
        let barrier = StartStopBarrier::new(1);
        let stats = StatsAccumulator::new();
        let xid = Xid::zeroed();
        thread::scope(|s| {
            s.spawn(|| {
                Worker {
                    id: 0,
                    log,
                    xid: &xid,
                    names: &[],
                    cycles,
                    barrier: &barrier,
                    stats: &stats,
                }
                .run()
            });
            barrier.release_start();
            barrier.wait_for_all_stopped();
        });
        (stats, barrier)
    }

    #[test]
    fn test_worker_completes_all_cycles() {
        let log = started_log(MemoryLog::new());
        let (stats, barrier) = run_one(&log, 25);
        assert_eq!(stats.snapshot().completed_total_cycles, 25);
        assert_eq!(barrier.stopped_count(), 1);
        assert_eq!(log.commits(), 25);
    }

    #[test]
    fn test_failure_reports_partial_progress() {
        let log = started_log(MemoryLog::new().fail_prepares_after(7));
        let (stats, barrier) = run_one(&log, 25);
        assert_eq!(stats.snapshot().completed_total_cycles, 7);
        assert_eq!(barrier.stopped_count(), 1);
    }

    #[test]
    fn test_immediate_failure_still_signals_stop() {
        let log = started_log(MemoryLog::new().fail_prepares_after(0));
        let (stats, barrier) = run_one(&log, 10);
        assert_eq!(stats.snapshot().completed_total_cycles, 0);
        assert_eq!(barrier.stopped_count(), 1);
    }

    #[test]
    fn test_aborted_worker_does_no_work() {
        let log = started_log(MemoryLog::new());
        let barrier = StartStopBarrier::new(2);
        let stats = StatsAccumulator::new();
        let xid = Xid::zeroed();
        barrier.abort();
        Worker {
            id: 0,
            log: &log,
            xid: &xid,
            names: &[],
            cycles: 5,
            barrier: &barrier,
            stats: &stats,
        }
        .run();
        assert_eq!(log.prepares(), 0);
        assert_eq!(stats.snapshot(), Default::default());
        assert_eq!(barrier.stopped_count(), 1);
    }
}
