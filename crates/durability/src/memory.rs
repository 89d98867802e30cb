//! In-memory transaction log.
//!
//! Never touches disk and reports zero force statistics. Useful as an
//! always-succeeding stub, for measuring harness overhead, and (with a
//! failure budget) for exercising partial-failure paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use txlog_core::{LogError, LogMark, LogResult, TransactionLog, Xid};

/// A [`TransactionLog`] that only counts.
#[derive(Debug, Default)]
pub struct MemoryLog {
    started: bool,
    prepares: AtomicU64,
    commits: AtomicU64,
    failed_prepares: AtomicU64,
    /// Prepares beyond this many fail with `LogError::Injected`
    prepare_budget: Option<u64>,
    prepare_delay: Option<Duration>,
}

impl MemoryLog {
    /// A log where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every prepare after the first `limit` (0 fails all of them).
    pub fn fail_prepares_after(mut self, limit: u64) -> Self {
        self.prepare_budget = Some(limit);
        self
    }

    /// Sleep for `delay` inside every prepare.
    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = Some(delay);
        self
    }

    /// Successful prepares so far.
    pub fn prepares(&self) -> u64 {
        self.prepares.load(Ordering::Acquire)
    }

    /// Successful commits so far.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    /// Prepares rejected by the failure budget.
    pub fn failed_prepares(&self) -> u64 {
        self.failed_prepares.load(Ordering::Acquire)
    }
}

impl TransactionLog for MemoryLog {
    fn prepare(&self, _xid: &Xid, _names: &[String]) -> LogResult<LogMark> {
        if !self.started {
            return Err(LogError::NotStarted);
        }
        if let Some(delay) = self.prepare_delay {
            thread::sleep(delay);
        }
        if let Some(limit) = self.prepare_budget {
            // Count the attempt first so concurrent callers cannot all slip under the limit
            let attempt = self.prepares.fetch_add(1, Ordering::AcqRel) + 1;
            if attempt > limit {
                self.prepares.fetch_sub(1, Ordering::AcqRel);
                self.failed_prepares.fetch_add(1, Ordering::AcqRel);
                return Err(LogError::Injected(format!(
                    "prepare {} exceeds budget of {}",
                    attempt, limit
                )));
            }
            return Ok(LogMark::new(attempt));
        }
        let sequence = self.prepares.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(LogMark::new(sequence))
    }

    fn commit(&self, _xid: &Xid, mark: LogMark) -> LogResult<()> {
        if !self.started {
            return Err(LogError::NotStarted);
        }
        if mark.sequence() == 0 {
            return Err(LogError::UnknownMark(0));
        }
        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn average_force_time_micros(&self) -> u64 {
        0
    }

    fn average_bytes_per_force(&self) -> u64 {
        0
    }

    fn stats_report(&self) -> String {
        format!(
            "<log-stats><prepares>{}</prepares><commits>{}</commits><failed-prepares>{}</failed-prepares></log-stats>",
            self.prepares(),
            self.commits(),
            self.failed_prepares()
        )
    }

    fn start(&mut self) -> LogResult<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> LogResult<()> {
        self.started = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(log: MemoryLog) -> MemoryLog {
        let mut log = log;
        log.start().unwrap();
        log
    }

    #[test]
    fn test_requires_start() {
        let log = MemoryLog::new();
        assert!(matches!(
            log.prepare(&Xid::zeroed(), &[]),
            Err(LogError::NotStarted)
        ));
    }

    #[test]
    fn test_counts_prepares_and_commits() {
        let log = started(MemoryLog::new());
        let xid = Xid::zeroed();
        for _ in 0..3 {
            let mark = log.prepare(&xid, &[]).unwrap();
            log.commit(&xid, mark).unwrap();
        }
        assert_eq!(log.prepares(), 3);
        assert_eq!(log.commits(), 3);
        assert!(log.stats_report().contains("<commits>3</commits>"));
    }

    #[test]
    fn test_failure_budget() {
        let log = started(MemoryLog::new().fail_prepares_after(2));
        let xid = Xid::zeroed();
        assert!(log.prepare(&xid, &[]).is_ok());
        assert!(log.prepare(&xid, &[]).is_ok());
        assert!(matches!(
            log.prepare(&xid, &[]),
            Err(LogError::Injected(_))
        ));
        assert_eq!(log.prepares(), 2);
        assert_eq!(log.failed_prepares(), 1);
    }

    #[test]
    fn test_zero_budget_fails_everything() {
        let log = started(MemoryLog::new().fail_prepares_after(0));
        assert!(log.prepare(&Xid::zeroed(), &[]).is_err());
        assert_eq!(log.prepares(), 0);
    }

    #[test]
    fn test_zero_force_stats() {
        let log = MemoryLog::new();
        assert_eq!(log.average_force_time_micros(), 0);
        assert_eq!(log.average_bytes_per_force(), 0);
    }
}
