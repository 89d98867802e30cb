//! Transaction log capability set
//!
//! The harness drives a log only through [`TransactionLog`]. Implementations
//! must make `prepare` and `commit` safe to call from many threads at once;
//! the harness imposes no locking of its own around them.

use crate::error::LogResult;
use crate::xid::Xid;
use std::ops::Deref;
use tracing::warn;

/// Opaque handle returned by `prepare` and handed back to `commit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogMark(u64);

impl LogMark {
    /// Wrap a log-assigned record sequence number
    pub fn new(sequence: u64) -> Self {
        LogMark(sequence)
    }

    /// Record sequence number of the prepare this mark refers to
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// A two-phase transaction log
///
/// Thread safety: `prepare`, `commit` and the statistics queries take `&self`
/// and are called concurrently by every worker in a run.
pub trait TransactionLog: Send + Sync {
    /// Journal a pending commit for `xid` over the named resources
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if the log is not started.
    fn prepare(&self, xid: &Xid, names: &[String]) -> LogResult<LogMark>;

    /// Finalize the record previously returned by `prepare`
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, on an unknown mark, or if the log is
    /// not started.
    fn commit(&self, xid: &Xid, mark: LogMark) -> LogResult<()>;

    /// Average time spent per force, in microseconds
    fn average_force_time_micros(&self) -> u64;

    /// Average number of bytes made durable per force
    fn average_bytes_per_force(&self) -> u64;

    /// Free-form statistics fragment, embedded verbatim in structured reports
    fn stats_report(&self) -> String;

    /// Acquire the log's resources
    ///
    /// # Errors
    ///
    /// Returns an error if files or buffers cannot be set up.
    fn start(&mut self) -> LogResult<()>;

    /// Release the log's resources, forcing anything still pending
    ///
    /// # Errors
    ///
    /// Returns an error if the final force or close fails.
    fn stop(&mut self) -> LogResult<()>;
}

/// A started log that is stopped when dropped
///
/// Use [`ActiveLog::stop`] to observe the stop result; the `Drop` path only
/// logs it.
pub struct ActiveLog<L: TransactionLog> {
    log: L,
    stopped: bool,
}

impl<L: TransactionLog> ActiveLog<L> {
    /// Start `log` and take ownership of its lifecycle
    pub fn start(mut log: L) -> LogResult<Self> {
        log.start()?;
        Ok(ActiveLog {
            log,
            stopped: false,
        })
    }

    /// Borrow the running log
    pub fn get(&self) -> &L {
        &self.log
    }

    /// Stop the log now and report the outcome
    pub fn stop(mut self) -> LogResult<()> {
        self.stopped = true;
        self.log.stop()
    }
}

impl<L: TransactionLog> Deref for ActiveLog<L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.log
    }
}

impl<L: TransactionLog> Drop for ActiveLog<L> {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.log.stop() {
                warn!(target: "txlog::log", error = %e, "Failed to stop transaction log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Lifecycle {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct CountingLog {
        lifecycle: Arc<Lifecycle>,
        fail_start: bool,
    }

    impl TransactionLog for CountingLog {
        fn prepare(&self, _xid: &Xid, _names: &[String]) -> LogResult<LogMark> {
            Ok(LogMark::new(1))
        }

        fn commit(&self, _xid: &Xid, _mark: LogMark) -> LogResult<()> {
            Ok(())
        }

        fn average_force_time_micros(&self) -> u64 {
            0
        }

        fn average_bytes_per_force(&self) -> u64 {
            0
        }

        fn stats_report(&self) -> String {
            String::new()
        }

        fn start(&mut self) -> LogResult<()> {
            if self.fail_start {
                return Err(LogError::Injected("start".to_string()));
            }
            self.lifecycle.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> LogResult<()> {
            self.lifecycle.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting(fail_start: bool) -> (CountingLog, Arc<Lifecycle>) {
        let lifecycle = Arc::new(Lifecycle::default());
        (
            CountingLog {
                lifecycle: Arc::clone(&lifecycle),
                fail_start,
            },
            lifecycle,
        )
    }

    #[test]
    fn test_drop_stops_log() {
        let (log, lifecycle) = counting(false);
        {
            let active = ActiveLog::start(log).unwrap();
            assert!(active.prepare(&Xid::zeroed(), &[]).is_ok());
            assert_eq!(lifecycle.stops.load(Ordering::SeqCst), 0);
        }
        assert_eq!(lifecycle.starts.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_stop_runs_once() {
        let (log, lifecycle) = counting(false);
        let active = ActiveLog::start(log).unwrap();
        active.stop().unwrap();
        assert_eq!(lifecycle.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_start_never_stops() {
        let (log, lifecycle) = counting(true);
        assert!(ActiveLog::start(log).is_err());
        assert_eq!(lifecycle.stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_log_mark_orders_by_sequence() {
        assert!(LogMark::new(1) < LogMark::new(2));
        assert_eq!(LogMark::new(9).sequence(), 9);
    }
}
