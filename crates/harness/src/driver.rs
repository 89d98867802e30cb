//! One benchmark run
//!
//! A run spawns `worker_count` threads against a single log, releases them
//! together, waits for all of them to stop and turns the totals into a
//! [`RunResult`]. Barrier and accumulator are created inside
//! [`RunDriver::execute`], so nothing carries over from one run to the next.

use crate::barrier::StartStopBarrier;
use crate::error::{HarnessError, HarnessResult};
use crate::stats::{SharedCounters, StatsAccumulator};
use crate::worker::Worker;
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use txlog_core::{ActiveLog, LogResult, TransactionLog, Xid};

/// Parameters of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfiguration {
    /// Concurrent workers
    pub worker_count: usize,
    /// Prepare/commit cycles per worker
    pub cycles_per_worker: u64,
    /// Elapsed time above which the run counts as overtime
    pub time_budget_millis: u64,
}

impl RunConfiguration {
    /// Create a run configuration
    pub fn new(worker_count: usize, cycles_per_worker: u64, time_budget_millis: u64) -> Self {
        RunConfiguration {
            worker_count,
            cycles_per_worker,
            time_budget_millis,
        }
    }

    /// Cycles the run should complete if nothing fails
    pub fn expected_total_cycles(&self) -> u64 {
        self.worker_count as u64 * self.cycles_per_worker
    }
}

/// Measurements of one finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Concurrent workers
    pub worker_count: usize,
    /// Cycles each worker attempted
    pub cycles_per_worker: u64,
    /// `worker_count * cycles_per_worker`
    pub expected_total_cycles: u64,
    /// Cycles that finished with a successful commit
    pub completed_total_cycles: u64,
    /// Expected minus completed
    pub missing_cycles: u64,
    /// Wall-clock time from release to last stop
    pub elapsed_millis: u64,
    /// Full-resolution elapsed time
    #[serde(skip)]
    pub elapsed: Duration,
    /// Budget the run was measured against
    pub time_budget_millis: u64,
    /// Completed cycles per second; `None` when no time elapsed
    pub cycles_per_second: Option<u64>,
    /// Log's average force time in microseconds
    pub average_force_time_micros: u64,
    /// Log's average bytes written per force
    pub average_bytes_per_force: u64,
    /// Summed worker loop time divided by completed cycles; `None` when
    /// nothing completed
    pub average_latency_millis: Option<u64>,
    /// Workers whose thread panicked
    pub panicked_workers: usize,
    /// Log statistics fragment, embedded verbatim in the structured report
    pub log_stats: String,
}

impl RunResult {
    /// Derive a result from the raw measurements of a run.
    pub fn from_measurements<L: TransactionLog + ?Sized>(
        config: &RunConfiguration,
        totals: SharedCounters,
        elapsed: Duration,
        panicked_workers: usize,
        log: &L,
    ) -> Self {
        let expected = config.expected_total_cycles();
        let completed = totals.completed_total_cycles;

        let elapsed_micros = elapsed.as_micros();
        let cycles_per_second = if elapsed_micros == 0 {
            None
        } else {
            Some((u128::from(completed) * 1_000_000 / elapsed_micros) as u64)
        };

        let average_latency_millis = if completed == 0 {
            None
        } else {
            Some(totals.total_worker_duration_millis() / completed)
        };

        RunResult {
            worker_count: config.worker_count,
            cycles_per_worker: config.cycles_per_worker,
            expected_total_cycles: expected,
            completed_total_cycles: completed,
            missing_cycles: expected.saturating_sub(completed),
            elapsed_millis: elapsed.as_millis() as u64,
            elapsed,
            time_budget_millis: config.time_budget_millis,
            cycles_per_second,
            average_force_time_micros: log.average_force_time_micros(),
            average_bytes_per_force: log.average_bytes_per_force(),
            average_latency_millis,
            panicked_workers,
            log_stats: log.stats_report(),
        }
    }

    /// Whether the run took strictly longer than its budget
    pub fn is_overtime(&self) -> bool {
        self.elapsed_millis > self.time_budget_millis
    }
}

/// Runs one configuration against a log.
#[derive(Debug, Clone)]
pub struct RunDriver {
    xid: Xid,
    names: Vec<String>,
}

impl Default for RunDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunDriver {
    /// Driver using the zeroed xid and no resource names
    pub fn new() -> Self {
        RunDriver {
            xid: Xid::zeroed(),
            names: Vec::new(),
        }
    }

    /// Use `xid` for every cycle
    pub fn with_xid(mut self, xid: Xid) -> Self {
        self.xid = xid;
        self
    }

    /// Pass `names` to every prepare
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Execute one run against an already started log.
    ///
    /// Worker failures do not fail the run; they show up as missing cycles.
    /// The only error is failing to spawn a worker thread, in which case the
    /// workers already spawned are released without doing any work.
    pub fn execute<L: TransactionLog + ?Sized>(
        &self,
        config: &RunConfiguration,
        log: &L,
    ) -> HarnessResult<RunResult> {
        let barrier = StartStopBarrier::new(config.worker_count);
        let stats = StatsAccumulator::new();

        let (elapsed, panicked) = thread::scope(|s| {
            let mut handles = Vec::with_capacity(config.worker_count);
            for id in 0..config.worker_count {
                let worker = Worker {
                    id,
                    log,
                    xid: &self.xid,
                    names: &self.names,
                    cycles: config.cycles_per_worker,
                    barrier: &barrier,
                    stats: &stats,
                };
                let spawned = thread::Builder::new()
                    .name(format!("txlog-worker-{}", id))
                    .spawn_scoped(s, move || worker.run());
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        error!(target: "txlog::run", worker = id, error = %e, "Failed to spawn worker");
                        barrier.abort();
                        for handle in handles {
                            let _ = handle.join();
                        }
                        return Err(HarnessError::Spawn(e));
                    }
                }
            }

            let started = barrier.release_start();
            let stopped = barrier.wait_for_all_stopped();

            let mut panicked = 0;
            for (id, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    error!(target: "txlog::run", worker = id, "Worker panicked");
                    panicked += 1;
                }
            }
            Ok((stopped.saturating_duration_since(started), panicked))
        })?;

        let result = RunResult::from_measurements(config, stats.snapshot(), elapsed, panicked, log);
        info!(
            target: "txlog::run",
            workers = result.worker_count,
            completed = result.completed_total_cycles,
            missing = result.missing_cycles,
            elapsed_ms = result.elapsed_millis,
            "Run complete"
        );
        Ok(result)
    }
}

/// Executes runs on behalf of a sweep.
pub trait RunExecutor {
    /// Perform one run of `config`
    fn execute(&mut self, config: &RunConfiguration) -> HarnessResult<RunResult>;
}

/// Executor that gives every run a freshly created and started log.
///
/// The log is stopped when the run ends, whether it succeeded or not.
pub struct LogRunExecutor<F> {
    driver: RunDriver,
    factory: F,
}

impl<L, F> LogRunExecutor<F>
where
    L: TransactionLog,
    F: FnMut() -> LogResult<L>,
{
    /// Executor building each run's log with `factory`
    pub fn new(driver: RunDriver, factory: F) -> Self {
        LogRunExecutor { driver, factory }
    }
}

impl<L, F> RunExecutor for LogRunExecutor<F>
where
    L: TransactionLog,
    F: FnMut() -> LogResult<L>,
{
    fn execute(&mut self, config: &RunConfiguration) -> HarnessResult<RunResult> {
        let log = ActiveLog::start((self.factory)()?)?;
        let result = self.driver.execute(config, log.get())?;
        log.stop()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use txlog_core::LogMark;
    use txlog_durability::MemoryLog;

    fn started(log: MemoryLog) -> ActiveLog<MemoryLog> {
        ActiveLog::start(log).unwrap()
    }

    #[test]
    fn test_twenty_workers_fifty_cycles() {
        let log = started(MemoryLog::new());
        let config = RunConfiguration::new(20, 50, 30_000);
        let result = RunDriver::new().execute(&config, log.get()).unwrap();

        assert_eq!(result.expected_total_cycles, 1000);
        assert_eq!(result.completed_total_cycles, 1000);
        assert_eq!(result.missing_cycles, 0);
        assert_eq!(result.panicked_workers, 0);
        assert_eq!(log.prepares(), 1000);
        assert_eq!(log.commits(), 1000);
    }

    #[test]
    fn test_all_workers_fail_immediately() {
        let log = started(MemoryLog::new().fail_prepares_after(0));
        let config = RunConfiguration::new(4, 10, 30_000);
        let result = RunDriver::new().execute(&config, log.get()).unwrap();

        assert_eq!(result.completed_total_cycles, 0);
        assert_eq!(result.missing_cycles, 40);
        assert_eq!(result.average_latency_millis, None);
    }

    #[test]
    fn test_partial_failure_counts_missing() {
        let log = started(MemoryLog::new().fail_prepares_after(15));
        let config = RunConfiguration::new(3, 10, 30_000);
        let result = RunDriver::new().execute(&config, log.get()).unwrap();

        assert_eq!(result.completed_total_cycles, 15);
        assert_eq!(result.missing_cycles, 15);
    }

    #[test]
    fn test_repeated_runs_do_not_leak() {
        let driver = RunDriver::new();
        let config = RunConfiguration::new(5, 20, 30_000);
        for _ in 0..3 {
            let log = started(MemoryLog::new());
            let result = driver.execute(&config, log.get()).unwrap();
            assert_eq!(result.completed_total_cycles, 100);
        }
    }

    #[test]
    fn test_names_reach_the_log() {
        struct NameCheckingLog {
            seen: AtomicUsize,
        }

        impl TransactionLog for NameCheckingLog {
            fn prepare(&self, _xid: &Xid, names: &[String]) -> LogResult<LogMark> {
                assert_eq!(names, ["orders".to_string()]);
                self.seen.fetch_add(1, Ordering::SeqCst);
                Ok(LogMark::new(0))
            }
            fn commit(&self, _xid: &Xid, _mark: LogMark) -> LogResult<()> {
                Ok(())
            }
            fn average_force_time_micros(&self) -> u64 {
                7
            }
            fn average_bytes_per_force(&self) -> u64 {
                512
            }
            fn stats_report(&self) -> String {
                "<stats/>".to_string()
            }
            fn start(&mut self) -> LogResult<()> {
                Ok(())
            }
            fn stop(&mut self) -> LogResult<()> {
                Ok(())
            }
        }

        let log = NameCheckingLog {
            seen: AtomicUsize::new(0),
        };
        let driver = RunDriver::new().with_names(vec!["orders".to_string()]);
        let result = driver
            .execute(&RunConfiguration::new(2, 5, 1000), &log)
            .unwrap();

        assert_eq!(log.seen.load(Ordering::SeqCst), 10);
        assert_eq!(result.average_force_time_micros, 7);
        assert_eq!(result.average_bytes_per_force, 512);
        assert_eq!(result.log_stats, "<stats/>");
    }

    #[test]
    fn test_derived_fields() {
        let config = RunConfiguration::new(2, 10, 100);
        let totals = SharedCounters {
            completed_total_cycles: 20,
            total_worker_duration: Duration::from_millis(400),
        };
        let log = MemoryLog::new();
        let result =
            RunResult::from_measurements(&config, totals, Duration::from_millis(200), 0, &log);

        assert_eq!(result.elapsed_millis, 200);
        assert_eq!(result.cycles_per_second, Some(100));
        assert_eq!(result.average_latency_millis, Some(20));
        assert!(result.is_overtime());
    }

    #[test]
    fn test_zero_elapsed_has_no_throughput() {
        let config = RunConfiguration::new(1, 1, 100);
        let totals = SharedCounters {
            completed_total_cycles: 1,
            total_worker_duration: Duration::ZERO,
        };
        let log = MemoryLog::new();
        let result = RunResult::from_measurements(&config, totals, Duration::ZERO, 0, &log);
        assert_eq!(result.cycles_per_second, None);
        assert_eq!(result.average_latency_millis, Some(0));
        assert!(!result.is_overtime());
    }

    #[test]
    fn test_budget_boundary_is_not_overtime() {
        let config = RunConfiguration::new(1, 1, 100);
        let log = MemoryLog::new();
        let result = RunResult::from_measurements(
            &config,
            SharedCounters::default(),
            Duration::from_millis(100),
            0,
            &log,
        );
        assert!(!result.is_overtime());
    }

    #[test]
    fn test_executor_creates_fresh_log_per_run() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let mut executor = LogRunExecutor::new(RunDriver::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(MemoryLog::new())
        });

        let config = RunConfiguration::new(3, 4, 1000);
        for _ in 0..2 {
            let result = executor.execute(&config).unwrap();
            assert_eq!(result.completed_total_cycles, 12);
        }
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_executor_surfaces_factory_error() {
        let mut executor = LogRunExecutor::new(RunDriver::new(), || -> LogResult<MemoryLog> {
            Err(txlog_core::LogError::Injected("no log".into()))
        });
        let err = executor
            .execute(&RunConfiguration::new(1, 1, 1000))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Log(_)));
    }

    #[test]
    fn test_result_serializes_without_raw_duration() {
        let config = RunConfiguration::new(1, 1, 100);
        let log = MemoryLog::new();
        let result = RunResult::from_measurements(
            &config,
            SharedCounters::default(),
            Duration::from_millis(5),
            0,
            &log,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("elapsed").is_none());
        assert_eq!(json["elapsed_millis"], 5);
        assert!(json["average_latency_millis"].is_null());
    }
}
