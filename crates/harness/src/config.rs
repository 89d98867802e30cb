//! Sweep configuration
//!
//! A sweep runs every worker count in `min_worker_count..=max_worker_count`
//! (stepping by `worker_count_step`), `repetition_count` times each. Every
//! worker performs `xid_count` prepare/commit cycles per run.

use std::time::Duration;

/// Default cycles per worker
pub const DEFAULT_XID_COUNT: u64 = 50;
/// Default smallest worker count
pub const DEFAULT_MIN_WORKER_COUNT: usize = 20;
/// Default largest worker count
pub const DEFAULT_MAX_WORKER_COUNT: usize = 40;
/// Default worker count increment
pub const DEFAULT_WORKER_COUNT_STEP: usize = 20;
/// Default repetitions per worker count
pub const DEFAULT_REPETITION_COUNT: usize = 1;
/// Default per-run time budget in seconds
pub const DEFAULT_MAX_TIME_SECONDS: u64 = 30;

/// Parameters of a whole sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Prepare/commit cycles each worker performs per run
    pub xid_count: u64,
    /// First worker count
    pub min_worker_count: usize,
    /// Last worker count (inclusive)
    pub max_worker_count: usize,
    /// Worker count increment
    pub worker_count_step: usize,
    /// Runs per worker count
    pub repetition_count: usize,
    /// Runs slower than this count as overtime
    pub max_time: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            xid_count: DEFAULT_XID_COUNT,
            min_worker_count: DEFAULT_MIN_WORKER_COUNT,
            max_worker_count: DEFAULT_MAX_WORKER_COUNT,
            worker_count_step: DEFAULT_WORKER_COUNT_STEP,
            repetition_count: DEFAULT_REPETITION_COUNT,
            max_time: Duration::from_secs(DEFAULT_MAX_TIME_SECONDS),
        }
    }
}

impl SweepConfig {
    /// Set cycles per worker
    pub fn with_xid_count(mut self, count: u64) -> Self {
        self.xid_count = count;
        self
    }

    /// Set the worker count range (inclusive) and step
    pub fn with_workers(mut self, min: usize, max: usize, step: usize) -> Self {
        self.min_worker_count = min;
        self.max_worker_count = max;
        self.worker_count_step = step;
        self
    }

    /// Set repetitions per worker count
    pub fn with_repetitions(mut self, count: usize) -> Self {
        self.repetition_count = count;
        self
    }

    /// Set the per-run time budget
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Per-run time budget in milliseconds
    pub fn time_budget_millis(&self) -> u64 {
        self.max_time.as_millis() as u64
    }

    /// Worker counts the sweep will visit, in order
    pub fn worker_counts(&self) -> impl Iterator<Item = usize> {
        (self.min_worker_count..=self.max_worker_count).step_by(self.worker_count_step.max(1))
    }

    /// Runs in a full sweep, saturating at `usize::MAX`
    pub fn run_count(&self) -> usize {
        if self.max_worker_count < self.min_worker_count {
            return 0;
        }
        let counts = (self.max_worker_count - self.min_worker_count) / self.worker_count_step.max(1) + 1;
        counts.saturating_mul(self.repetition_count)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.worker_count_step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.max_worker_count < self.min_worker_count {
            return Err(ConfigError::InvertedRange {
                min: self.min_worker_count,
                max: self.max_worker_count,
            });
        }
        if self.xid_count == 0 {
            return Err(ConfigError::ZeroCycles);
        }
        if self.repetition_count == 0 {
            return Err(ConfigError::ZeroRepetitions);
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Worker counts must be positive
    #[error("Minimum worker count must be at least 1")]
    ZeroWorkers,

    /// A zero step would never reach the end of the range
    #[error("Worker count step must be at least 1")]
    ZeroStep,

    /// The range is empty
    #[error("Maximum worker count {max} is below minimum {min}")]
    InvertedRange {
        /// Configured minimum
        min: usize,
        /// Configured maximum
        max: usize,
    },

    /// Cycles per worker must be positive
    #[error("Xid count must be at least 1")]
    ZeroCycles,

    /// Repetitions must be positive
    #[error("Repetition count must be at least 1")]
    ZeroRepetitions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.xid_count, 50);
        assert_eq!(config.min_worker_count, 20);
        assert_eq!(config.max_worker_count, 40);
        assert_eq!(config.worker_count_step, 20);
        assert_eq!(config.repetition_count, 1);
        assert_eq!(config.time_budget_millis(), 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_worker_counts_inclusive() {
        let config = SweepConfig::default();
        assert_eq!(config.worker_counts().collect::<Vec<_>>(), vec![20, 40]);

        let config = SweepConfig::default().with_workers(1, 10, 3);
        assert_eq!(config.worker_counts().collect::<Vec<_>>(), vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_run_count() {
        assert_eq!(SweepConfig::default().run_count(), 2);
        let config = SweepConfig::default().with_workers(1, 10, 3).with_repetitions(3);
        assert_eq!(config.run_count(), 12);
        let huge = SweepConfig::default()
            .with_workers(1, usize::MAX, 1)
            .with_repetitions(2);
        assert_eq!(huge.run_count(), usize::MAX);
    }

    #[test]
    fn test_validate_rejects_zero_step() {
        let config = SweepConfig::default().with_workers(1, 10, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroStep));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = SweepConfig::default().with_workers(0, 10, 1);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = SweepConfig::default().with_workers(10, 5, 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange { min: 10, max: 5 })
        );
    }

    #[test]
    fn test_validate_rejects_zero_cycles_and_reps() {
        assert_eq!(
            SweepConfig::default().with_xid_count(0).validate(),
            Err(ConfigError::ZeroCycles)
        );
        assert_eq!(
            SweepConfig::default().with_repetitions(0).validate(),
            Err(ConfigError::ZeroRepetitions)
        );
    }
}
