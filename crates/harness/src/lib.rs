//! Concurrent prepare/commit benchmark harness
//!
//! Drives a [`TransactionLog`](txlog_core::TransactionLog) with many workers
//! that start together, measures each run, and sweeps across worker counts:
//!
//! - [`StartStopBarrier`]: start/stop rendezvous between workers and driver
//! - [`StatsAccumulator`]: per-run totals written by workers
//! - [`Worker`]: one thread's prepare/commit loop
//! - [`RunDriver`]: one run, producing a [`RunResult`]
//! - [`SweepController`]: worker-count sweep with overtime cut-off
//! - [`ReportEmitter`]: XML and CSV report streams

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod barrier;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod stats;
pub mod sweep;
pub mod worker;

pub use barrier::{StartStopBarrier, StopSignal};
pub use config::{ConfigError, SweepConfig};
pub use driver::{LogRunExecutor, RunConfiguration, RunDriver, RunExecutor, RunResult};
pub use error::{HarnessError, HarnessResult};
pub use report::{ReportEmitter, NOT_APPLICABLE, TABULAR_HEADER};
pub use stats::{SharedCounters, StatsAccumulator};
pub use sweep::{SweepController, SweepSummary};
pub use worker::Worker;
