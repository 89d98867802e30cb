//! txlog-bench - Concurrent prepare/commit benchmark for transaction logs
//!
//! Drives a transaction log with many workers that start together, measures
//! each run, and sweeps across worker counts, writing XML and CSV reports.
//!
//! # Quick Start
//!
//! ```ignore
//! use txlog_bench::{LogRunExecutor, MemoryLog, ReportEmitter, RunDriver, SweepConfig, SweepController};
//!
//! let controller = SweepController::new(SweepConfig::default())?;
//! let mut executor = LogRunExecutor::new(RunDriver::new(), || Ok(MemoryLog::new()));
//! let emitter = ReportEmitter::create("target".as_ref(), "txlog")?;
//! let summary = controller.run(&mut executor, emitter)?;
//! ```
//!
//! # Architecture
//!
//! - `txlog-core`: the log capability set (`TransactionLog`, `Xid`, `LogMark`)
//! - `txlog-durability`: `FileLog` (group-forcing file log) and `MemoryLog`
//! - `txlog-harness`: barrier, workers, run driver, sweep and reports

pub use txlog_core::{ActiveLog, LogError, LogMark, LogResult, TransactionLog, Xid};
pub use txlog_durability::{
    scan_records, FileLog, FileLogConfig, FileLogConfigError, ForceCounters, MemoryLog,
    RecordKind, ScanReport, SyncMode,
};
pub use txlog_harness::*;
