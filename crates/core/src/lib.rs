//! Core types and traits for txlog-bench
//!
//! This crate defines the narrow contract between the benchmark harness and
//! the transaction log it drives:
//! - Xid: Fixed transaction identifier passed to every prepare/commit
//! - LogMark: Opaque handle linking a prepare to its commit
//! - TransactionLog: The capability set the harness needs from a log engine
//! - ActiveLog: Scoped start/stop lifecycle around a log instance
//! - LogError: Error type for log operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod log;
pub mod xid;

pub use error::{LogError, LogResult};
pub use log::{ActiveLog, LogMark, TransactionLog};
pub use xid::{Xid, MAX_BRANCH_QUALIFIER_SIZE, MAX_GLOBAL_ID_SIZE};
