//! Durability layer for txlog-bench
//!
//! This crate provides the log engines the harness can drive:
//!
//! - FileLog: Ring of append-only files with group forcing (prepare is forced,
//!   commit rides along on the next force)
//! - Sync modes: Always (fsync), DataOnly (fdatasync), OsBuffered (no sync)
//! - Record format: length-prefixed, CRC32-checked prepare/commit records
//! - Force counters: per-log statistics reported after each run
//! - Ring scanner: reads back what a run made durable
//! - MemoryLog: in-memory stub with optional failure injection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config; // FileLogConfig, SyncMode
pub mod counters; // ForceCounters
pub mod file_log; // FileLog
pub mod memory; // MemoryLog
pub mod reader; // Ring scanner
pub mod record; // On-disk file header and record format

pub use config::{FileLogConfig, FileLogConfigError, SyncMode, BLOCK_SIZE};
pub use counters::ForceCounters;
pub use file_log::FileLog;
pub use memory::MemoryLog;
pub use reader::{scan_records, ScanError, ScanReport};
pub use record::{
    FileHeader, LogRecord, RecordError, RecordKind, FILE_FORMAT_VERSION, FILE_HEADER_SIZE,
    FILE_MAGIC,
};
