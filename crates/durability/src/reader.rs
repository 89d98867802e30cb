//! Read a log ring back from disk.
//!
//! Used to confirm what a run actually made durable. This is a verification
//! scan, not recovery: nothing is replayed and torn tails are only reported.

use crate::config::FileLogConfig;
use crate::record::{FileHeader, LogRecord, RecordError, FILE_HEADER_SIZE};
use std::io;
use thiserror::Error;

/// Records recovered from a ring, plus what stopped each file's scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Decoded records, ordered by sequence then kind (prepare before commit)
    pub records: Vec<LogRecord>,
    /// Files that ended in a partial record
    pub torn_files: Vec<u32>,
}

impl ScanReport {
    /// Number of records of the given kind.
    pub fn count(&self, kind: crate::record::RecordKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}

/// Errors raised while scanning a ring
#[derive(Debug, Error)]
pub enum ScanError {
    /// Underlying file I/O failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A file header is missing or has the wrong magic/version
    #[error("Invalid header in log file {0}")]
    InvalidHeader(u32),

    /// A complete record failed to decode
    #[error("Bad record in log file {file} at offset {offset}: {source}")]
    BadRecord {
        /// Ring file number
        file: u32,
        /// Byte offset of the record within the file
        offset: usize,
        /// Decode failure
        source: RecordError,
    },
}

/// Scan every existing ring file described by `config`.
pub fn scan_records(config: &FileLogConfig) -> Result<ScanReport, ScanError> {
    let mut report = ScanReport::default();

    for number in 1..=config.max_log_files {
        let path = config.file_path(number);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        let header_bytes: &[u8; FILE_HEADER_SIZE] = bytes
            .get(..FILE_HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ScanError::InvalidHeader(number))?;
        match FileHeader::from_bytes(header_bytes) {
            Some(header) if header.is_valid() && header.file_number == number => {}
            _ => return Err(ScanError::InvalidHeader(number)),
        }

        let mut offset = FILE_HEADER_SIZE;
        while offset < bytes.len() {
            match LogRecord::decode(&bytes[offset..], config.checksum_enabled) {
                Ok((record, used)) => {
                    report.records.push(record);
                    offset += used;
                }
                Err(RecordError::InsufficientData) => {
                    tracing::warn!(
                        target: "txlog::log",
                        file = number,
                        offset,
                        "Partial record at end of log file"
                    );
                    report.torn_files.push(number);
                    break;
                }
                Err(source) => {
                    return Err(ScanError::BadRecord {
                        file: number,
                        offset,
                        source,
                    })
                }
            }
        }
    }

    report.records.sort_by_key(|r| (r.sequence, r.kind));
    Ok(report)
}
