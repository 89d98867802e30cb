//! Error types for transaction log operations
//!
//! Every log engine reports failures through [`LogError`]. The harness never
//! inspects the variants beyond logging them: a failed prepare or commit is a
//! shortfall in the completed-cycle count, not a reason to stop a run.

use std::io;
use thiserror::Error;

/// Result type alias for log operations
pub type LogResult<T> = std::result::Result<T, LogError>;

/// Errors raised by a [`TransactionLog`](crate::TransactionLog)
#[derive(Debug, Error)]
pub enum LogError {
    /// I/O error while writing or forcing the log
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transaction identifier component exceeds its size limit
    #[error("Invalid xid: {component} is {len} bytes (max {max})")]
    InvalidXid {
        /// Which component was rejected
        component: &'static str,
        /// Actual length
        len: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Operation attempted on a log that has not been started (or was stopped)
    #[error("Transaction log is not started")]
    NotStarted,

    /// Commit presented a mark this log never issued
    #[error("Unknown log mark: {0}")]
    UnknownMark(u64),

    /// Log contents failed validation
    #[error("Log corruption: {0}")]
    Corrupt(String),

    /// Failure injected by a test or stub log
    #[error("Injected failure: {0}")]
    Injected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = LogError::Io(io::Error::new(io::ErrorKind::Other, "disk full"));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_error_display_invalid_xid() {
        let err = LogError::InvalidXid {
            component: "global_id",
            len: 65,
            max: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("global_id"));
        assert!(msg.contains("65"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> LogResult<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(LogError::Io(_))));
    }
}
