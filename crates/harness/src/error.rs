//! Harness error types
//!
//! Only sweep-level failures are errors. A worker whose prepare or commit
//! fails is logged and shows up as missing cycles in the run's result.

use crate::config::ConfigError;
use std::io;
use thiserror::Error;
use txlog_core::LogError;

/// Result type alias for harness operations
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Errors that stop a sweep
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration rejected before any run started
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A run's log could not be created, started or stopped
    #[error("Transaction log error: {0}")]
    Log(#[from] LogError),

    /// A report stream could not be opened or written
    #[error("Report I/O error: {0}")]
    Report(#[source] io::Error),

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: HarnessError = ConfigError::ZeroStep.into();
        assert!(matches!(err, HarnessError::Config(ConfigError::ZeroStep)));
        assert!(err.to_string().contains("step"));
    }

    #[test]
    fn test_report_error_display() {
        let err = HarnessError::Report(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let msg = err.to_string();
        assert!(msg.contains("Report I/O error"));
        assert!(msg.contains("denied"));
    }
}
