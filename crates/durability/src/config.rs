//! File log configuration.
//!
//! Defaults mirror a small two-file ring of 4 KiB blocks with group forcing:
//! a forcing thread waits up to `flush_sleep` for company unless
//! `force_threshold` committers are already queued behind it.

use std::path::PathBuf;
use std::time::Duration;

/// Size of one log block in bytes
pub const BLOCK_SIZE: u64 = 4 * 1024;

/// How a force makes buffered records durable
///
/// | Mode | Syscall | Survives |
/// |------|---------|----------|
/// | Always | fsync | power loss |
/// | DataOnly | fdatasync | power loss (metadata may lag) |
/// | OsBuffered | write only | process crash |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// fsync after every force (default)
    Always,
    /// fdatasync after every force
    DataOnly,
    /// Hand bytes to the OS without syncing
    ///
    /// Forces still happen and are still counted; only the syscall is
    /// skipped. Useful for tests and for isolating harness overhead.
    OsBuffered,
}

impl SyncMode {
    /// Parse the CLI spelling (`always`, `data`, `none`)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(SyncMode::Always),
            "data" => Some(SyncMode::DataOnly),
            "none" => Some(SyncMode::OsBuffered),
            _ => None,
        }
    }

    /// Human-readable description of the mode
    pub fn description(&self) -> &'static str {
        match self {
            SyncMode::Always => "fsync on every force",
            SyncMode::DataOnly => "fdatasync on every force",
            SyncMode::OsBuffered => "no sync (OS buffered)",
        }
    }
}

/// Configuration for a [`FileLog`](crate::FileLog)
#[derive(Debug, Clone)]
pub struct FileLogConfig {
    /// Directory holding the ring files
    pub dir: PathBuf,
    /// File name stem; files are `<file_name>_<n>.<extension>`
    pub file_name: String,
    /// File extension
    pub extension: String,
    /// Number of files in the ring
    pub max_log_files: u32,
    /// Size at which the writer advances to the next ring file
    pub max_file_bytes: u64,
    /// Sync behaviour of each force
    pub sync_mode: SyncMode,
    /// Whether records carry a CRC32
    pub checksum_enabled: bool,
    /// Queued committers that trigger an immediate force
    pub force_threshold: usize,
    /// Longest time a forcer waits for more committers
    pub flush_sleep: Duration,
}

impl FileLogConfig {
    /// Default configuration rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileLogConfig {
            dir: dir.into(),
            file_name: "txlog".to_string(),
            extension: "log".to_string(),
            max_log_files: 2,
            max_file_bytes: 200 * BLOCK_SIZE,
            sync_mode: SyncMode::Always,
            checksum_enabled: true,
            force_threshold: 10,
            flush_sleep: Duration::from_millis(20),
        }
    }

    /// Configuration for tests: no sync, no group wait
    pub fn for_testing(dir: impl Into<PathBuf>) -> Self {
        FileLogConfig {
            sync_mode: SyncMode::OsBuffered,
            flush_sleep: Duration::ZERO,
            ..Self::new(dir)
        }
    }

    /// Set the file name stem (builder pattern).
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Set the number of ring files (builder pattern).
    pub fn with_max_log_files(mut self, files: u32) -> Self {
        self.max_log_files = files;
        self
    }

    /// Set the per-file size limit (builder pattern).
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Set the sync mode (builder pattern).
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Enable or disable record checksums (builder pattern).
    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.checksum_enabled = enabled;
        self
    }

    /// Set the group force threshold (builder pattern).
    pub fn with_force_threshold(mut self, waiting: usize) -> Self {
        self.force_threshold = waiting;
        self
    }

    /// Set the group force wait (builder pattern).
    pub fn with_flush_sleep(mut self, sleep: Duration) -> Self {
        self.flush_sleep = sleep;
        self
    }

    /// Path of ring file `number` (1-based)
    pub fn file_path(&self, number: u32) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", self.file_name, number, self.extension))
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), FileLogConfigError> {
        if self.max_log_files == 0 {
            return Err(FileLogConfigError::NoLogFiles);
        }
        if self.max_file_bytes < 1024 {
            return Err(FileLogConfigError::FileSizeTooSmall);
        }
        if self.force_threshold == 0 {
            return Err(FileLogConfigError::ZeroForceThreshold);
        }
        if self.file_name.is_empty() {
            return Err(FileLogConfigError::EmptyFileName);
        }
        Ok(())
    }
}

/// File log configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileLogConfigError {
    /// The ring needs at least one file.
    #[error("max_log_files must be at least 1")]
    NoLogFiles,

    /// File size is too small (minimum 1KB).
    #[error("max_file_bytes must be at least 1KB")]
    FileSizeTooSmall,

    /// A zero threshold would force with nobody waiting.
    #[error("force_threshold must be at least 1")]
    ZeroForceThreshold,

    /// File name stem is empty.
    #[error("file_name must not be empty")]
    EmptyFileName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FileLogConfig::new("/tmp/txlog");
        assert_eq!(config.max_log_files, 2);
        assert_eq!(config.max_file_bytes, 200 * BLOCK_SIZE);
        assert_eq!(config.sync_mode, SyncMode::Always);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_path_naming() {
        let config = FileLogConfig::new("/var/log").with_file_name("howl");
        assert_eq!(config.file_path(2), PathBuf::from("/var/log/howl_2.log"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = FileLogConfig::for_testing("/tmp/x");
        assert_eq!(
            base.clone().with_max_log_files(0).validate(),
            Err(FileLogConfigError::NoLogFiles)
        );
        assert_eq!(
            base.clone().with_max_file_bytes(100).validate(),
            Err(FileLogConfigError::FileSizeTooSmall)
        );
        assert_eq!(
            base.clone().with_force_threshold(0).validate(),
            Err(FileLogConfigError::ZeroForceThreshold)
        );
        assert_eq!(
            base.with_file_name("").validate(),
            Err(FileLogConfigError::EmptyFileName)
        );
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!(SyncMode::parse("always"), Some(SyncMode::Always));
        assert_eq!(SyncMode::parse("data"), Some(SyncMode::DataOnly));
        assert_eq!(SyncMode::parse("none"), Some(SyncMode::OsBuffered));
        assert_eq!(SyncMode::parse("sometimes"), None);
    }
}
