//! File-backed transaction log with group forcing.
//!
//! `prepare` journals a PREPARE record and returns only once it is durable.
//! `commit` journals a COMMIT record and returns immediately; it becomes
//! durable with the next force.
//!
//! # Group Force
//!
//! Callers append encoded records to a shared pending buffer and take a
//! ticket. The first caller that needs durability while nobody is forcing
//! becomes the forcer: it waits up to `flush_sleep` for more callers to queue
//! (or until `force_threshold` are queued), takes the whole buffer, writes and
//! syncs it with the state lock released, then publishes the highest ticket it
//! covered. Everyone whose ticket is covered returns without touching disk.
//!
//! # File Ring
//!
//! Records go to `<name>_1.<ext>` until the next write would exceed
//! `max_file_bytes`, then to `<name>_2.<ext>` (truncated first), wrapping back
//! to file 1 after `max_log_files`.

use crate::config::{FileLogConfig, FileLogConfigError, SyncMode};
use crate::counters::ForceCounters;
use crate::record::{FileHeader, LogRecord, RecordError, FILE_HEADER_SIZE};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};
use txlog_core::{LogError, LogMark, LogResult, TransactionLog, Xid};
use uuid::Uuid;

struct ActiveFile {
    file: File,
    number: u32,
    generation: u32,
    size: u64,
}

#[derive(Default)]
struct AppendState {
    started: bool,
    /// Encoded records not yet handed to a force
    pending: Vec<u8>,
    pending_records: u64,
    /// Highest ticket handed out
    appended: u64,
    /// Highest ticket known durable
    durable: u64,
    forcing: bool,
    /// Callers inside `force_through`, forcer included
    waiting: usize,
    /// Set by the first failed force; the log accepts nothing afterwards
    poisoned: Option<String>,
}

/// File-backed [`TransactionLog`].
pub struct FileLog {
    config: FileLogConfig,
    log_uuid: [u8; 16],
    state: Mutex<AppendState>,
    forced: Condvar,
    file: Mutex<Option<ActiveFile>>,
    counters: Mutex<ForceCounters>,
    /// Last prepare sequence issued
    sequence: AtomicU64,
}

impl FileLog {
    /// Create a log; no files are touched until [`TransactionLog::start`].
    pub fn new(config: FileLogConfig) -> Result<Self, FileLogConfigError> {
        config.validate()?;
        Ok(FileLog {
            config,
            log_uuid: Uuid::new_v4().into_bytes(),
            state: Mutex::new(AppendState::default()),
            forced: Condvar::new(),
            file: Mutex::new(None),
            counters: Mutex::new(ForceCounters::default()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Configuration this log was built with.
    pub fn config(&self) -> &FileLogConfig {
        &self.config
    }

    /// Snapshot of the cumulative force counters.
    pub fn counters(&self) -> ForceCounters {
        self.counters.lock().clone()
    }

    /// Whether `start` has been called without a matching `stop`.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    fn append(&self, record: &LogRecord) -> LogResult<u64> {
        let mut encoded = Vec::with_capacity(64);
        record
            .encode_into(&mut encoded, self.config.checksum_enabled)
            .map_err(invalid_record)?;

        let mut state = self.state.lock();
        if !state.started {
            return Err(LogError::NotStarted);
        }
        if let Some(reason) = &state.poisoned {
            return Err(poisoned(reason));
        }
        state.pending.extend_from_slice(&encoded);
        state.pending_records += 1;
        state.appended += 1;
        Ok(state.appended)
    }

    /// Block until every record up to `ticket` is durable.
    fn force_through(&self, ticket: u64) -> LogResult<()> {
        let threshold = self.config.force_threshold;
        let mut state = self.state.lock();
        state.waiting += 1;
        if state.forcing && state.waiting >= threshold {
            self.forced.notify_all();
        }

        let mut performed = false;
        let result = loop {
            if state.durable >= ticket {
                break Ok(());
            }
            if let Some(reason) = &state.poisoned {
                break Err(poisoned(reason));
            }
            if state.forcing {
                self.forced.wait(&mut state);
                continue;
            }

            state.forcing = true;
            performed = true;
            if state.waiting < threshold && !self.config.flush_sleep.is_zero() {
                let deadline = Instant::now() + self.config.flush_sleep;
                while state.waiting < threshold {
                    if self.forced.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }

            let batch = mem::take(&mut state.pending);
            let records = mem::replace(&mut state.pending_records, 0);
            let target = state.appended;
            let outcome = MutexGuard::unlocked(&mut state, || self.write_batch(&batch, records));

            state.forcing = false;
            match outcome {
                Ok(()) => state.durable = target,
                Err(e) => {
                    warn!(target: "txlog::log", error = %e, "Force failed, log is unusable");
                    state.poisoned = Some(e.to_string());
                }
            }
            self.forced.notify_all();
        };
        state.waiting -= 1;
        drop(state);

        if result.is_ok() && !performed {
            self.counters.lock().grouped_waits += 1;
        }
        result
    }

    fn write_batch(&self, batch: &[u8], records: u64) -> io::Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.file.lock();
        let active = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "log file is closed"))?;

        let started = Instant::now();
        let len = batch.len() as u64;
        if active.size > FILE_HEADER_SIZE as u64 && active.size + len > self.config.max_file_bytes
        {
            self.switch_file(active)?;
        }

        active.file.write_all(batch)?;
        active.size += len;
        sync(&active.file, self.config.sync_mode)?;

        let nanos = started.elapsed().as_nanos() as u64;
        self.counters.lock().record_force(nanos, len, records);
        Ok(())
    }

    fn switch_file(&self, active: &mut ActiveFile) -> io::Result<()> {
        let next = active.number % self.config.max_log_files + 1;
        let generation = if next == 1 {
            active.generation + 1
        } else {
            active.generation
        };
        debug!(
            target: "txlog::log",
            from = active.number,
            to = next,
            size = active.size,
            "Switching log file"
        );
        *active = self.create_file(next, generation)?;
        self.counters.lock().file_switches += 1;
        Ok(())
    }

    fn create_file(&self, number: u32, generation: u32) -> io::Result<ActiveFile> {
        let path = self.config.file_path(number);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let header = FileHeader::new(number, generation, self.log_uuid);
        file.write_all(&header.to_bytes())?;
        Ok(ActiveFile {
            file,
            number,
            generation,
            size: FILE_HEADER_SIZE as u64,
        })
    }

    fn remove_ring_files(&self) -> io::Result<()> {
        for number in 1..=self.config.max_log_files {
            match std::fs::remove_file(self.config.file_path(number)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl TransactionLog for FileLog {
    fn prepare(&self, xid: &Xid, names: &[String]) -> LogResult<LogMark> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = LogRecord::prepare(sequence, xid.clone(), names.to_vec());
        let ticket = self.append(&record)?;
        self.force_through(ticket)?;
        Ok(LogMark::new(sequence))
    }

    fn commit(&self, xid: &Xid, mark: LogMark) -> LogResult<()> {
        let issued = self.sequence.load(Ordering::Relaxed);
        if mark.sequence() == 0 || mark.sequence() > issued {
            return Err(LogError::UnknownMark(mark.sequence()));
        }
        self.append(&LogRecord::commit(mark.sequence(), xid.clone()))?;
        Ok(())
    }

    fn average_force_time_micros(&self) -> u64 {
        self.counters.lock().average_force_micros()
    }

    fn average_bytes_per_force(&self) -> u64 {
        self.counters.lock().average_bytes_per_force()
    }

    fn stats_report(&self) -> String {
        self.counters.lock().to_xml()
    }

    fn start(&mut self) -> LogResult<()> {
        if self.state.get_mut().started {
            return Ok(());
        }
        std::fs::create_dir_all(&self.config.dir)?;
        self.remove_ring_files()?;
        let first = self.create_file(1, 0)?;

        *self.file.get_mut() = Some(first);
        *self.counters.get_mut() = ForceCounters::default();
        *self.sequence.get_mut() = 0;
        *self.state.get_mut() = AppendState {
            started: true,
            ..AppendState::default()
        };
        debug!(
            target: "txlog::log",
            dir = %self.config.dir.display(),
            sync = self.config.sync_mode.description(),
            "Transaction log started"
        );
        Ok(())
    }

    fn stop(&mut self) -> LogResult<()> {
        let ticket = {
            let state = self.state.get_mut();
            if !state.started {
                return Ok(());
            }
            (state.durable < state.appended).then_some(state.appended)
        };

        let flushed = match ticket {
            Some(ticket) => self.force_through(ticket),
            None => Ok(()),
        };
        self.state.get_mut().started = false;
        let closed = match self.file.get_mut().take() {
            Some(active) if self.config.sync_mode != SyncMode::OsBuffered => active.file.sync_all(),
            _ => Ok(()),
        };
        debug!(target: "txlog::log", "Transaction log stopped");

        flushed?;
        closed?;
        Ok(())
    }
}

impl Drop for FileLog {
    fn drop(&mut self) {
        if self.state.get_mut().started {
            if let Err(e) = self.stop() {
                warn!(target: "txlog::log", error = %e, "Failed to stop log on drop");
            }
        }
    }
}

fn sync(file: &File, mode: SyncMode) -> io::Result<()> {
    match mode {
        SyncMode::Always => file.sync_all(),
        SyncMode::DataOnly => file.sync_data(),
        SyncMode::OsBuffered => Ok(()),
    }
}

fn invalid_record(e: RecordError) -> LogError {
    LogError::Io(io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn poisoned(reason: &str) -> LogError {
    LogError::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("log unusable after failed force: {}", reason),
    ))
}
