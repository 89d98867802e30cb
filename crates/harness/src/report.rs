//! Report streams
//!
//! Every run is written twice: as a `<run>` element in the structured (XML)
//! stream and as a row in the tabular (CSV) stream. Both streams are flushed
//! after each run. The emitter owns both writers and closes the structured
//! root element exactly once, either in [`ReportEmitter::finish`] or, on any
//! other exit path, when it is dropped.

use crate::driver::RunResult;
use chrono::{SecondsFormat, Utc};
use std::fmt::{self, Display};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Column header of the tabular stream
pub const TABULAR_HEADER: &str = "workerCount,xidCount,TotalXids,missingXids,DurationMilliseconds,XidsPerSecond,AverageForceTime,AverageBytesPerForce,AverageLatency";

/// Rendering of a value that could not be computed for a run
pub const NOT_APPLICABLE: &str = "n/a";

const STRUCTURED_CLOSE: &str = "</log-test>\n";

fn or_not_applicable(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_APPLICABLE.to_string(), |v| v.to_string())
}

fn element(out: &mut String, name: &str, value: impl Display) {
    use std::fmt::Write as _;
    let _ = write!(out, "<{name}>{value}</{name}>");
}

/// Writer pair for one sweep's reports.
pub struct ReportEmitter<W: Write> {
    streams: Option<(W, W)>,
}

impl ReportEmitter<BufWriter<File>> {
    /// Create `<stem>.xml` and `<stem>.csv` in `dir`, replacing old reports.
    pub fn create(dir: &Path, stem: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let structured = BufWriter::new(File::create(dir.join(format!("{stem}.xml")))?);
        let tabular = BufWriter::new(File::create(dir.join(format!("{stem}.csv")))?);
        Self::open(structured, tabular)
    }
}

impl<W: Write> ReportEmitter<W> {
    /// Write the opening tag and the column header.
    pub fn open(mut structured: W, mut tabular: W) -> io::Result<Self> {
        writeln!(
            structured,
            "<log-test started=\"{}\">",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        writeln!(tabular, "{TABULAR_HEADER}")?;
        structured.flush()?;
        tabular.flush()?;
        Ok(ReportEmitter {
            streams: Some((structured, tabular)),
        })
    }

    /// Append one run to both streams and flush them.
    pub fn emit(&mut self, result: &RunResult) -> io::Result<()> {
        let Some((structured, tabular)) = self.streams.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::Other, "report already finished"));
        };

        let mut run = String::with_capacity(256 + result.log_stats.len());
        run.push_str("<run>");
        element(&mut run, "workers", result.worker_count);
        element(&mut run, "xids-per-thread", result.cycles_per_worker);
        element(&mut run, "expected-total-xids", result.expected_total_cycles);
        element(&mut run, "missing-xids", result.missing_cycles);
        element(&mut run, "totalDuration-milliseconds", result.elapsed_millis);
        element(&mut run, "xids-per-second", or_not_applicable(result.cycles_per_second));
        if result.panicked_workers > 0 {
            element(&mut run, "panicked-workers", result.panicked_workers);
        }
        run.push_str(&result.log_stats);
        run.push_str("</run>");
        writeln!(structured, "{run}")?;

        writeln!(
            tabular,
            "{},{},{},{},{},{},{},{},{}",
            result.worker_count,
            result.cycles_per_worker,
            result.expected_total_cycles,
            result.missing_cycles,
            result.elapsed_millis,
            or_not_applicable(result.cycles_per_second),
            result.average_force_time_micros,
            result.average_bytes_per_force,
            or_not_applicable(result.average_latency_millis),
        )?;

        structured.flush()?;
        tabular.flush()
    }

    /// Close the structured root and hand back both writers.
    pub fn finish(mut self) -> io::Result<(W, W)> {
        match self.streams.take() {
            Some((mut structured, mut tabular)) => {
                Self::close(&mut structured, &mut tabular)?;
                Ok((structured, tabular))
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "report already finished")),
        }
    }

    fn close(structured: &mut W, tabular: &mut W) -> io::Result<()> {
        structured.write_all(STRUCTURED_CLOSE.as_bytes())?;
        structured.flush()?;
        tabular.flush()
    }
}

impl<W: Write> fmt::Debug for ReportEmitter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportEmitter")
            .field("finished", &self.streams.is_none())
            .finish()
    }
}

impl<W: Write> Drop for ReportEmitter<W> {
    fn drop(&mut self) {
        if let Some((mut structured, mut tabular)) = self.streams.take() {
            if let Err(e) = Self::close(&mut structured, &mut tabular) {
                warn!(target: "txlog::sweep", error = %e, "Failed to close report streams");
            }
        }
    }
}
