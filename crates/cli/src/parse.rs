//! ArgMatches → BenchOptions conversion.

use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use txlog_durability::SyncMode;
use txlog_harness::SweepConfig;

/// Everything `main` needs to run a sweep.
#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub sweep: SweepConfig,
    pub output_dir: PathBuf,
    pub report_name: String,
    pub log_dir: PathBuf,
    pub sync_mode: SyncMode,
    pub memory: bool,
    pub json: bool,
    pub verbose: u8,
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> Result<T, String> {
    matches
        .get_one::<T>(name)
        .cloned()
        .ok_or_else(|| format!("missing value for --{}", name))
}

/// Translate parsed arguments into options.
pub fn matches_to_options(matches: &ArgMatches) -> Result<BenchOptions, String> {
    let sweep = SweepConfig::default()
        .with_xid_count(required(matches, "xid-count")?)
        .with_workers(
            required(matches, "min-worker-count")?,
            required(matches, "max-worker-count")?,
            required(matches, "worker-count-step")?,
        )
        .with_repetitions(required(matches, "repetition-count")?)
        .with_max_time(Duration::from_secs(required(matches, "max-time-seconds")?));

    let output_dir = PathBuf::from(required::<String>(matches, "output-dir")?);
    let log_dir = matches
        .get_one::<String>("log-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| output_dir.join("txlog"));

    let sync_name = required::<String>(matches, "sync-mode")?;
    let sync_mode =
        SyncMode::parse(&sync_name).ok_or_else(|| format!("unknown sync mode '{}'", sync_name))?;

    Ok(BenchOptions {
        sweep,
        output_dir,
        report_name: required(matches, "report-name")?,
        log_dir,
        sync_mode,
        memory: matches.get_flag("memory"),
        json: matches.get_flag("json"),
        verbose: matches.get_count("verbose"),
    })
}
