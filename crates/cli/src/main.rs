//! txlog-bench: sweep a transaction log with concurrent prepare/commit load.
//!
//! Writes `<report-name>.xml` and `<report-name>.csv` into `--output-dir`
//! and prints one line per run (or the whole summary with `--json`).
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to override
//! the level chosen by `-v`.

mod commands;
mod parse;

use std::io;
use std::process;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use txlog_core::LogError;
use txlog_durability::{FileLog, FileLogConfig, FileLogConfigError, MemoryLog};
use txlog_harness::{
    LogRunExecutor, ReportEmitter, RunDriver, RunResult, SweepController, SweepSummary,
    NOT_APPLICABLE,
};

use commands::build_cli;
use parse::{matches_to_options, BenchOptions};

fn main() {
    let matches = build_cli().get_matches();
    let options = match matches_to_options(&matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    init_tracing(options.verbose);

    match run_sweep(&options) {
        Ok(summary) => {
            if let Err(e) = print_summary(&summary, options.json) {
                eprintln!("Error: {:#}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn invalid_log_config(e: FileLogConfigError) -> LogError {
    LogError::Io(io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn run_sweep(options: &BenchOptions) -> anyhow::Result<SweepSummary> {
    let controller =
        SweepController::new(options.sweep.clone()).context("Invalid sweep configuration")?;

    let log_config = FileLogConfig::new(&options.log_dir).with_sync_mode(options.sync_mode);
    if !options.memory {
        log_config
            .validate()
            .context("Invalid transaction log configuration")?;
    }

    let emitter = ReportEmitter::create(&options.output_dir, &options.report_name)
        .with_context(|| {
            format!(
                "Failed to create reports in {}",
                options.output_dir.display()
            )
        })?;

    let driver = RunDriver::new();
    let summary = if options.memory {
        let mut executor = LogRunExecutor::new(driver, || Ok(MemoryLog::new()));
        controller.run(&mut executor, emitter)?
    } else {
        tracing::info!(
            target: "txlog::sweep",
            dir = %options.log_dir.display(),
            sync = options.sync_mode.description(),
            "Using file log"
        );
        let mut executor = LogRunExecutor::new(driver, || {
            FileLog::new(log_config.clone()).map_err(invalid_log_config)
        });
        controller.run(&mut executor, emitter)?
    };
    Ok(summary)
}

fn optional(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_APPLICABLE.to_string(), |v| v.to_string())
}

fn run_line(result: &RunResult) -> String {
    format!(
        "workers={:<4} completed={}/{} elapsed={}ms xids/s={} force={}us bytes/force={} latency={}ms",
        result.worker_count,
        result.completed_total_cycles,
        result.expected_total_cycles,
        result.elapsed_millis,
        optional(result.cycles_per_second),
        result.average_force_time_micros,
        result.average_bytes_per_force,
        optional(result.average_latency_millis),
    )
}

fn print_summary(summary: &SweepSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    for result in &summary.results {
        println!("{}", run_line(result));
    }
    if summary.terminated_early {
        println!(
            "Sweep stopped early after {} overtime runs",
            summary.overtime_runs
        );
    }
    Ok(())
}
