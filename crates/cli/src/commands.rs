//! Clap command definition.
//!
//! Every sweep parameter can also come from a `TXLOG_BENCH_*` environment
//! variable; an explicit flag wins over the environment.

use clap::{value_parser, Arg, ArgAction, Command};

fn sweep_arg(name: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).env(env).help(help)
}

/// Build the `txlog-bench` command.
pub fn build_cli() -> Command {
    Command::new("txlog-bench")
        .about("Concurrent prepare/commit benchmark for transaction logs")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            sweep_arg(
                "xid-count",
                "TXLOG_BENCH_XID_COUNT",
                "Prepare/commit cycles per worker",
            )
            .value_parser(value_parser!(u64))
            .default_value("50"),
        )
        .arg(
            sweep_arg(
                "min-worker-count",
                "TXLOG_BENCH_MIN_WORKER_COUNT",
                "Smallest worker count in the sweep",
            )
            .value_parser(value_parser!(usize))
            .default_value("20"),
        )
        .arg(
            sweep_arg(
                "max-worker-count",
                "TXLOG_BENCH_MAX_WORKER_COUNT",
                "Largest worker count in the sweep (inclusive)",
            )
            .value_parser(value_parser!(usize))
            .default_value("40"),
        )
        .arg(
            sweep_arg(
                "worker-count-step",
                "TXLOG_BENCH_WORKER_COUNT_STEP",
                "Worker count increment",
            )
            .value_parser(value_parser!(usize))
            .default_value("20"),
        )
        .arg(
            sweep_arg(
                "repetition-count",
                "TXLOG_BENCH_REPETITION_COUNT",
                "Runs per worker count",
            )
            .value_parser(value_parser!(usize))
            .default_value("1"),
        )
        .arg(
            sweep_arg(
                "max-time-seconds",
                "TXLOG_BENCH_MAX_TIME_SECONDS",
                "Per-run budget; the second run over it ends the sweep",
            )
            .value_parser(value_parser!(u64))
            .default_value("30"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for the XML and CSV reports")
                .default_value("target"),
        )
        .arg(
            Arg::new("report-name")
                .long("report-name")
                .help("File stem of the reports")
                .default_value("txlog"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .help("Directory for log files (default: <output-dir>/txlog)"),
        )
        .arg(
            Arg::new("sync-mode")
                .long("sync-mode")
                .help("How forces reach disk")
                .value_parser(["always", "data", "none"])
                .default_value("always")
                .conflicts_with("memory"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .help("Benchmark the in-memory log instead of the file log")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the sweep summary as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}
