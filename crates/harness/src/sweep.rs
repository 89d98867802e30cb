//! Worker-count sweep
//!
//! Runs every configuration of a [`SweepConfig`] in order and reports each
//! result. A run slower than the budget is overtime; the second overtime run
//! ends the sweep after it has been reported.

use crate::config::{ConfigError, SweepConfig};
use crate::driver::{RunConfiguration, RunExecutor, RunResult};
use crate::error::{HarnessError, HarnessResult};
use crate::report::ReportEmitter;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, warn};

/// Overtime runs tolerated before the sweep stops
const OVERTIME_TOLERANCE: usize = 1;

/// Outcome of a sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    /// Every run executed, in order
    pub results: Vec<RunResult>,
    /// Runs that exceeded the time budget
    pub overtime_runs: usize,
    /// Whether configurations were skipped because of overtime
    pub terminated_early: bool,
}

/// Drives a whole sweep.
#[derive(Debug, Clone)]
pub struct SweepController {
    config: SweepConfig,
}

impl SweepController {
    /// Validate `config` and build a controller for it
    pub fn new(config: SweepConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SweepController { config })
    }

    /// Every run the sweep would execute without early termination, in order
    pub fn plan(&self) -> impl Iterator<Item = RunConfiguration> + '_ {
        let budget = self.config.time_budget_millis();
        self.config.worker_counts().flat_map(move |workers| {
            (0..self.config.repetition_count)
                .map(move |_| RunConfiguration::new(workers, self.config.xid_count, budget))
        })
    }

    /// Execute the sweep, reporting every run through `emitter`.
    ///
    /// The emitter is finished on success and closed by its `Drop` on every
    /// error path. Worker failures never fail the sweep; log lifecycle,
    /// thread spawn and report I/O failures do.
    pub fn run<E, W>(
        &self,
        executor: &mut E,
        mut emitter: ReportEmitter<W>,
    ) -> HarnessResult<SweepSummary>
    where
        E: RunExecutor + ?Sized,
        W: Write,
    {
        let planned = self.config.run_count();
        info!(
            target: "txlog::sweep",
            runs = planned,
            xid_count = self.config.xid_count,
            budget_ms = self.config.time_budget_millis(),
            "Starting sweep"
        );

        let mut summary = SweepSummary::default();
        for (index, run) in self.plan().enumerate() {
            debug!(target: "txlog::sweep", run = index, workers = run.worker_count, "Executing run");
            let result = executor.execute(&run)?;
            emitter.emit(&result).map_err(HarnessError::Report)?;

            let overtime = result.is_overtime();
            summary.results.push(result);
            if !overtime {
                continue;
            }

            summary.overtime_runs += 1;
            warn!(
                target: "txlog::sweep",
                workers = run.worker_count,
                budget_ms = run.time_budget_millis,
                overtime_runs = summary.overtime_runs,
                "Run exceeded time budget"
            );
            if summary.overtime_runs > OVERTIME_TOLERANCE {
                summary.terminated_early = true;
                warn!(
                    target: "txlog::sweep",
                    skipped = planned.saturating_sub(index + 1),
                    "Stopping sweep after repeated overtime"
                );
                break;
            }
        }

        emitter.finish().map_err(HarnessError::Report)?;
        info!(
            target: "txlog::sweep",
            runs = summary.results.len(),
            overtime_runs = summary.overtime_runs,
            "Sweep finished"
        );
        Ok(summary)
    }
}
