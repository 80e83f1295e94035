use std::fmt;
use tracing::{error, info};

use crate::pipeline::orchestrator::PipelineRunResult;

/// Pipeline stages as reported to a [`RunReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Raw,
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Raw => "raw",
            Stage::Bronze => "bronze",
            Stage::Silver => "silver",
            Stage::Gold => "gold",
        };
        f.write_str(name)
    }
}

/// Receives progress and the final summary of a pipeline run.
///
/// Passed explicitly into the orchestrator so nothing depends on
/// process-wide reporting state.
pub trait RunReporter: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_finished(&self, stage: Stage, rows: usize);

    fn stage_failed(&self, stage: Stage, error: &anyhow::Error);

    fn run_finished(&self, result: &PipelineRunResult);
}

/// Logs the standard end-of-run summary through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

const RULE: &str =
    "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~";

impl RunReporter for TracingRunReporter {
    fn stage_started(&self, stage: Stage) {
        info!(%stage, "Stage started");
    }

    fn stage_finished(&self, stage: Stage, rows: usize) {
        info!(%stage, rows, "Stage finished");
    }

    fn stage_failed(&self, stage: Stage, err: &anyhow::Error) {
        error!(%stage, error = %format!("{err:#}"), "Stage failed");
    }

    fn run_finished(&self, result: &PipelineRunResult) {
        info!("{}", RULE);
        info!("Run id:           {}", result.run_id);
        info!("Raw input:        {}", result.input_csv.display());
        info!("Bronze rows:      {}  ->  {}", result.bronze.rows, result.bronze.location);
        info!("Silver rows:      {}  ->  {}", result.silver.rows, result.silver.location);
        info!(
            "Quarantined rows: {}  ->  {}",
            result.quarantine.rows, result.quarantine.location
        );
        for (code, count) in &result.silver_stats.code_counts {
            info!("  {:<22}{}", code.as_str(), count);
        }
        for gold in &result.gold_outputs {
            info!("Gold produced:    {}", gold.location);
        }
        info!(
            "Done in {} ms.",
            (result.finished_at - result.started_at).num_milliseconds()
        );
        info!("{}", RULE);
    }
}
