use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::ports::{DatasetSinkPort, WrittenDataset};
use crate::domain::Dataset;
use crate::error::ErrorTier;
use crate::pipeline::processing::quality_gate::AssessmentStats;
use crate::pipeline::processing::schema::Schema;
use crate::pipeline::processing::silver::run_silver;

/// What one Silver run persisted.
#[derive(Debug, Clone)]
pub struct SilverRunOutcome {
    pub accepted: WrittenDataset,
    pub quarantined: WrittenDataset,
    pub stats: AssessmentStats,
    /// The normalized accepted rows, handed on to Gold.
    pub accepted_dataset: Dataset,
}

/// Use case for validating a Bronze snapshot and persisting both partitions
pub struct SilverUseCase {
    schema: Schema,
    accepted_output: Box<dyn DatasetSinkPort>,
    quarantined_output: Box<dyn DatasetSinkPort>,
}

impl SilverUseCase {
    pub fn new(
        schema: Schema,
        accepted_output: Box<dyn DatasetSinkPort>,
        quarantined_output: Box<dyn DatasetSinkPort>,
    ) -> Self {
        Self {
            schema,
            accepted_output,
            quarantined_output,
        }
    }

    /// Classify every row, then write accepted and quarantined partitions.
    ///
    /// Neither output is left behind unless the whole stage succeeds: a failed
    /// quarantine write discards the accepted file that preceded it.
    pub async fn run(&self, bronze: &Dataset) -> Result<SilverRunOutcome> {
        let output = match run_silver(bronze, &self.schema) {
            Ok(output) => output,
            Err(e) => {
                if e.tier() == ErrorTier::Structural {
                    crate::observability::metrics::silver::structural_failure();
                }
                warn!(error = %e, "Silver stage aborted; nothing written");
                return Err(e).context("silver stage failed");
            }
        };

        crate::observability::metrics::silver::batch_processed(&output.stats);

        let accepted = self
            .accepted_output
            .write_dataset(&output.accepted)
            .await
            .context("failed to persist accepted rows")?;
        let quarantined = match self.quarantined_output.write_dataset(&output.quarantined).await {
            Ok(quarantined) => quarantined,
            Err(e) => {
                if let Err(discard_err) = self.accepted_output.discard(&accepted).await {
                    warn!(error = %format!("{discard_err:#}"), "Failed to discard accepted rows");
                }
                return Err(e).context("failed to persist quarantined rows");
            }
        };

        info!(
            accepted = accepted.rows,
            quarantined = quarantined.rows,
            quarantine_rate = format!("{:.1}%", output.stats.quarantine_rate()),
            "Silver outputs written"
        );

        Ok(SilverRunOutcome {
            accepted,
            quarantined,
            stats: output.stats,
            accepted_dataset: output.accepted,
        })
    }
}
