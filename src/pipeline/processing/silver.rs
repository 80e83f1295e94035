use tracing::info;

use crate::domain::Dataset;
use crate::error::Result;
use crate::pipeline::processing::normalize::TypeNormalizer;
use crate::pipeline::processing::partition::partition;
use crate::pipeline::processing::projection::ColumnProjector;
use crate::pipeline::processing::quality_gate::{AssessmentStats, ValidationEngine};
use crate::pipeline::processing::schema::Schema;

/// Both Silver partitions, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilverOutput {
    /// Normalized accepted rows.
    pub accepted: Dataset,
    /// Raw quarantined rows with a trailing `quarantine_reason`.
    pub quarantined: Dataset,
    /// Rows in the projected input.
    pub input_rows: usize,
    pub stats: AssessmentStats,
}

impl SilverOutput {
    /// `accepted + quarantined == input` for every run that returns.
    pub fn is_conserved(&self) -> bool {
        self.accepted.len() + self.quarantined.len() == self.input_rows
    }
}

/// Project, assess, partition and normalize one Bronze snapshot.
///
/// Nothing is produced on failure: structural problems surface before any row
/// is classified, and a normalization disagreement aborts the whole stage.
pub fn run_silver(bronze: &Dataset, schema: &Schema) -> Result<SilverOutput> {
    let projected = ColumnProjector::new(schema).project(bronze)?;
    let input_rows = projected.len();

    let assessed = ValidationEngine::new(schema).assess(projected);
    let stats = assessed.stats();

    let parts = partition(assessed)?;
    let accepted = TypeNormalizer::normalize(parts.accepted)?;

    info!(
        input_rows,
        accepted = accepted.len(),
        quarantined = parts.quarantined.len(),
        "Silver stage classified rows"
    );

    Ok(SilverOutput {
        accepted,
        quarantined: parts.quarantined,
        input_rows,
        stats,
    })
}
