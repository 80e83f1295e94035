use tracing::{debug, error};

use crate::common::constants::{SEASON_COLUMN, TEAM_COLUMN, WEEK_COLUMN};
use crate::domain::Dataset;
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::schema::Schema;

/// Columns the quality gate reads on every row, whatever the schema declares.
pub const RULE_COLUMNS: [&str; 3] = [SEASON_COLUMN, WEEK_COLUMN, TEAM_COLUMN];

/// Selects the working column set for the Silver stage.
pub struct ColumnProjector<'a> {
    schema: &'a Schema,
}

impl<'a> ColumnProjector<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// `required ++ (optional ∩ dataset columns)`, in schema order.
    ///
    /// Fails with a structural violation naming every required column the
    /// dataset lacks, and every rule column the projection would not carry.
    pub fn keep_columns(&self, dataset: &Dataset) -> Result<Vec<String>> {
        let missing: Vec<String> = self
            .schema
            .required_names()
            .filter(|name| !dataset.has_column(name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            error!(missing = ?missing, "Input is missing required columns");
            return Err(PipelineError::StructuralViolation { missing });
        }

        let keep: Vec<String> = self
            .schema
            .required_names()
            .chain(
                self.schema
                    .optional_names()
                    .filter(|name| dataset.has_column(name)),
            )
            .map(str::to_string)
            .collect();

        let unprojected: Vec<String> = RULE_COLUMNS
            .iter()
            .filter(|name| !keep.iter().any(|k| k == *name))
            .map(|name| name.to_string())
            .collect();
        if !unprojected.is_empty() {
            error!(missing = ?unprojected, "Projection lacks columns the quality gate reads");
            return Err(PipelineError::StructuralViolation {
                missing: unprojected,
            });
        }

        Ok(keep)
    }

    pub fn project(&self, dataset: &Dataset) -> Result<Dataset> {
        let keep = self.keep_columns(dataset)?;
        debug!(columns = ?keep, rows = dataset.len(), "Projecting dataset");
        dataset.select(&keep)
    }
}
