use tracing::debug;

use crate::common::constants::QUARANTINE_REASON_COLUMN;
use crate::domain::{Cell, Dataset};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quality_gate::AssessedDataset;

/// Accepted and quarantined rows of one assessed dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioned {
    /// Rows with an empty reason, projected columns only.
    pub accepted: Dataset,
    /// Rows with a non-empty reason, projected columns plus `quarantine_reason`.
    pub quarantined: Dataset,
}

impl Partitioned {
    pub fn total_rows(&self) -> usize {
        self.accepted.len() + self.quarantined.len()
    }
}

/// Route each row by its reason. Input order is kept within both partitions.
pub fn partition(assessed: AssessedDataset) -> Result<Partitioned> {
    let (dataset, reasons) = assessed.into_parts();
    let (columns, rows) = dataset.into_parts();

    let mut quarantine_columns = columns.clone();
    quarantine_columns.push(QUARANTINE_REASON_COLUMN.to_string());

    let mut accepted = Dataset::new(columns);
    let mut quarantined = Dataset::new(quarantine_columns);
    let input_rows = rows.len();

    for (mut row, reason) in rows.into_iter().zip(reasons) {
        if reason.is_accepted() {
            accepted.push_row(row)?;
        } else {
            row.push(Cell::Text(reason.to_string()));
            quarantined.push_row(row)?;
        }
    }

    let partitioned = Partitioned {
        accepted,
        quarantined,
    };
    if partitioned.total_rows() != input_rows {
        return Err(PipelineError::InternalConsistency {
            row: input_rows,
            column: QUARANTINE_REASON_COLUMN.to_string(),
            value: format!(
                "{} accepted + {} quarantined",
                partitioned.accepted.len(),
                partitioned.quarantined.len()
            ),
        });
    }

    debug!(
        accepted = partitioned.accepted.len(),
        quarantined = partitioned.quarantined.len(),
        "Partitioned assessed rows"
    );
    Ok(partitioned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;
    use crate::pipeline::processing::quality_gate::ValidationEngine;
    use crate::pipeline::processing::schema::SchemaLoader;

    fn assessed(rows: &[[&str; 3]]) -> AssessedDataset {
        let schema = SchemaLoader::parse(
            r#"{"required": {"season": "int", "week": "int", "team": "string"}, "primary_key": ["season", "week", "team"]}"#,
        )
        .unwrap();
        let ds = Dataset::with_rows(
            vec!["season".into(), "week".into(), "team".into()],
            rows.iter()
                .map(|r| Row::new(r.iter().map(|v| Cell::text(*v)).collect()))
                .collect(),
        )
        .unwrap();
        ValidationEngine::new(&schema).assess(ds)
    }

    #[test]
    fn test_partition_preserves_order_and_appends_reason() {
        let parts = partition(assessed(&[
            ["2024", "1", "NYG"],
            ["2024", "x", "DAL"],
            ["2024", "2", "PHI"],
            ["2024", "1", "NYG"],
            ["2024", "3", "WAS"],
        ]))
        .unwrap();

        assert_eq!(parts.accepted.len(), 3);
        assert_eq!(parts.quarantined.len(), 2);
        assert_eq!(parts.total_rows(), 5);

        let accepted_teams: Vec<String> = (0..parts.accepted.len())
            .map(|i| parts.accepted.value(i, "team").unwrap().to_string())
            .collect();
        assert_eq!(accepted_teams, vec!["NYG", "PHI", "WAS"]);

        assert_eq!(
            parts.quarantined.columns().last().map(String::as_str),
            Some(QUARANTINE_REASON_COLUMN)
        );
        assert_eq!(
            parts.quarantined.value(0, QUARANTINE_REASON_COLUMN),
            Some(&Cell::text("invalid_week"))
        );
        assert_eq!(parts.quarantined.value(0, "week"), Some(&Cell::text("x")));
        assert_eq!(
            parts.quarantined.value(1, QUARANTINE_REASON_COLUMN),
            Some(&Cell::text("duplicate_record"))
        );
        assert!(!parts.accepted.has_column(QUARANTINE_REASON_COLUMN));
    }

    #[test]
    fn test_empty_input_gives_two_empty_partitions() {
        let parts = partition(assessed(&[])).unwrap();
        assert!(parts.accepted.is_empty());
        assert!(parts.quarantined.is_empty());
        assert_eq!(parts.quarantined.columns().len(), 4);
    }
}
