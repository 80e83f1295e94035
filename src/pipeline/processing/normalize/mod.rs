use tracing::debug;

use crate::common::constants::{REPORT_DATE_COLUMN, SEASON_COLUMN, WEEK_COLUMN};
use crate::domain::{Cell, Dataset};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::quality_gate::rules::{parse_calendar_date, parse_whole_number};

/// Canonical output layout for `report_date`.
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Coerces accepted rows to their canonical types.
///
/// Only ever applied to the accepted partition. Every value it parses was
/// already accepted by the quality gate with the same parsers, so a failure
/// here is reported as [`PipelineError::InternalConsistency`].
pub struct TypeNormalizer;

impl TypeNormalizer {
    pub fn normalize(accepted: Dataset) -> Result<Dataset> {
        let season = accepted.column_index(SEASON_COLUMN);
        let week = accepted.column_index(WEEK_COLUMN);
        let report_date = accepted.column_index(REPORT_DATE_COLUMN);

        let (columns, rows) = accepted.into_parts();
        let mut normalized = Dataset::new(columns);

        for (row_index, mut row) in rows.into_iter().enumerate() {
            for (index, column) in [(season, SEASON_COLUMN), (week, WEEK_COLUMN)] {
                if let Some(i) = index {
                    let value = parse_whole_number(row.get(i))
                        .ok_or_else(|| inconsistency(row_index, column, row.get(i)))?;
                    row.set(i, Cell::Int(value));
                }
            }

            if let Some(i) = report_date {
                let canonical = match row.get(i).as_text() {
                    None => String::new(),
                    Some(text) => parse_calendar_date(text)
                        .ok_or_else(|| inconsistency(row_index, REPORT_DATE_COLUMN, row.get(i)))?
                        .format(REPORT_DATE_FORMAT)
                        .to_string(),
                };
                row.set(i, Cell::Text(canonical));
            }

            normalized.push_row(row)?;
        }

        debug!(rows = normalized.len(), "Normalized accepted rows");
        Ok(normalized)
    }
}

fn inconsistency(row: usize, column: &str, cell: &Cell) -> PipelineError {
    PipelineError::InternalConsistency {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;
    use crate::error::ErrorTier;

    fn accepted(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::with_rows(
            columns.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    Row::new(
                        r.iter()
                            .map(|v| if v.is_empty() { Cell::Null } else { Cell::text(*v) })
                            .collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_season_and_week_become_integers() {
        let ds = accepted(&["season", "week", "team"], &[&["2024", " 05 ", "NYG"]]);
        let out = TypeNormalizer::normalize(ds).unwrap();
        assert_eq!(out.value(0, "season"), Some(&Cell::Int(2024)));
        assert_eq!(out.value(0, "week"), Some(&Cell::Int(5)));
        assert_eq!(out.value(0, "team"), Some(&Cell::text("NYG")));
    }

    #[test]
    fn test_report_date_is_canonicalized_and_blank_becomes_empty() {
        let ds = accepted(
            &["season", "week", "team", "report_date"],
            &[
                &["2024", "5", "NYG", "10/02/2024"],
                &["2024", "6", "NYG", ""],
                &["2024", "7", "NYG", "2024-10-16T12:00:00Z"],
            ],
        );
        let out = TypeNormalizer::normalize(ds).unwrap();
        assert_eq!(out.value(0, "report_date"), Some(&Cell::text("2024-10-02")));
        assert_eq!(out.value(1, "report_date"), Some(&Cell::text("")));
        assert_eq!(out.value(2, "report_date"), Some(&Cell::text("2024-10-16")));
    }

    #[test]
    fn test_unparseable_accepted_value_is_internal_inconsistency() {
        let ds = accepted(&["season", "week", "team"], &[&["2024", "5", "NYG"], &["20x4", "5", "NYG"]]);
        let err = TypeNormalizer::normalize(ds).unwrap_err();
        assert_eq!(err.tier(), ErrorTier::InternalConsistency);
        match err {
            PipelineError::InternalConsistency { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "season");
                assert_eq!(value, "20x4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_other_columns_are_untouched() {
        let ds = accepted(
            &["season", "week", "team", "position"],
            &[&["2024", "5", "NYG", " wr "]],
        );
        let out = TypeNormalizer::normalize(ds).unwrap();
        assert_eq!(out.value(0, "position"), Some(&Cell::text(" wr ")));
    }
}
