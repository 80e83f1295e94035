use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::{Cell, Dataset, Row};
use crate::error::{PipelineError, Result};

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// `"Report Date"` -> `report_date`, `"practice-status"` -> `practice_status`.
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_ALNUM_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Trimmed text, with empty and `nan` tokens collapsed to `Null`.
pub fn standardize_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                Cell::Null
            } else {
                Cell::text(trimmed)
            }
        }
        other => other.clone(),
    }
}

/// Produce the Bronze copy of a raw table: normalized column names and
/// standardized cells. No validation happens here.
pub fn standardize(raw: &Dataset) -> Result<Dataset> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    let mut columns = Vec::with_capacity(raw.columns().len());
    for original in raw.columns() {
        let normalized = normalize_column_name(original);
        if let Some(first) = seen.get(&normalized) {
            return Err(PipelineError::DuplicateColumn {
                first: first.to_string(),
                second: original.clone(),
                normalized,
            });
        }
        if normalized != *original {
            debug!(from = %original, to = %normalized, "Renamed column");
        }
        seen.insert(normalized.clone(), original.as_str());
        columns.push(normalized);
    }

    let rows = raw
        .rows()
        .iter()
        .map(|row| Row::new(row.cells().iter().map(standardize_cell).collect()))
        .collect();

    let bronze = Dataset::with_rows(columns, rows)?;
    info!(rows = bronze.len(), columns = bronze.columns().len(), "Bronze dataset standardized");
    Ok(bronze)
}
