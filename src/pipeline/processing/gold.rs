use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::common::constants::{
    GOLD_BY_POSITION_FILE, GOLD_BY_TEAM_WEEK_FILE, INJURY_COUNT_COLUMN, POSITION_COLUMN,
    SEASON_COLUMN, TEAM_COLUMN, WEEK_COLUMN,
};
use crate::domain::{Cell, Dataset, Row};
use crate::error::Result;

/// One aggregated table and the file name it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldTable {
    pub name: &'static str,
    pub dataset: Dataset,
}

/// Build every aggregate the accepted dataset has columns for.
pub fn aggregate(silver: &Dataset) -> Result<Vec<GoldTable>> {
    let mut tables = Vec::new();

    if let Some(dataset) = injuries_by_team_week(silver)? {
        tables.push(GoldTable {
            name: GOLD_BY_TEAM_WEEK_FILE,
            dataset,
        });
    }
    if let Some(dataset) = injuries_by_position(silver)? {
        tables.push(GoldTable {
            name: GOLD_BY_POSITION_FILE,
            dataset,
        });
    }

    info!(tables = tables.len(), "Gold aggregates built");
    Ok(tables)
}

/// Row counts per `(season, week, team)`, ordered by season, week, team.
pub fn injuries_by_team_week(silver: &Dataset) -> Result<Option<Dataset>> {
    let group_columns = [SEASON_COLUMN, WEEK_COLUMN, TEAM_COLUMN];
    let Some(mut groups) = count_groups(silver, &group_columns) else {
        debug!("Skipping team/week aggregate: group columns absent");
        return Ok(None);
    };

    groups.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    build_table(&group_columns, groups).map(Some)
}

/// Row counts per `position`, largest first, ties broken by position.
pub fn injuries_by_position(silver: &Dataset) -> Result<Option<Dataset>> {
    let group_columns = [POSITION_COLUMN];
    let Some(mut groups) = count_groups(silver, &group_columns) else {
        debug!("Skipping position aggregate: position column absent");
        return Ok(None);
    };

    groups.sort_by(|(a_key, a_count), (b_key, b_count)| {
        b_count.cmp(a_count).then_with(|| compare_keys(a_key, b_key))
    });
    build_table(&group_columns, groups).map(Some)
}

/// Count rows per key tuple; `None` when a group column is missing.
/// Blank values form their own group.
fn count_groups(silver: &Dataset, columns: &[&str]) -> Option<Vec<(Vec<Cell>, i64)>> {
    let indices = columns
        .iter()
        .map(|name| silver.column_index(name))
        .collect::<Option<Vec<usize>>>()?;

    let mut counts: HashMap<Vec<Cell>, i64> = HashMap::new();
    for row in silver.rows() {
        let key = indices
            .iter()
            .map(|&i| {
                let cell = row.get(i);
                if cell.is_blank() {
                    Cell::Null
                } else {
                    cell.clone()
                }
            })
            .collect();
        *counts.entry(key).or_insert(0) += 1;
    }
    Some(counts.into_iter().collect())
}

fn build_table(group_columns: &[&str], groups: Vec<(Vec<Cell>, i64)>) -> Result<Dataset> {
    let mut columns: Vec<String> = group_columns.iter().map(|c| c.to_string()).collect();
    columns.push(INJURY_COUNT_COLUMN.to_string());

    let mut table = Dataset::new(columns);
    for (mut key, count) in groups {
        key.push(Cell::Int(count));
        table.push_row(Row::new(key))?;
    }
    Ok(table)
}

fn compare_keys(a: &[Cell], b: &[Cell]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_cells(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Integers numerically, text lexically, integers before text, blanks last.
fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Null, Cell::Null) => Ordering::Equal,
        (Cell::Null, _) => Ordering::Greater,
        (_, Cell::Null) => Ordering::Less,
        (Cell::Int(x), Cell::Int(y)) => x.cmp(y),
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Int(_), Cell::Text(_)) => Ordering::Less,
        (Cell::Text(_), Cell::Int(_)) => Ordering::Greater,
    }
}
