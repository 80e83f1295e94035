//! Silver-stage quality gate.
//!
//! Every row is classified by a fixed, ordered list of independent rules. Each
//! rule produces its own per-row verdict vector; a single reduction then
//! appends the codes of the rules that fired, in evaluation order, to build
//! the row's quarantine reason. Rules never see each other's verdicts, so the
//! reason string is identical however the verdicts are computed.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::common::constants::{
    REASON_SEPARATOR, REPORT_DATE_COLUMN, SEASON_COLUMN, TEAM_COLUMN, WEEK_COLUMN,
};
use crate::domain::{Cell, Dataset, Row};
use crate::pipeline::processing::schema::Schema;

use self::rules::{parse_calendar_date, parse_whole_number};

/// Reason codes, declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCode {
    /// Any required field is blank
    MissingRequired,
    /// `season` is not a whole number
    InvalidSeason,
    /// `week` is not a whole number
    InvalidWeek,
    /// `week` parsed but lies outside the schema's week range
    WeekOutOfRange,
    /// `team` is blank; may co-occur with `MissingRequired` for the same field
    BlankTeam,
    /// `report_date` is present, non-blank and not a calendar date
    InvalidReportDate,
    /// Primary-key tuple already seen on an earlier row
    DuplicateRecord,
}

impl RuleCode {
    pub const EVALUATION_ORDER: [RuleCode; 7] = [
        RuleCode::MissingRequired,
        RuleCode::InvalidSeason,
        RuleCode::InvalidWeek,
        RuleCode::WeekOutOfRange,
        RuleCode::BlankTeam,
        RuleCode::InvalidReportDate,
        RuleCode::DuplicateRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::MissingRequired => "missing_required",
            RuleCode::InvalidSeason => "invalid_season",
            RuleCode::InvalidWeek => "invalid_week",
            RuleCode::WeekOutOfRange => "week_out_of_range",
            RuleCode::BlankTeam => "blank_team",
            RuleCode::InvalidReportDate => "invalid_report_date",
            RuleCode::DuplicateRecord => "duplicate_record",
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The codes that fired for one row, in evaluation order. Empty means accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineReason {
    codes: Vec<RuleCode>,
}

impl QuarantineReason {
    pub fn codes(&self) -> &[RuleCode] {
        &self.codes
    }

    pub fn contains(&self, code: RuleCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn is_accepted(&self) -> bool {
        self.codes.is_empty()
    }

    fn append(&mut self, code: RuleCode) {
        debug_assert!(!self.codes.contains(&code));
        self.codes.push(code);
    }
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.codes.iter().enumerate() {
            if i > 0 {
                f.write_str(REASON_SEPARATOR)?;
            }
            f.write_str(code.as_str())?;
        }
        Ok(())
    }
}

/// One rule's private per-row result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdicts {
    pub code: RuleCode,
    pub flagged: Vec<bool>,
}

impl RuleVerdicts {
    pub fn flagged_count(&self) -> usize {
        self.flagged.iter().filter(|f| **f).count()
    }
}

/// A dataset annotated with one quarantine reason per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessedDataset {
    dataset: Dataset,
    reasons: Vec<QuarantineReason>,
}

impl AssessedDataset {
    pub fn reasons(&self) -> &[QuarantineReason] {
        &self.reasons
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn into_parts(self) -> (Dataset, Vec<QuarantineReason>) {
        (self.dataset, self.reasons)
    }

    pub fn stats(&self) -> AssessmentStats {
        let mut stats = AssessmentStats {
            total_rows: self.reasons.len(),
            ..Default::default()
        };
        for reason in &self.reasons {
            if reason.is_accepted() {
                stats.accepted_rows += 1;
            } else {
                stats.quarantined_rows += 1;
            }
            for code in reason.codes() {
                *stats.code_counts.entry(*code).or_insert(0) += 1;
            }
        }
        stats
    }
}

/// Counts for one assessed dataset.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentStats {
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub quarantined_rows: usize,
    pub code_counts: BTreeMap<RuleCode, usize>,
}

impl AssessmentStats {
    /// Quarantine rate as percentage
    pub fn quarantine_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.quarantined_rows as f64 / self.total_rows as f64 * 100.0
    }
}

/// Evaluates the Silver rules over a projected dataset.
///
/// Performs no I/O and never fails: every outcome is a per-row annotation.
pub struct ValidationEngine<'a> {
    schema: &'a Schema,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Classify every row of `dataset`.
    pub fn assess(&self, dataset: Dataset) -> AssessedDataset {
        let verdicts = self.evaluate_rules(&dataset);
        let reasons = merge_verdicts(dataset.len(), verdicts);
        AssessedDataset { dataset, reasons }
    }

    /// Run every applicable rule independently. Rules that do not apply to this
    /// dataset (no `report_date` column, no usable primary key) are omitted.
    pub fn evaluate_rules(&self, dataset: &Dataset) -> Vec<RuleVerdicts> {
        let weeks: Vec<Option<i64>> = column_cells(dataset, WEEK_COLUMN)
            .map(parse_whole_number)
            .collect();

        let mut verdicts = Vec::with_capacity(RuleCode::EVALUATION_ORDER.len());
        for code in RuleCode::EVALUATION_ORDER {
            let flagged = match code {
                RuleCode::MissingRequired => Some(self.missing_required(dataset)),
                RuleCode::InvalidSeason => Some(
                    column_cells(dataset, SEASON_COLUMN)
                        .map(|cell| parse_whole_number(cell).is_none())
                        .collect(),
                ),
                RuleCode::InvalidWeek => Some(weeks.iter().map(Option::is_none).collect()),
                RuleCode::WeekOutOfRange => {
                    let range = self.schema.week_range();
                    Some(
                        weeks
                            .iter()
                            .map(|week| matches!(week, Some(w) if !range.contains(*w)))
                            .collect(),
                    )
                }
                RuleCode::BlankTeam => Some(
                    column_cells(dataset, TEAM_COLUMN)
                        .map(Cell::is_blank)
                        .collect(),
                ),
                RuleCode::InvalidReportDate => invalid_report_dates(dataset),
                RuleCode::DuplicateRecord => self.duplicate_records(dataset),
            };

            if let Some(flagged) = flagged {
                let rule = RuleVerdicts { code, flagged };
                debug!(rule = %code, flagged = rule.flagged_count(), "Rule evaluated");
                verdicts.push(rule);
            }
        }
        verdicts
    }

    fn missing_required(&self, dataset: &Dataset) -> Vec<bool> {
        let required: Vec<Option<usize>> = self
            .schema
            .required_names()
            .map(|name| dataset.column_index(name))
            .collect();

        dataset
            .rows()
            .iter()
            .map(|row| {
                required
                    .iter()
                    .any(|index| index.map_or(true, |i| row.get(i).is_blank()))
            })
            .collect()
    }

    fn duplicate_records(&self, dataset: &Dataset) -> Option<Vec<bool>> {
        let key = self.schema.primary_key();
        if key.is_empty() {
            return None;
        }
        let columns = key
            .iter()
            .map(|name| {
                dataset
                    .column_index(name)
                    .map(|index| (index, self.is_whole_number_field(name)))
            })
            .collect::<Option<Vec<(usize, bool)>>>()?;

        let mut seen: HashSet<Vec<KeyPart>> = HashSet::with_capacity(dataset.len());
        Some(
            dataset
                .rows()
                .iter()
                .map(|row| !seen.insert(key_tuple(row, &columns)))
                .collect(),
        )
    }

    /// `season`, `week` and any field hinted `int` compare by parsed value.
    fn is_whole_number_field(&self, name: &str) -> bool {
        if name == SEASON_COLUMN || name == WEEK_COLUMN {
            return true;
        }
        self.schema
            .required()
            .iter()
            .chain(self.schema.optional())
            .find(|field| field.name == name)
            .and_then(|field| field.type_hint.as_deref())
            .is_some_and(|hint| hint.eq_ignore_ascii_case("int"))
    }
}

static ABSENT: Cell = Cell::Null;

/// Cells of one column in row order; a column the dataset lacks reads as blank.
fn column_cells<'d>(dataset: &'d Dataset, column: &str) -> impl Iterator<Item = &'d Cell> + 'd {
    let index = dataset.column_index(column);
    dataset.rows().iter().map(move |row| match index {
        Some(i) => row.get(i),
        None => &ABSENT,
    })
}

fn invalid_report_dates(dataset: &Dataset) -> Option<Vec<bool>> {
    if !dataset.has_column(REPORT_DATE_COLUMN) {
        return None;
    }
    Some(
        column_cells(dataset, REPORT_DATE_COLUMN)
            .map(|cell| match cell.as_text() {
                Some(text) => parse_calendar_date(text).is_none(),
                None => false,
            })
            .collect(),
    )
}

/// One primary-key component as compared for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Blank,
    Number(i64),
    Text(String),
}

/// Blank cells compare equal to each other inside a key. Whole-number fields
/// compare by value, so `"2024"` and `"2024.0"` are the same key; values that
/// do not parse fall back to their text.
fn key_tuple(row: &Row, columns: &[(usize, bool)]) -> Vec<KeyPart> {
    columns
        .iter()
        .map(|&(i, whole_number)| {
            let cell = row.get(i);
            if cell.is_blank() {
                return KeyPart::Blank;
            }
            match whole_number.then(|| parse_whole_number(cell)).flatten() {
                Some(value) => KeyPart::Number(value),
                None => KeyPart::Text(cell.to_string()),
            }
        })
        .collect()
}

/// Deterministic reduction: append each fired code in evaluation order.
pub fn merge_verdicts(row_count: usize, mut verdicts: Vec<RuleVerdicts>) -> Vec<QuarantineReason> {
    verdicts.sort_by_key(|v| v.code);
    let mut reasons = vec![QuarantineReason::default(); row_count];
    for rule in &verdicts {
        for (reason, flagged) in reasons.iter_mut().zip(&rule.flagged) {
            if *flagged {
                reason.append(rule.code);
            }
        }
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::schema::SchemaLoader;

    fn schema() -> Schema {
        SchemaLoader::parse(
            r#"{
                "required": {"season": "int", "week": "int", "team": "string"},
                "optional": {"report_date": "date"},
                "primary_key": ["season", "week", "team"],
                "week_range": [1, 22]
            }"#,
        )
        .unwrap()
    }

    fn cell(v: &str) -> Cell {
        if v.is_empty() {
            Cell::Null
        } else {
            Cell::text(v)
        }
    }

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::with_rows(
            columns.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| Row::new(r.iter().map(|v| cell(v)).collect()))
                .collect(),
        )
        .unwrap()
    }

    fn reasons(assessed: &AssessedDataset) -> Vec<String> {
        assessed.reasons().iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_clean_row_is_accepted() {
        let schema = schema();
        let ds = dataset(&["season", "week", "team"], &[&["2024", "5", "NYG"]]);
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert!(assessed.reasons()[0].is_accepted());
        assert_eq!(reasons(&assessed), vec![""]);
    }

    #[test]
    fn test_missing_required_fires_once_per_row() {
        let schema = schema();
        let ds = dataset(&["season", "week", "team"], &[&["", "", ""]]);
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(
            reasons(&assessed),
            vec!["missing_required; invalid_season; invalid_week; blank_team"]
        );
    }

    #[test]
    fn test_missing_required_and_blank_team_keep_rule_order() {
        let schema = schema();
        let ds = dataset(&["season", "week", "team"], &[&["2024", "5", "   "]]);
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(reasons(&assessed), vec!["missing_required; blank_team"]);
    }

    #[test]
    fn test_non_numeric_week_is_not_also_out_of_range() {
        let schema = schema();
        let ds = dataset(&["season", "week", "team"], &[&["2024", "five", "NYG"]]);
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(reasons(&assessed), vec!["invalid_week"]);
        assert!(!assessed.reasons()[0].contains(RuleCode::WeekOutOfRange));
    }

    #[test]
    fn test_week_range_is_inclusive() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team"],
            &[
                &["2024", "0", "NYG"],
                &["2024", "1", "DAL"],
                &["2024", "22", "PHI"],
                &["2024", "23", "WAS"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(
            reasons(&assessed),
            vec!["week_out_of_range", "", "", "week_out_of_range"]
        );
    }

    #[test]
    fn test_report_date_rule_only_applies_when_column_exists() {
        let schema = schema();
        let without = dataset(&["season", "week", "team"], &[&["2024", "5", "NYG"]]);
        let verdicts = ValidationEngine::new(&schema).evaluate_rules(&without);
        assert!(verdicts.iter().all(|v| v.code != RuleCode::InvalidReportDate));

        let with = dataset(
            &["season", "week", "team", "report_date"],
            &[
                &["2024", "5", "NYG", "2024-10-02"],
                &["2024", "6", "NYG", ""],
                &["2024", "7", "NYG", "someday"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(with);
        assert_eq!(reasons(&assessed), vec!["", "", "invalid_report_date"]);
    }

    #[test]
    fn test_duplicates_flag_every_later_occurrence() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team"],
            &[
                &["2024", "5", "NYG"],
                &["2024", "5", "DAL"],
                &["2024", "5", "NYG"],
                &["2024", "5", "NYG"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(
            reasons(&assessed),
            vec!["", "", "duplicate_record", "duplicate_record"]
        );
    }

    #[test]
    fn test_duplicate_detection_sees_quarantined_first_occurrence() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team", "report_date"],
            &[
                &["2024", "5", "NYG", "garbage"],
                &["2024", "5", "NYG", "2024-10-02"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(reasons(&assessed), vec!["invalid_report_date", "duplicate_record"]);
    }

    #[test]
    fn test_blank_key_cells_compare_equal() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team"],
            &[&["2024", "5", ""], &["2024", "5", " "]],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(
            reasons(&assessed),
            vec![
                "missing_required; blank_team",
                "missing_required; blank_team; duplicate_record"
            ]
        );
    }

    #[test]
    fn test_numeric_key_fields_compare_by_value() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team"],
            &[
                &["2024", "5", "NYG"],
                &["2024.0", "05", "NYG"],
                &["+2024", "5", "nyg"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(reasons(&assessed), vec!["", "duplicate_record", ""]);
    }

    #[test]
    fn test_int_hinted_optional_key_field_compares_by_value() {
        let schema = SchemaLoader::parse(
            r#"{
                "required": {"season": "int", "week": "int", "team": "string"},
                "optional": {"jersey": "int", "player": "string"},
                "primary_key": ["season", "week", "team", "jersey", "player"]
            }"#,
        )
        .unwrap();
        let ds = dataset(
            &["season", "week", "team", "jersey", "player"],
            &[
                &["2024", "5", "NYG", "7", "07"],
                &["2024", "5", "NYG", "07", "07"],
                &["2024", "5", "NYG", "7", "7"],
            ],
        );
        let assessed = ValidationEngine::new(&schema).assess(ds);
        assert_eq!(reasons(&assessed), vec!["", "duplicate_record", ""]);
    }

    #[test]
    fn test_duplicate_rule_skipped_without_usable_key() {
        let no_key = SchemaLoader::parse(
            r#"{"required": {"season": "int", "week": "int", "team": "string"}}"#,
        )
        .unwrap();
        let ds = dataset(
            &["season", "week", "team"],
            &[&["2024", "5", "NYG"], &["2024", "5", "NYG"]],
        );
        let assessed = ValidationEngine::new(&no_key).assess(ds.clone());
        assert_eq!(reasons(&assessed), vec!["", ""]);

        let optional_key = SchemaLoader::parse(
            r#"{
                "required": {"season": "int", "week": "int", "team": "string"},
                "optional": {"player": "string"},
                "primary_key": ["season", "player"]
            }"#,
        )
        .unwrap();
        let assessed = ValidationEngine::new(&optional_key).assess(ds);
        assert_eq!(reasons(&assessed), vec!["", ""]);
    }

    #[test]
    fn test_merge_orders_codes_regardless_of_verdict_order() {
        let verdicts = vec![
            RuleVerdicts {
                code: RuleCode::DuplicateRecord,
                flagged: vec![true, false],
            },
            RuleVerdicts {
                code: RuleCode::MissingRequired,
                flagged: vec![true, true],
            },
            RuleVerdicts {
                code: RuleCode::BlankTeam,
                flagged: vec![true, false],
            },
        ];
        let merged = merge_verdicts(2, verdicts);
        assert_eq!(merged[0].to_string(), "missing_required; blank_team; duplicate_record");
        assert_eq!(merged[1].to_string(), "missing_required");
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team", "report_date"],
            &[
                &["2024", "99", "", "bad"],
                &["x", "5", "NYG", ""],
                &["2024", "5", "NYG", "2024-10-02"],
                &["2024", "5", "NYG", "2024-10-02"],
            ],
        );
        let engine = ValidationEngine::new(&schema);
        let first = engine.assess(ds.clone());
        let second = engine.assess(ds);
        assert_eq!(first, second);
        assert_eq!(reasons(&first), reasons(&second));
    }

    #[test]
    fn test_stats_count_codes() {
        let schema = schema();
        let ds = dataset(
            &["season", "week", "team"],
            &[
                &["2024", "5", "NYG"],
                &["2024", "99", ""],
                &["2024", "5", "NYG"],
            ],
        );
        let stats = ValidationEngine::new(&schema).assess(ds).stats();
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.accepted_rows, 1);
        assert_eq!(stats.quarantined_rows, 2);
        assert_eq!(stats.code_counts.get(&RuleCode::BlankTeam), Some(&1));
        assert_eq!(stats.code_counts.get(&RuleCode::DuplicateRecord), Some(&1));
        assert!((stats.quarantine_rate() - 66.666).abs() < 0.01);
    }
}
