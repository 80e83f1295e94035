/// Column and file name constants to ensure consistency across the stages

// Columns the validation rules read directly
pub const SEASON_COLUMN: &str = "season";
pub const WEEK_COLUMN: &str = "week";
pub const TEAM_COLUMN: &str = "team";
pub const REPORT_DATE_COLUMN: &str = "report_date";
pub const POSITION_COLUMN: &str = "position";

// Trailing column appended to the quarantine partition
pub const QUARANTINE_REASON_COLUMN: &str = "quarantine_reason";

// Separator between reason codes in a quarantine reason
pub const REASON_SEPARATOR: &str = "; ";

// Gold aggregate count column
pub const INJURY_COUNT_COLUMN: &str = "injury_count";

// Default inclusive week bounds when the schema does not declare them
pub const DEFAULT_WEEK_RANGE: (i64, i64) = (1, 22);

// Filesystem layout (relative to the pipeline root)
pub const RAW_DIR: &str = "data/raw";
pub const BRONZE_DIR: &str = "data/bronze";
pub const SILVER_DIR: &str = "data/silver";
pub const QUARANTINE_DIR: &str = "data/quarantine";
pub const GOLD_DIR: &str = "data/gold";
pub const SCHEMA_PATH: &str = "schema/injuries_schema.json";
pub const METRICS_SNAPSHOT_PATH: &str = "data/metrics.prom";

// File names
pub const PREFERRED_RAW_FILE: &str = "injuries_raw.csv";
pub const BRONZE_FILE: &str = "injuries_bronze.csv";
pub const SILVER_FILE: &str = "injuries_silver.csv";
pub const QUARANTINE_FILE: &str = "injuries_quarantine.csv";
pub const GOLD_BY_TEAM_WEEK_FILE: &str = "injuries_by_team_week.csv";
pub const GOLD_BY_POSITION_FILE: &str = "injuries_by_position.csv";

// Default configuration file, looked up under PIPELINE_ROOT or the current directory
pub const CONFIG_FILE: &str = "pipeline.toml";

// Environment variable that overrides the pipeline root
pub const ROOT_ENV_VAR: &str = "PIPELINE_ROOT";
