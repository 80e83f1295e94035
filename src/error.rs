use thiserror::Error;

/// Problems with the declarative schema description.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read schema file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schema is not valid structured data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("primary_key references undeclared field(s): {}", .0.join(", "))]
    UnknownKeyField(Vec<String>),

    #[error("primary_key lists field '{0}' more than once")]
    RepeatedKeyField(String),

    #[error("field '{0}' is declared both required and optional")]
    ConflictingField(String),

    #[error("week_range lower bound {lo} is greater than upper bound {hi}")]
    InvertedWeekRange { lo: i64, hi: i64 },
}

/// Which failure tier an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    /// Bad schema or bad input shape; the stage aborts before classifying rows.
    Structural,
    /// Validation and normalization disagree; a logic bug, never a data problem.
    InternalConsistency,
    /// Filesystem, encoding or configuration problems around the pipeline.
    Environment,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("input is missing required columns: {}", .missing.join(", "))]
    StructuralViolation { missing: Vec<String> },

    #[error("columns '{first}' and '{second}' both normalize to '{normalized}'")]
    DuplicateColumn {
        first: String,
        second: String,
        normalized: String,
    },

    #[error("row {row} has {found} cells but the dataset has {expected} columns")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("no CSV found in {0}; put a file there and re-run")]
    NoRawInput(String),

    #[error(
        "internal consistency violation: accepted row {row} has unparseable {column} value {value:?}"
    )]
    InternalConsistency {
        row: usize,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn tier(&self) -> ErrorTier {
        match self {
            PipelineError::Schema(_)
            | PipelineError::StructuralViolation { .. }
            | PipelineError::DuplicateColumn { .. }
            | PipelineError::RowShape { .. }
            | PipelineError::NoRawInput(_) => ErrorTier::Structural,
            PipelineError::InternalConsistency { .. } => ErrorTier::InternalConsistency,
            PipelineError::Csv(_)
            | PipelineError::Json(_)
            | PipelineError::Toml(_)
            | PipelineError::Io(_)
            | PipelineError::Config(_) => ErrorTier::Environment,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Process exit status for structural and schema failures.
pub const EXIT_STRUCTURAL: u8 = 65;
/// Process exit status for internal-consistency failures.
pub const EXIT_INTERNAL: u8 = 70;
/// Process exit status for everything else.
pub const EXIT_FAILURE: u8 = 1;

impl ErrorTier {
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorTier::Structural => EXIT_STRUCTURAL,
            ErrorTier::InternalConsistency => EXIT_INTERNAL,
            ErrorTier::Environment => EXIT_FAILURE,
        }
    }
}

/// Exit status for an application error: the tier of the first pipeline or
/// schema error in its cause chain, or a generic failure.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<PipelineError>() {
                Some(e.tier())
            } else {
                cause
                    .downcast_ref::<SchemaError>()
                    .map(|_| ErrorTier::Structural)
            }
        })
        .map_or(EXIT_FAILURE, |tier| tier.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_violation_lists_every_missing_column() {
        let err = PipelineError::StructuralViolation {
            missing: vec!["week".to_string(), "team".to_string()],
        };
        assert_eq!(err.to_string(), "input is missing required columns: week, team");
        assert_eq!(err.tier(), ErrorTier::Structural);
    }

    #[test]
    fn test_internal_consistency_has_its_own_tier() {
        let err = PipelineError::InternalConsistency {
            row: 3,
            column: "season".to_string(),
            value: "x".to_string(),
        };
        assert_eq!(err.tier(), ErrorTier::InternalConsistency);
        assert_ne!(err.tier(), ErrorTier::Structural);
    }

    #[test]
    fn test_exit_codes_follow_the_first_typed_cause() {
        use anyhow::Context;

        let structural: anyhow::Result<()> = Err(PipelineError::StructuralViolation {
            missing: vec!["week".to_string()],
        })
        .context("silver stage failed");
        assert_eq!(exit_code_for(&structural.unwrap_err()), EXIT_STRUCTURAL);

        let schema: anyhow::Result<()> =
            Err(PipelineError::from(SchemaError::RepeatedKeyField("team".to_string())))
                .context("failed to load schema");
        assert_eq!(exit_code_for(&schema.unwrap_err()), EXIT_STRUCTURAL);

        let bare_schema = anyhow::Error::new(SchemaError::InvertedWeekRange { lo: 9, hi: 1 })
            .context("check-schema");
        assert_eq!(exit_code_for(&bare_schema), EXIT_STRUCTURAL);

        let internal: anyhow::Result<()> = Err(PipelineError::InternalConsistency {
            row: 0,
            column: "week".to_string(),
            value: "x".to_string(),
        })
        .context("silver stage failed");
        assert_eq!(exit_code_for(&internal.unwrap_err()), EXIT_INTERNAL);

        let config = anyhow::Error::new(PipelineError::Config("bad".to_string()));
        assert_eq!(exit_code_for(&config), EXIT_FAILURE);

        assert_eq!(exit_code_for(&anyhow::anyhow!("disk full")), EXIT_FAILURE);
    }

    #[test]
    fn test_schema_errors_are_structural() {
        let err: PipelineError = SchemaError::InvertedWeekRange { lo: 5, hi: 1 }.into();
        assert_eq!(err.tier(), ErrorTier::Structural);
    }
}
