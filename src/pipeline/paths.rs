use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::common::constants::{
    BRONZE_DIR, BRONZE_FILE, GOLD_DIR, METRICS_SNAPSHOT_PATH, QUARANTINE_DIR, QUARANTINE_FILE,
    RAW_DIR, SCHEMA_PATH, SILVER_DIR, SILVER_FILE,
};
use crate::error::Result;

/// Where each stage reads and writes under one pipeline root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub root: PathBuf,
    pub raw_dir: PathBuf,
    pub bronze_dir: PathBuf,
    pub silver_dir: PathBuf,
    pub gold_dir: PathBuf,
    pub quarantine_dir: PathBuf,
    pub schema_path: PathBuf,

    pub bronze_out: PathBuf,
    pub silver_out: PathBuf,
    pub quarantine_out: PathBuf,
    pub metrics_snapshot: PathBuf,
}

impl PipelinePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let bronze_dir = root.join(BRONZE_DIR);
        let silver_dir = root.join(SILVER_DIR);
        let quarantine_dir = root.join(QUARANTINE_DIR);

        Self {
            raw_dir: root.join(RAW_DIR),
            gold_dir: root.join(GOLD_DIR),
            schema_path: root.join(SCHEMA_PATH),
            bronze_out: bronze_dir.join(BRONZE_FILE),
            silver_out: silver_dir.join(SILVER_FILE),
            quarantine_out: quarantine_dir.join(QUARANTINE_FILE),
            metrics_snapshot: root.join(METRICS_SNAPSHOT_PATH),
            bronze_dir,
            silver_dir,
            quarantine_dir,
            root,
        }
    }

    /// Override the schema location (e.g. from configuration).
    pub fn with_schema_path(mut self, schema_path: impl AsRef<Path>) -> Self {
        let schema_path = schema_path.as_ref();
        self.schema_path = if schema_path.is_absolute() {
            schema_path.to_path_buf()
        } else {
            self.root.join(schema_path)
        };
        self
    }

    /// Create every stage directory. A missing schema is only warned about.
    pub fn ensure_dirs(&self) -> Result<()> {
        debug!(root = %self.root.display(), "Ensuring pipeline directories exist");
        for dir in [
            &self.raw_dir,
            &self.bronze_dir,
            &self.silver_dir,
            &self.gold_dir,
            &self.quarantine_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        if let Some(parent) = self.schema_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !self.schema_path.exists() {
            warn!(path = %self.schema_path.display(), "Schema file not found");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let paths = PipelinePaths::new("/srv/pipeline");
        assert_eq!(paths.raw_dir, PathBuf::from("/srv/pipeline/data/raw"));
        assert_eq!(
            paths.quarantine_out,
            PathBuf::from("/srv/pipeline/data/quarantine/injuries_quarantine.csv")
        );
        assert_eq!(
            paths.schema_path,
            PathBuf::from("/srv/pipeline/schema/injuries_schema.json")
        );
    }

    #[test]
    fn test_schema_override_is_resolved_against_root() {
        let paths = PipelinePaths::new("/srv/pipeline").with_schema_path("conf/s.json");
        assert_eq!(paths.schema_path, PathBuf::from("/srv/pipeline/conf/s.json"));
        let paths = PipelinePaths::new("/srv/pipeline").with_schema_path("/etc/s.json");
        assert_eq!(paths.schema_path, PathBuf::from("/etc/s.json"));
    }

    #[test]
    fn test_ensure_dirs_creates_stage_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PipelinePaths::new(dir.path());
        paths.ensure_dirs().unwrap();
        assert!(paths.raw_dir.is_dir());
        assert!(paths.bronze_dir.is_dir());
        assert!(paths.silver_dir.is_dir());
        assert!(paths.gold_dir.is_dir());
        assert!(paths.quarantine_dir.is_dir());
        assert!(paths.schema_path.parent().unwrap().is_dir());
    }
}
