use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::constants::{CONFIG_FILE, ROOT_ENV_VAR, SCHEMA_PATH};
use crate::error::{PipelineError, Result};
use crate::pipeline::PipelinePaths;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub root: PathBuf,
    /// Relative paths resolve against `root`.
    pub schema: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            schema: PathBuf::from(SCHEMA_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "medallion.log".to_string(),
            default_filter: "medallion_pipeline=info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `pipeline.toml` under the
    /// root (`PIPELINE_ROOT`, else the current directory) is used when present
    /// and defaults otherwise. `PIPELINE_ROOT` wins over the configured root.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let root_override = std::env::var(ROOT_ENV_VAR)
            .ok()
            .filter(|root| !root.trim().is_empty())
            .map(PathBuf::from);
        Self::load_with_root(path, root_override)
    }

    pub fn load_with_root(path: Option<&Path>, root_override: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = root_override
                    .as_deref()
                    .unwrap_or_else(|| Path::new("."))
                    .join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(root) = root_override {
            config.paths.root = root;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Stage paths for this configuration.
    pub fn pipeline_paths(&self) -> PipelinePaths {
        PipelinePaths::new(&self.paths.root).with_schema_path(&self.paths.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::parse("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.logging.default_filter, "medallion_pipeline=info");
        assert_eq!(config.paths.schema, PathBuf::from(SCHEMA_PATH));
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = PipelineConfig::parse(
            r#"
            [paths]
            root = "/srv/injuries"

            [logging]
            default_filter = "medallion_pipeline=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/srv/injuries"));
        assert_eq!(config.paths.schema, PathBuf::from(SCHEMA_PATH));
        assert_eq!(config.logging.directory, PathBuf::from("logs"));
        assert_eq!(config.logging.default_filter, "medallion_pipeline=debug");
    }

    #[test]
    fn test_pipeline_paths_resolve_schema_against_root() {
        let config = PipelineConfig::parse(
            r#"
            [paths]
            root = "/srv/injuries"
            schema = "conf/schema.json"
            "#,
        )
        .unwrap();
        let paths = config.pipeline_paths();
        assert_eq!(paths.schema_path, PathBuf::from("/srv/injuries/conf/schema.json"));
        assert_eq!(paths.raw_dir, PathBuf::from("/srv/injuries/data/raw"));
    }

    #[test]
    fn test_default_file_is_found_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[logging]\ndefault_filter = \"medallion_pipeline=trace\"\n",
        )
        .unwrap();

        let config = PipelineConfig::load_with_root(None, Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.logging.default_filter, "medallion_pipeline=trace");
        assert_eq!(config.paths.root, dir.path());
    }

    #[test]
    fn test_root_override_beats_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "[paths]\nroot = \"/srv/injuries\"\n").unwrap();

        let config =
            PipelineConfig::load_with_root(Some(&file), Some(PathBuf::from("/data/run"))).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/data/run"));

        let config = PipelineConfig::load_with_root(Some(&file), None).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/srv/injuries"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = PipelineConfig::parse("[paths\nroot = 1").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
