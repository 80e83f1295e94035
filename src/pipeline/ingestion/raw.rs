use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::common::constants::PREFERRED_RAW_FILE;
use crate::error::{PipelineError, Result};

/// Pick the raw CSV to ingest: `injuries_raw.csv` when present, otherwise the
/// first `*.csv` by file name.
pub fn locate_raw_csv(raw_dir: &Path) -> Result<PathBuf> {
    let preferred = raw_dir.join(PREFERRED_RAW_FILE);
    if preferred.is_file() {
        info!(path = %preferred.display(), "Using preferred raw input");
        return Ok(preferred);
    }

    let mut csvs: Vec<PathBuf> = match fs::read_dir(raw_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv")
            })
            .collect(),
        Err(e) => {
            debug!(dir = %raw_dir.display(), error = %e, "Raw directory unreadable");
            Vec::new()
        }
    };
    csvs.sort();

    let first = csvs
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::NoRawInput(raw_dir.display().to_string()))?;
    info!(path = %first.display(), "Using raw input");
    Ok(first)
}
