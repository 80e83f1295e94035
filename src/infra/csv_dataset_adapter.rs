use anyhow::Context;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::app::ports::{DatasetSinkPort, DatasetSourcePort, WrittenDataset};
use crate::domain::{Cell, Dataset, Row};
use crate::error::Result;

/// Read a CSV file with a header row. Empty fields become `Null`; everything
/// else is kept verbatim as text.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut dataset = Dataset::new(columns);
    for record in reader.records() {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Null
                } else {
                    Cell::text(field)
                }
            })
            .collect();
        dataset.push_row(Row::new(cells))?;
    }
    Ok(dataset)
}

/// Render a dataset as CSV bytes: header row, then one record per row.
pub fn encode_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.cells().iter().map(|c| c.to_string()))?;
    }
    writer.into_inner().map_err(|e| {
        std::io::Error::new(e.error().kind(), e.error().to_string()).into()
    })
}

/// Hex SHA-256 of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write `bytes` next to `path` and rename into place so readers never see a
/// half-written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

/// File-based implementation of DatasetSinkPort
/// Writes a dataset to a single CSV file
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSinkPort for CsvFileSink {
    async fn write_dataset(&self, dataset: &Dataset) -> anyhow::Result<WrittenDataset> {
        let bytes = encode_csv(dataset)?;
        write_atomic(&self.path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        let written = WrittenDataset {
            location: self.path.display().to_string(),
            rows: dataset.len(),
            sha256: fingerprint(&bytes),
        };
        info!(path = %written.location, rows = written.rows, sha256 = %written.sha256, "Wrote dataset");
        Ok(written)
    }

    async fn discard(&self, written: &WrittenDataset) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                warn!(path = %written.location, "Discarded dataset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

/// File-based implementation of DatasetSourcePort
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSourcePort for CsvFileSource {
    async fn read_dataset(&self) -> anyhow::Result<Dataset> {
        let dataset = read_csv(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        info!(path = %self.path.display(), rows = dataset.len(), "Read dataset");
        Ok(dataset)
    }
}
