use async_trait::async_trait;
use serde::Serialize;

use crate::domain::Dataset;

/// Receipt for a persisted dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WrittenDataset {
    pub location: String,
    pub rows: usize,
    /// Hex SHA-256 of the exact bytes written
    pub sha256: String,
}

// Persistence collaborator for stage outputs
#[async_trait]
pub trait DatasetSinkPort: Send + Sync {
    async fn write_dataset(&self, dataset: &Dataset) -> anyhow::Result<WrittenDataset>;

    /// Withdraw a dataset this sink wrote, when its companion output failed.
    async fn discard(&self, written: &WrittenDataset) -> anyhow::Result<()>;
}

// Source of a tabular snapshot
#[async_trait]
pub trait DatasetSourcePort: Send + Sync {
    async fn read_dataset(&self) -> anyhow::Result<Dataset>;
}
