use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::{DatasetSinkPort, DatasetSourcePort, WrittenDataset};
use crate::app::silver_use_case::{SilverRunOutcome, SilverUseCase};
use crate::domain::Dataset;
use crate::error::PipelineError;
use crate::infra::{CsvFileSink, CsvFileSource};
use crate::observability::metrics;
use crate::observability::{RunReporter, Stage};
use crate::pipeline::ingestion::{bronze, raw};
use crate::pipeline::paths::PipelinePaths;
use crate::pipeline::processing::gold;
use crate::pipeline::processing::quality_gate::AssessmentStats;
use crate::pipeline::processing::schema::SchemaLoader;

/// Everything one end-to-end run produced.
#[derive(Debug, Clone)]
pub struct PipelineRunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_csv: PathBuf,
    pub raw_rows: usize,
    pub bronze: WrittenDataset,
    pub silver: WrittenDataset,
    pub quarantine: WrittenDataset,
    pub silver_stats: AssessmentStats,
    pub gold_outputs: Vec<WrittenDataset>,
}

impl PipelineRunResult {
    pub fn bronze_rows(&self) -> usize {
        self.bronze.rows
    }

    pub fn silver_rows(&self) -> usize {
        self.silver.rows
    }

    pub fn quarantined_rows(&self) -> usize {
        self.quarantine.rows
    }

    /// `(location, sha256)` for every file written, in write order.
    pub fn fingerprints(&self) -> Vec<(&str, &str)> {
        [&self.bronze, &self.silver, &self.quarantine]
            .into_iter()
            .chain(self.gold_outputs.iter())
            .map(|w| (w.location.as_str(), w.sha256.as_str()))
            .collect()
    }
}

/// Runs raw -> Bronze -> Silver -> Gold under one root.
pub struct PipelineOrchestrator {
    paths: PipelinePaths,
    reporter: Arc<dyn RunReporter>,
}

impl PipelineOrchestrator {
    pub fn new(paths: PipelinePaths, reporter: Arc<dyn RunReporter>) -> Self {
        Self { paths, reporter }
    }

    pub async fn run(&self) -> Result<PipelineRunResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", run_id = %run_id);
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid) -> Result<PipelineRunResult> {
        let started_at = Utc::now();
        info!(root = %self.paths.root.display(), "Starting pipeline run");
        self.paths
            .ensure_dirs()
            .context("failed to prepare pipeline directories")?;

        let (input_csv, raw_dataset) = self.track(Stage::Raw, self.read_raw()).await?;
        self.reporter.stage_finished(Stage::Raw, raw_dataset.len());

        let (bronze_dataset, bronze) = self
            .track(Stage::Bronze, self.write_bronze(&raw_dataset))
            .await?;
        self.reporter.stage_finished(Stage::Bronze, bronze.rows);

        let silver_outcome = self
            .track(Stage::Silver, self.run_silver(&bronze_dataset))
            .await?;
        self.reporter
            .stage_finished(Stage::Silver, silver_outcome.accepted.rows);

        let gold_outputs = self
            .track(Stage::Gold, self.write_gold(&silver_outcome.accepted_dataset))
            .await?;
        self.reporter.stage_finished(Stage::Gold, gold_outputs.len());

        let finished_at = Utc::now();
        let elapsed = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
        metrics::run_duration(elapsed);

        let result = PipelineRunResult {
            run_id,
            started_at,
            finished_at,
            input_csv,
            raw_rows: raw_dataset.len(),
            bronze,
            silver: silver_outcome.accepted,
            quarantine: silver_outcome.quarantined,
            silver_stats: silver_outcome.stats,
            gold_outputs,
        };
        self.reporter.run_finished(&result);
        Ok(result)
    }

    async fn track<T>(&self, stage: Stage, work: impl Future<Output = Result<T>>) -> Result<T> {
        self.reporter.stage_started(stage);
        work.await.map_err(|e| {
            self.reporter.stage_failed(stage, &e);
            e
        })
    }

    async fn read_raw(&self) -> Result<(PathBuf, Dataset)> {
        let input = raw::locate_raw_csv(&self.paths.raw_dir)?;
        let dataset = CsvFileSource::new(&input).read_dataset().await?;
        Ok((input, dataset))
    }

    async fn write_bronze(&self, raw_dataset: &Dataset) -> Result<(Dataset, WrittenDataset)> {
        let standardized = bronze::standardize(raw_dataset)?;

        let renamed = raw_dataset
            .columns()
            .iter()
            .zip(standardized.columns())
            .filter(|(before, after)| before != after)
            .count();
        metrics::bronze::rows_ingested(standardized.len());
        metrics::bronze::columns_renamed(renamed);

        let written = CsvFileSink::new(&self.paths.bronze_out)
            .write_dataset(&standardized)
            .await?;
        Ok((standardized, written))
    }

    async fn run_silver(&self, bronze_dataset: &Dataset) -> Result<SilverRunOutcome> {
        let schema = SchemaLoader::load(&self.paths.schema_path)
            .map_err(PipelineError::from)
            .with_context(|| {
                format!("failed to load schema {}", self.paths.schema_path.display())
            })?;

        let use_case = SilverUseCase::new(
            schema,
            Box::new(CsvFileSink::new(&self.paths.silver_out)),
            Box::new(CsvFileSink::new(&self.paths.quarantine_out)),
        );
        use_case.run(bronze_dataset).await
    }

    async fn write_gold(&self, silver: &Dataset) -> Result<Vec<WrittenDataset>> {
        let tables = gold::aggregate(silver)?;
        let mut written = Vec::with_capacity(tables.len());
        for table in tables {
            let receipt = CsvFileSink::new(self.paths.gold_dir.join(table.name))
                .write_dataset(&table.dataset)
                .await?;
            metrics::gold::table_written(table.name, receipt.rows);
            written.push(receipt);
        }
        Ok(written)
    }
}
