//! Metrics for the medallion pipeline
//!
//! Counters and histograms are recorded through the `metrics` facade with
//! Prometheus naming. Without an installed recorder every call is a no-op, so
//! library code and tests record freely; the CLI installs a Prometheus
//! recorder and writes a text snapshot at the end of a run.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Bronze metrics
    BronzeRowsIngested,
    BronzeColumnsRenamed,

    // Silver metrics
    SilverRowsAccepted,
    SilverRowsQuarantined,
    SilverReasonCodes,
    SilverBatchSize,
    SilverStructuralFailures,

    // Gold metrics
    GoldTablesWritten,
    GoldRowsWritten,

    // Run metrics
    RunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::BronzeRowsIngested => "medallion_bronze_rows_ingested_total",
            MetricName::BronzeColumnsRenamed => "medallion_bronze_columns_renamed_total",

            MetricName::SilverRowsAccepted => "medallion_silver_rows_accepted_total",
            MetricName::SilverRowsQuarantined => "medallion_silver_rows_quarantined_total",
            MetricName::SilverReasonCodes => "medallion_silver_reason_codes_total",
            MetricName::SilverBatchSize => "medallion_silver_batch_size",
            MetricName::SilverStructuralFailures => "medallion_silver_structural_failures_total",

            MetricName::GoldTablesWritten => "medallion_gold_tables_written_total",
            MetricName::GoldRowsWritten => "medallion_gold_rows_written_total",

            MetricName::RunDuration => "medallion_run_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        [
            MetricName::BronzeRowsIngested,
            MetricName::BronzeColumnsRenamed,
            MetricName::SilverRowsAccepted,
            MetricName::SilverRowsQuarantined,
            MetricName::SilverReasonCodes,
            MetricName::SilverBatchSize,
            MetricName::SilverStructuralFailures,
            MetricName::GoldTablesWritten,
            MetricName::GoldRowsWritten,
            MetricName::RunDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is an error from the
/// `metrics` facade; the first handle stays in place.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    PROMETHEUS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far, if a recorder
/// was installed.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Bronze Metrics
// ============================================================================

pub mod bronze {
    use super::MetricName;

    pub fn rows_ingested(rows: usize) {
        ::metrics::counter!(MetricName::BronzeRowsIngested.as_str()).increment(rows as u64);
    }

    pub fn columns_renamed(count: usize) {
        ::metrics::counter!(MetricName::BronzeColumnsRenamed.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Silver Metrics
// ============================================================================

pub mod silver {
    use super::MetricName;
    use crate::pipeline::processing::quality_gate::AssessmentStats;

    /// Record the outcome of one Silver batch
    pub fn batch_processed(stats: &AssessmentStats) {
        ::metrics::histogram!(MetricName::SilverBatchSize.as_str()).record(stats.total_rows as f64);
        ::metrics::counter!(MetricName::SilverRowsAccepted.as_str())
            .increment(stats.accepted_rows as u64);
        ::metrics::counter!(MetricName::SilverRowsQuarantined.as_str())
            .increment(stats.quarantined_rows as u64);

        for (code, count) in &stats.code_counts {
            ::metrics::counter!(MetricName::SilverReasonCodes.as_str(), "code" => code.as_str())
                .increment(*count as u64);
        }
    }

    pub fn structural_failure() {
        ::metrics::counter!(MetricName::SilverStructuralFailures.as_str()).increment(1);
    }
}

// ============================================================================
// Gold Metrics
// ============================================================================

pub mod gold {
    use super::MetricName;

    pub fn table_written(table: &'static str, rows: usize) {
        ::metrics::counter!(MetricName::GoldTablesWritten.as_str(), "table" => table).increment(1);
        ::metrics::counter!(MetricName::GoldRowsWritten.as_str(), "table" => table)
            .increment(rows as u64);
    }
}

pub fn run_duration(seconds: f64) {
    ::metrics::histogram!(MetricName::RunDuration.as_str()).record(seconds);
}
