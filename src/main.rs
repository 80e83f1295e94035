use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use anyhow::Context;
use medallion_pipeline::app::silver_use_case::SilverUseCase;
use medallion_pipeline::config::PipelineConfig;
use medallion_pipeline::error::{exit_code_for, PipelineError, EXIT_FAILURE};
use medallion_pipeline::infra::csv_dataset_adapter::read_csv;
use medallion_pipeline::infra::CsvFileSink;
use medallion_pipeline::observability::{self, metrics, TracingRunReporter};
use medallion_pipeline::pipeline::processing::SchemaLoader;
use medallion_pipeline::pipeline::{PipelineOrchestrator, PipelinePaths};

#[derive(Parser)]
#[command(name = "medallion")]
#[command(about = "Bronze/Silver/Gold pipeline for weekly injury reports")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to pipeline.toml under PIPELINE_ROOT or ./ when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: raw -> Bronze -> Silver -> Gold
    Run {
        /// Pipeline root holding data/ and schema/
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Run only the Silver stage over an already standardized CSV
    Silver {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        accepted: PathBuf,
        #[arg(long)]
        quarantine: PathBuf,
    },
    /// Load a schema file and print what it declares
    CheckSchema { file: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let _guard = observability::init_logging(&config.logging);
    if let Err(e) = metrics::init() {
        warn!("Metrics recorder not installed: {}", e);
    }

    let outcome = match cli.command {
        Commands::Run { root } => run_pipeline(&config, root).await,
        Commands::Silver {
            input,
            schema,
            accepted,
            quarantine,
        } => run_silver_only(&input, &schema, accepted, quarantine).await,
        Commands::CheckSchema { file } => check_schema(&file),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            println!("❌ {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run_pipeline(config: &PipelineConfig, root: Option<PathBuf>) -> anyhow::Result<()> {
    let paths = match root {
        Some(root) => PipelinePaths::new(root).with_schema_path(&config.paths.schema),
        None => config.pipeline_paths(),
    };
    let snapshot_path = paths.metrics_snapshot.clone();

    println!("🚀 Running full pipeline under {}", paths.root.display());
    let orchestrator = PipelineOrchestrator::new(paths, Arc::new(TracingRunReporter));
    let result = orchestrator.run().await;
    write_metrics_snapshot(&snapshot_path).await;
    let result = result?;

    println!(
        "✅ Run {} complete: {} accepted, {} quarantined, {} gold tables",
        result.run_id,
        result.silver_rows(),
        result.quarantined_rows(),
        result.gold_outputs.len()
    );
    Ok(())
}

async fn run_silver_only(
    input: &Path,
    schema_path: &Path,
    accepted: PathBuf,
    quarantine: PathBuf,
) -> anyhow::Result<()> {
    let schema = SchemaLoader::load(schema_path)
        .map_err(PipelineError::from)
        .with_context(|| format!("failed to load schema {}", schema_path.display()))?;
    let bronze = read_csv(input).with_context(|| format!("failed to read {}", input.display()))?;

    let use_case = SilverUseCase::new(
        schema,
        Box::new(CsvFileSink::new(accepted)),
        Box::new(CsvFileSink::new(quarantine)),
    );
    let outcome = use_case.run(&bronze).await?;

    for (code, count) in &outcome.stats.code_counts {
        info!(code = code.as_str(), count, "Quarantine reason");
    }
    println!(
        "✅ Silver complete: {} accepted -> {}, {} quarantined -> {}",
        outcome.accepted.rows,
        outcome.accepted.location,
        outcome.quarantined.rows,
        outcome.quarantined.location
    );
    Ok(())
}

fn check_schema(file: &Path) -> anyhow::Result<()> {
    let schema = SchemaLoader::load(file)
        .map_err(PipelineError::from)
        .with_context(|| format!("failed to load schema {}", file.display()))?;

    println!("✅ Schema {} is valid", file.display());
    println!("   required:    {}", schema.required_names().collect::<Vec<_>>().join(", "));
    println!("   optional:    {}", schema.optional_names().collect::<Vec<_>>().join(", "));
    println!("   primary_key: {}", schema.primary_key().join(", "));
    let range = schema.week_range();
    println!("   week_range:  {}..={}", range.lo, range.hi);
    Ok(())
}

async fn write_metrics_snapshot(path: &Path) {
    let Some(rendered) = metrics::render() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Failed to create {}: {}", dir.display(), e);
            return;
        }
    }
    match tokio::fs::write(path, rendered).await {
        Ok(()) => info!(path = %path.display(), "Wrote metrics snapshot"),
        Err(e) => warn!("Failed to write metrics snapshot {}: {}", path.display(), e),
    }
}
