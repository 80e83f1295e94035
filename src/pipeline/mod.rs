// Batch pipeline: ingestion (raw, Bronze), processing (Silver, Gold) and orchestration

pub mod ingestion;
pub mod orchestrator;
pub mod paths;
pub mod processing;

// Re-export key types and functions from each stage
pub use orchestrator::{PipelineOrchestrator, PipelineRunResult};
pub use paths::PipelinePaths;
