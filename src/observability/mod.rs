// Observability: logging, metrics, and run reporting

pub mod logging;
pub mod metrics;
pub mod reporting;

// Re-export main functions for ease of use
pub use logging::init_logging;
pub use reporting::{RunReporter, Stage, TracingRunReporter};
