// Pipeline ingestion: raw input discovery and Bronze standardization

pub mod bronze;
pub mod raw;
