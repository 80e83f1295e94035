pub mod common;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

// Dataset shapes shared across layers
pub mod domain;
