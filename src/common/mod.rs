// Common constants shared across stages

pub mod constants;
