// Infrastructure adapters implementing the app ports

pub mod csv_dataset_adapter;

pub use csv_dataset_adapter::{CsvFileSink, CsvFileSource};
