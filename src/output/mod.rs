//! Output module for the collected dataset
//!
//! This module handles:
//! - Materializing the deduplicated, normalized dataset
//! - Writing it atomically as CSV and reading it back
//! - Terminal reports for runs and per-country rows

mod builder;
mod file;
pub mod report;

pub use builder::{Dataset, DatasetBuilder, ADDRESSES_COLUMN, ALIASES_COLUMN, FIXED_COLUMNS};
pub use file::{dataset_exists, read_dataset, write_dataset, LoadedDataset, LoadedRow};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid base URL for links: {0}")]
    InvalidBaseUrl(String),

    #[error("Dataset file lacks the `{0}` column")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to replace dataset file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
