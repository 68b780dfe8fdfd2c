//! Run history trait and error types

use crate::model::CountryOutcome;
use crate::storage::{CountryResultRecord, RunCompletion, RunRecord};
use thiserror::Error;

/// Errors that can occur during run history operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown status `{0}` in history")]
    UnknownStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Record of collection runs and their per-country outcomes
pub trait RunHistory: Send {
    /// Opens a new run in the `running` state and returns its ID
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Stores the terminal status of every country of a run
    fn record_countries(&mut self, run_id: i64, outcomes: &[CountryOutcome]) -> StorageResult<()>;

    /// Closes a run with its outcome and tally
    fn finish_run(&mut self, run_id: i64, completion: &RunCompletion) -> StorageResult<()>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets the country results of a run, in country order
    fn country_results(&self, run_id: i64) -> StorageResult<Vec<CountryResultRecord>>;
}
