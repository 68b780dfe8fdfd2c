//! Storage module for the collection run history
//!
//! The dataset itself is a CSV file (see `output`). This module keeps a SQLite
//! log of every run: when it ran, which configuration produced it, its
//! outcome and the terminal status of each country.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRunHistory;
pub use traits::{RunHistory, StorageError, StorageResult};

use crate::model::{RunOutcome, RunTally};

/// Represents a collection run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub entity_count: usize,
    pub tally: RunTally,
    pub cancelled: bool,
    pub dataset_written: bool,
}

/// Everything recorded when a run finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCompletion {
    pub outcome: RunOutcome,
    pub tally: RunTally,
    pub entity_count: usize,
    pub cancelled: bool,
    pub dataset_written: bool,
}

/// Stored terminal status of one country in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryResultRecord {
    pub country: String,
    pub status: String,
    pub rows_seen: usize,
    pub entities: usize,
    pub rows_lost: usize,
    pub failure_reason: Option<String>,
}

/// Status of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finished(RunOutcome),
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished(outcome) => outcome.to_db_string(),
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            other => RunOutcome::from_db_string(other).map(Self::Finished),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}
