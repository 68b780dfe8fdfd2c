//! SQLite run history implementation

use crate::model::{CountryOutcome, RunTally};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RunHistory, StorageError, StorageResult};
use crate::storage::{CountryResultRecord, RunCompletion, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, entity_count, \
     countries_ok, countries_partial, countries_failed, cancelled, dataset_written";

/// SQLite run history backend
pub struct SqliteRunHistory {
    conn: Connection,
}

impl SqliteRunHistory {
    /// Opens or creates the history database at `path`
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRunHistory)` - Database opened with the schema in place
    /// * `Err(StorageError)` - The file could not be opened or initialized
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sanctions_sweep::storage::{RunHistory, SqliteRunHistory};
    /// use std::path::Path;
    ///
    /// let history = SqliteRunHistory::new(Path::new("data/history.db")).unwrap();
    /// if let Some(run) = history.latest_run().unwrap() {
    ///     println!("Last run: {}", run.status);
    /// }
    /// ```
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Maps a `runs` row selected with `RUN_COLUMNS`
fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(4)?;
    let record = RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::Running,
        entity_count: row.get::<_, i64>(5)? as usize,
        tally: RunTally {
            ok: row.get::<_, i64>(6)? as usize,
            partial: row.get::<_, i64>(7)? as usize,
            failed: row.get::<_, i64>(8)? as usize,
        },
        cancelled: row.get::<_, i64>(9)? != 0,
        dataset_written: row.get::<_, i64>(10)? != 0,
    };
    Ok((record, status))
}

fn with_status((mut record, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    record.status =
        RunStatus::from_db_string(&status).ok_or(StorageError::UnknownStatus(status))?;
    Ok(record)
}

impl RunHistory for SqliteRunHistory {
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_countries(&mut self, run_id: i64, outcomes: &[CountryOutcome]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO country_results
                 (run_id, country, status, rows_seen, entities, rows_lost, failure_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for outcome in outcomes {
                let reason = match &outcome.status {
                    crate::model::CountryStatus::Failed { reason } => Some(reason.as_str()),
                    _ => None,
                };
                stmt.execute(params![
                    run_id,
                    outcome.country,
                    outcome.status.to_db_string(),
                    outcome.rows_seen as i64,
                    outcome.entities as i64,
                    outcome.status.rows_lost() as i64,
                    reason,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, completion: &RunCompletion) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, entity_count = ?3,
                 countries_ok = ?4, countries_partial = ?5, countries_failed = ?6,
                 cancelled = ?7, dataset_written = ?8
             WHERE id = ?9",
            params![
                now,
                completion.outcome.to_db_string(),
                completion.entity_count as i64,
                completion.tally.ok as i64,
                completion.tally.partial as i64,
                completion.tally.failed as i64,
                completion.cancelled,
                completion.dataset_written,
                run_id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;
        with_status(row)
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, [], run_from_row)
            .optional()?
            .map(with_status)
            .transpose()
    }

    fn country_results(&self, run_id: i64) -> StorageResult<Vec<CountryResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT country, status, rows_seen, entities, rows_lost, failure_reason
             FROM country_results WHERE run_id = ?1 ORDER BY country",
        )?;

        let results = stmt
            .query_map(params![run_id], |row| {
                Ok(CountryResultRecord {
                    country: row.get(0)?,
                    status: row.get(1)?,
                    rows_seen: row.get::<_, i64>(2)? as usize,
                    entities: row.get::<_, i64>(3)? as usize,
                    rows_lost: row.get::<_, i64>(4)? as usize,
                    failure_reason: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(results)
    }
}
