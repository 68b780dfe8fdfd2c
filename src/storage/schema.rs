//! Database schema definitions for the run history

/// SQL schema for the run history database
pub const SCHEMA_SQL: &str = r#"
-- One row per collection run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    entity_count INTEGER NOT NULL DEFAULT 0,
    countries_ok INTEGER NOT NULL DEFAULT 0,
    countries_partial INTEGER NOT NULL DEFAULT 0,
    countries_failed INTEGER NOT NULL DEFAULT 0,
    cancelled INTEGER NOT NULL DEFAULT 0,
    dataset_written INTEGER NOT NULL DEFAULT 0
);

-- Terminal status of every country searched in a run
CREATE TABLE IF NOT EXISTS country_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    country TEXT NOT NULL,
    status TEXT NOT NULL,
    rows_seen INTEGER NOT NULL DEFAULT 0,
    entities INTEGER NOT NULL DEFAULT 0,
    rows_lost INTEGER NOT NULL DEFAULT 0,
    failure_reason TEXT,
    UNIQUE(run_id, country)
);

CREATE INDEX IF NOT EXISTS idx_country_results_run ON country_results(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
