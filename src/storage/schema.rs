//! Database schema definitions and connection setup.

use rusqlite::{Connection, Result};
use std::time::Duration;

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Default busy timeout for every connection, writer and readers alike.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// The complete SQL schema for the snapshot database.
pub const SCHEMA_SQL: &str = r"
    -- One row per ingestion run. The generation orders runs and pins readers.
    CREATE TABLE IF NOT EXISTS snapshot_runs (
        generation INTEGER PRIMARY KEY AUTOINCREMENT,
        datestamp TEXT NOT NULL,
        issue_count INTEGER NOT NULL,
        ingested_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_snapshot_runs_datestamp ON snapshot_runs(datestamp);

    -- One row per (issue, day, generation).
    -- A row is visible at pin P when generation <= P and it has not been
    -- superseded at or before P.
    CREATE TABLE IF NOT EXISTS issue_rows (
        id INTEGER NOT NULL,
        component TEXT NOT NULL DEFAULT '',
        target_release TEXT NOT NULL DEFAULT '',
        assignee TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT '',
        summary TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '[]',
        pm_score INTEGER NOT NULL DEFAULT 0,
        externals TEXT NOT NULL DEFAULT '[]',
        datestamp TEXT NOT NULL,
        generation INTEGER NOT NULL,
        superseded_by INTEGER,
        CHECK (length(datestamp) = 10),
        FOREIGN KEY (generation) REFERENCES snapshot_runs(generation),
        FOREIGN KEY (superseded_by) REFERENCES snapshot_runs(generation)
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_issue_rows_version
        ON issue_rows(datestamp, id, generation);
    CREATE INDEX IF NOT EXISTS idx_issue_rows_id ON issue_rows(id, datestamp);
    CREATE INDEX IF NOT EXISTS idx_issue_rows_target ON issue_rows(target_release, datestamp);
    CREATE INDEX IF NOT EXISTS idx_issue_rows_component ON issue_rows(component, datestamp);
    CREATE INDEX IF NOT EXISTS idx_issue_rows_superseded
        ON issue_rows(superseded_by) WHERE superseded_by IS NOT NULL;
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set journal mode to WAL so readers never block the ingestion writer
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

    Ok(())
}

/// Settings shared by every connection the store opens.
///
/// # Errors
///
/// Returns an error if a pragma cannot be set.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// Restrict a pooled reader so it can never write.
///
/// # Errors
///
/// Returns an error if the pragma cannot be set.
pub fn configure_reader(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    configure_connection(conn, busy_timeout_ms)?;
    conn.pragma_update(None, "query_only", "ON")?;
    Ok(())
}
