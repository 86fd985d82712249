use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `dar_jobs` table (idempotent) and an index on `next_run` so the
/// due-job query stays cheap.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS dar_jobs (
            id                  TEXT    NOT NULL PRIMARY KEY,
            name                TEXT    NOT NULL,
            trigger             TEXT    NOT NULL,   -- JSON-encoded Trigger
            payload             TEXT    NOT NULL,   -- JSON runner arguments
            misfire_grace_secs  INTEGER NOT NULL,
            next_run            TEXT,               -- RFC3339 UTC, NULL while paused
            last_run            TEXT,
            run_count           INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_dar_jobs_next_run ON dar_jobs (next_run);
        ",
    )?;
    Ok(())
}
