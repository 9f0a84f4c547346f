//! Versioned schema migrations, tracked in `schema_version`.

pub mod v001_engine_tables;

use rusqlite::Connection;

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

const MIGRATIONS: &[(u32, fn(&Connection) -> ReflexResult<()>)] =
    &[(1, v001_engine_tables::migrate)];

/// Run all migrations newer than the stored schema version.
pub fn run_migrations(conn: &Connection) -> ReflexResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(format!("schema_version: {e}")))?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(format!("read schema version: {e}")))?;

    for (version, migrate) in MIGRATIONS {
        if *version > current {
            migrate(conn)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )
            .map_err(|e| to_storage_err(format!("record migration v{version}: {e}")))?;
            tracing::info!(version, "applied migration");
        }
    }
    Ok(())
}
