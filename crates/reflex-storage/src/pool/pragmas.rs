//! Connection pragmas applied at open time.

use rusqlite::Connection;

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

/// Apply standard pragmas. WAL only makes sense for file-backed
/// databases; in-memory connections skip it.
pub fn apply(conn: &Connection, file_backed: bool) -> ReflexResult<()> {
    if file_backed {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| to_storage_err(format!("journal_mode: {e}")))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| to_storage_err(format!("synchronous: {e}")))?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| to_storage_err(format!("foreign_keys: {e}")))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(|e| to_storage_err(format!("busy_timeout: {e}")))?;
    Ok(())
}
