//! Cross-table maintenance queries.

use rusqlite::{params, Connection};

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

/// Every owner with any engine state.
pub fn distinct_owners(conn: &Connection) -> ReflexResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT owner_id FROM predictions
             UNION SELECT DISTINCT owner_id FROM domain_states
             UNION SELECT DISTINCT owner_id FROM genes",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Delete every row belonging to the owner, in one transaction.
/// Used only by clearing imports.
pub fn clear_owner(conn: &Connection, owner: &str) -> ReflexResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("clear owner begin: {e}")))?;
    for table in [
        "predictions",
        "outcomes",
        "domain_states",
        "domain_history",
        "patterns",
        "genes",
        "gene_audit_log",
        "calibration_snapshots",
    ] {
        tx.execute(
            &format!("DELETE FROM {table} WHERE owner_id = ?1"),
            params![owner],
        )
        .map_err(|e| to_storage_err(format!("clear {table}: {e}")))?;
    }
    tx.commit()
        .map_err(|e| to_storage_err(format!("clear owner commit: {e}")))?;
    Ok(())
}
