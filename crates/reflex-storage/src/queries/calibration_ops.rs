//! Append-only calibration snapshot time series.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::CalibrationSnapshot;

use crate::to_storage_err;

use super::parse_ts;

const COLUMNS: &str =
    "id, owner_id, domain, bucket, bucket_min, bucket_max, total, correct, actual_accuracy, \
     delta, at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<CalibrationSnapshot> {
    let at: String = row.get(10)?;
    Ok(CalibrationSnapshot {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        domain: row.get(2)?,
        bucket: row.get::<_, i64>(3)? as u8,
        bucket_min: row.get(4)?,
        bucket_max: row.get(5)?,
        total: row.get::<_, i64>(6)? as u64,
        correct: row.get::<_, i64>(7)? as u64,
        actual_accuracy: row.get(8)?,
        delta: row.get(9)?,
        at: parse_ts(&at)?,
    })
}

pub fn insert(conn: &Connection, s: &CalibrationSnapshot) -> ReflexResult<()> {
    conn.execute(
        "INSERT INTO calibration_snapshots (
            id, owner_id, domain, bucket, bucket_min, bucket_max, total, correct,
            actual_accuracy, delta, at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            s.id,
            s.owner_id,
            s.domain,
            s.bucket as i64,
            s.bucket_min,
            s.bucket_max,
            s.total as i64,
            s.correct as i64,
            s.actual_accuracy,
            s.delta,
            s.at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert calibration: {e}")))?;
    Ok(())
}

pub fn list(
    conn: &Connection,
    owner: &str,
    domain: Option<&str>,
    limit: usize,
) -> ReflexResult<Vec<CalibrationSnapshot>> {
    let mut sql = format!("SELECT {COLUMNS} FROM calibration_snapshots WHERE owner_id = ?1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];
    if let Some(domain) = domain {
        args.push(Box::new(domain.to_string()));
        sql.push_str(&format!(" AND domain = ?{}", args.len()));
    }
    sql.push_str(&format!(" ORDER BY at DESC LIMIT {limit}"));
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn prune_before(
    conn: &Connection,
    owner: &str,
    cutoff: DateTime<Utc>,
) -> ReflexResult<usize> {
    conn.execute(
        "DELETE FROM calibration_snapshots WHERE owner_id = ?1 AND at < ?2",
        params![owner, cutoff.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(format!("prune calibration: {e}")))
}
