//! Failure pattern CRUD keyed by (owner, domain, signature).

use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{FailurePattern, PatternStatus, Score};

use crate::to_storage_err;

use super::{conv_err, parse_ts};

const COLUMNS: &str = "id, owner_id, domain, pattern_type, signature, description, frequency, \
                       confidence, contributing_outcome_ids, promoted_gene_text, status, \
                       created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FailurePattern> {
    let contributing: String = row.get(8)?;
    let status: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    Ok(FailurePattern {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        domain: row.get(2)?,
        pattern_type: row.get(3)?,
        signature: row.get(4)?,
        description: row.get(5)?,
        frequency: row.get::<_, i64>(6)? as u32,
        confidence: Score::new(row.get(7)?),
        contributing_outcome_ids: serde_json::from_str(&contributing)
            .map_err(|e| conv_err(e.into()))?,
        promoted_gene_text: row.get(9)?,
        status: PatternStatus::parse(&status).map_err(conv_err)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

pub fn insert(conn: &Connection, p: &FailurePattern) -> ReflexResult<()> {
    let contributing = serde_json::to_string(&p.contributing_outcome_ids)?;
    conn.execute(
        "INSERT INTO patterns (
            id, owner_id, domain, pattern_type, signature, description, frequency,
            confidence, contributing_outcome_ids, promoted_gene_text, status,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            p.id,
            p.owner_id,
            p.domain,
            p.pattern_type,
            p.signature,
            p.description,
            p.frequency as i64,
            p.confidence.value(),
            contributing,
            p.promoted_gene_text,
            p.status.as_str(),
            p.created_at.to_rfc3339(),
            p.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert pattern: {e}")))?;
    Ok(())
}

pub fn update(conn: &Connection, p: &FailurePattern) -> ReflexResult<()> {
    let contributing = serde_json::to_string(&p.contributing_outcome_ids)?;
    conn.execute(
        "UPDATE patterns SET frequency = ?1, confidence = ?2, contributing_outcome_ids = ?3,
            promoted_gene_text = ?4, status = ?5, description = ?6, updated_at = ?7
         WHERE owner_id = ?8 AND id = ?9",
        params![
            p.frequency as i64,
            p.confidence.value(),
            contributing,
            p.promoted_gene_text,
            p.status.as_str(),
            p.description,
            p.updated_at.to_rfc3339(),
            p.owner_id,
            p.id,
        ],
    )
    .map_err(|e| to_storage_err(format!("update pattern: {e}")))?;
    Ok(())
}

pub fn find(
    conn: &Connection,
    owner: &str,
    domain: &str,
    signature: &str,
) -> ReflexResult<Option<FailurePattern>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM patterns \
         WHERE owner_id = ?1 AND domain = ?2 AND signature = ?3"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![owner, domain, signature], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn list(
    conn: &Connection,
    owner: &str,
    domain: Option<&str>,
) -> ReflexResult<Vec<FailurePattern>> {
    let mut sql = format!("SELECT {COLUMNS} FROM patterns WHERE owner_id = ?1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];
    if let Some(domain) = domain {
        args.push(Box::new(domain.to_string()));
        sql.push_str(&format!(" AND domain = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY frequency DESC, updated_at DESC");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Delete emerging patterns below the frequency threshold.
pub fn prune_weak(conn: &Connection, owner: &str, min_frequency: u32) -> ReflexResult<usize> {
    conn.execute(
        "DELETE FROM patterns \
         WHERE owner_id = ?1 AND status = 'emerging' AND frequency < ?2",
        params![owner, min_frequency as i64],
    )
    .map_err(|e| to_storage_err(format!("prune patterns: {e}")))
}
