//! Insert, lookup, transition and filtered listings for predictions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{
    ExtractionMethod, Prediction, PredictionStatus, PredictionType, Score,
};
use reflex_core::traits::PredictionFilter;
use reflex_core::ReflexError;

use crate::to_storage_err;

use super::{conv_err, parse_opt_ts, parse_ts};

const COLUMNS: &str = "id, owner_id, conversation_id, message_id, text, prediction_type, \
                       domain, confidence, context_summary, source_model, extraction_method, \
                       status, source_hash, expires_at, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Prediction> {
    let prediction_type: String = row.get(5)?;
    let extraction_method: String = row.get(10)?;
    let status: String = row.get(11)?;
    let expires_at: Option<String> = row.get(13)?;
    let created_at: String = row.get(14)?;
    Ok(Prediction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        conversation_id: row.get(2)?,
        message_id: row.get(3)?,
        text: row.get(4)?,
        prediction_type: PredictionType::parse(&prediction_type).map_err(conv_err)?,
        domain: row.get(6)?,
        confidence: Score::new(row.get(7)?),
        context_summary: row.get(8)?,
        source_model: row.get(9)?,
        extraction_method: ExtractionMethod::parse(&extraction_method).map_err(conv_err)?,
        status: PredictionStatus::parse(&status).map_err(conv_err)?,
        source_hash: row.get(12)?,
        expires_at: parse_opt_ts(expires_at)?,
        created_at: parse_ts(&created_at)?,
    })
}

pub fn insert(conn: &Connection, p: &Prediction) -> ReflexResult<()> {
    conn.execute(
        "INSERT INTO predictions (
            id, owner_id, conversation_id, message_id, text, prediction_type,
            domain, confidence, context_summary, source_model, extraction_method,
            status, source_hash, expires_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            p.id,
            p.owner_id,
            p.conversation_id,
            p.message_id,
            p.text,
            p.prediction_type.as_str(),
            p.domain,
            p.confidence.value(),
            p.context_summary,
            p.source_model,
            p.extraction_method.as_str(),
            p.status.as_str(),
            p.source_hash,
            p.expires_at.map(|t| t.to_rfc3339()),
            p.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert prediction: {e}")))?;
    Ok(())
}

pub fn get(conn: &Connection, owner: &str, id: &str) -> ReflexResult<Option<Prediction>> {
    let sql = format!("SELECT {COLUMNS} FROM predictions WHERE owner_id = ?1 AND id = ?2");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![owner, id], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

/// Atomically claim a pending prediction into a terminal status.
/// The returned row reflects the state before the transition.
pub fn transition(
    conn: &Connection,
    owner: &str,
    id: &str,
    to: PredictionStatus,
) -> ReflexResult<Prediction> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("transition begin: {e}")))?;

    let existing = get(&tx, owner, id)?
        .ok_or_else(|| ReflexError::not_found("prediction", id))?;
    if existing.status.is_terminal() {
        return Err(ReflexError::conflict(format!(
            "prediction {id} already {}",
            existing.status.as_str()
        )));
    }

    tx.execute(
        "UPDATE predictions SET status = ?1 WHERE owner_id = ?2 AND id = ?3",
        params![to.as_str(), owner, id],
    )
    .map_err(|e| to_storage_err(format!("transition update: {e}")))?;
    tx.commit()
        .map_err(|e| to_storage_err(format!("transition commit: {e}")))?;
    Ok(existing)
}

pub fn list(
    conn: &Connection,
    owner: &str,
    filter: &PredictionFilter,
) -> ReflexResult<Vec<Prediction>> {
    let mut sql = format!("SELECT {COLUMNS} FROM predictions WHERE owner_id = ?1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];
    if let Some(status) = filter.status {
        args.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", args.len()));
    }
    if let Some(domain) = &filter.domain {
        args.push(Box::new(domain.clone()));
        sql.push_str(&format!(" AND domain = ?{}", args.len()));
    }
    if let Some(conversation_id) = &filter.conversation_id {
        args.push(Box::new(conversation_id.clone()));
        sql.push_str(&format!(" AND conversation_id = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY created_at DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn exists_by_hash(conn: &Connection, owner: &str, source_hash: &str) -> ReflexResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM predictions WHERE owner_id = ?1 AND source_hash = ?2",
            params![owner, source_hash],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count > 0)
}

pub fn most_recent_pending(
    conn: &Connection,
    owner: &str,
    conversation_id: &str,
) -> ReflexResult<Option<Prediction>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM predictions \
         WHERE owner_id = ?1 AND conversation_id = ?2 AND status = 'pending' \
         ORDER BY created_at DESC LIMIT 1"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![owner, conversation_id], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn pending_created_before(
    conn: &Connection,
    owner: &str,
    cutoff: DateTime<Utc>,
) -> ReflexResult<Vec<Prediction>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM predictions \
         WHERE owner_id = ?1 AND status = 'pending' AND created_at < ?2"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, cutoff.to_rfc3339()], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn pending_past_ttl(
    conn: &Connection,
    owner: &str,
    now: DateTime<Utc>,
) -> ReflexResult<Vec<Prediction>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM predictions \
         WHERE owner_id = ?1 AND status = 'pending' \
         AND expires_at IS NOT NULL AND expires_at < ?2"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, now.to_rfc3339()], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn recent_wrong(
    conn: &Connection,
    owner: &str,
    domain: &str,
    limit: usize,
) -> ReflexResult<Vec<Prediction>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM predictions \
         WHERE owner_id = ?1 AND domain = ?2 AND status = 'verified_wrong' \
         ORDER BY created_at DESC LIMIT {limit}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, domain], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn resolved(
    conn: &Connection,
    owner: &str,
    domain: Option<&str>,
) -> ReflexResult<Vec<Prediction>> {
    let mut sql = format!(
        "SELECT {COLUMNS} FROM predictions WHERE owner_id = ?1 \
         AND status IN ('verified_correct', 'verified_wrong', 'verified_partial')"
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];
    if let Some(domain) = domain {
        args.push(Box::new(domain.to_string()));
        sql.push_str(&format!(" AND domain = ?{}", args.len()));
    }
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
