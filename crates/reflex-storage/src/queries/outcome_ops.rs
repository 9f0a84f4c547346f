//! Insert and listings for immutable outcome records.

use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{CascadeEffect, Outcome, OutcomeResult, Severity, TriggerType};

use crate::to_storage_err;

use super::{conv_err, parse_ts};

const COLUMNS: &str = "id, owner_id, prediction_id, trigger_type, trigger_source, trigger_data, \
                       result, conf_delta, pain_delta, sat_delta, lesson_learned, \
                       corrective_action, domain, severity, cascade_effects, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Outcome> {
    let trigger_type: String = row.get(3)?;
    let trigger_data: Option<String> = row.get(5)?;
    let result: String = row.get(6)?;
    let severity: String = row.get(13)?;
    let cascade_effects: String = row.get(14)?;
    let created_at: String = row.get(15)?;

    let trigger_data = trigger_data
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| conv_err(e.into()))?;
    let cascade_effects: Vec<CascadeEffect> =
        serde_json::from_str(&cascade_effects).map_err(|e| conv_err(e.into()))?;

    Ok(Outcome {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        prediction_id: row.get(2)?,
        trigger_type: TriggerType::parse(&trigger_type).map_err(conv_err)?,
        trigger_source: row.get(4)?,
        trigger_data,
        result: OutcomeResult::parse(&result).map_err(conv_err)?,
        conf_delta: row.get(7)?,
        pain_delta: row.get(8)?,
        sat_delta: row.get(9)?,
        lesson_learned: row.get(10)?,
        corrective_action: row.get(11)?,
        domain: row.get(12)?,
        severity: Severity::parse(&severity).map_err(conv_err)?,
        cascade_effects,
        created_at: parse_ts(&created_at)?,
    })
}

pub fn insert(conn: &Connection, o: &Outcome) -> ReflexResult<()> {
    let trigger_data = o
        .trigger_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let cascade_effects = serde_json::to_string(&o.cascade_effects)?;
    conn.execute(
        "INSERT INTO outcomes (
            id, owner_id, prediction_id, trigger_type, trigger_source, trigger_data,
            result, conf_delta, pain_delta, sat_delta, lesson_learned,
            corrective_action, domain, severity, cascade_effects, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            o.id,
            o.owner_id,
            o.prediction_id,
            o.trigger_type.as_str(),
            o.trigger_source,
            trigger_data,
            o.result.as_str(),
            o.conf_delta,
            o.pain_delta,
            o.sat_delta,
            o.lesson_learned,
            o.corrective_action,
            o.domain,
            o.severity.as_str(),
            cascade_effects,
            o.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert outcome: {e}")))?;
    Ok(())
}

pub fn get(conn: &Connection, owner: &str, id: &str) -> ReflexResult<Option<Outcome>> {
    let sql = format!("SELECT {COLUMNS} FROM outcomes WHERE owner_id = ?1 AND id = ?2");
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

pub fn list(conn: &Connection, owner: &str, limit: usize) -> ReflexResult<Vec<Outcome>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM outcomes WHERE owner_id = ?1 \
         ORDER BY created_at DESC LIMIT {limit}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
