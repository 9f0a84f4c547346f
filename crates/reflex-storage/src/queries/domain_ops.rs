//! Domain state upserts and history snapshots.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{DomainHistoryPoint, DomainState, Score, StreakType, Trend};

use crate::to_storage_err;

use super::{conv_err, parse_opt_ts, parse_ts};

const STATE_COLUMNS: &str = "domain, owner_id, pain_score, satisfaction_score, accuracy, \
                             calibration_offset, total_predictions, correct, wrong, partial, \
                             streak_type, streak_count, best_streak, worst_streak, decay_rate, \
                             volatility, trend, last_outcome_at, updated_at";

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<DomainState> {
    let streak_type: Option<String> = row.get(10)?;
    let trend: String = row.get(16)?;
    let last_outcome_at: Option<String> = row.get(17)?;
    let updated_at: String = row.get(18)?;
    Ok(DomainState {
        domain: row.get(0)?,
        owner_id: row.get(1)?,
        pain_score: Score::new(row.get(2)?),
        satisfaction_score: Score::new(row.get(3)?),
        accuracy: Score::new(row.get(4)?),
        calibration_offset: row.get(5)?,
        total_predictions: row.get::<_, i64>(6)? as u64,
        correct: row.get::<_, i64>(7)? as u64,
        wrong: row.get::<_, i64>(8)? as u64,
        partial: row.get::<_, i64>(9)? as u64,
        streak_type: streak_type
            .as_deref()
            .map(StreakType::parse)
            .transpose()
            .map_err(conv_err)?,
        streak_count: row.get::<_, i64>(11)? as u32,
        best_streak: row.get::<_, i64>(12)? as u32,
        worst_streak: row.get::<_, i64>(13)? as u32,
        decay_rate: row.get(14)?,
        volatility: Score::new(row.get(15)?),
        trend: Trend::parse(&trend).map_err(conv_err)?,
        last_outcome_at: parse_opt_ts(last_outcome_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

pub fn get_state(
    conn: &Connection,
    owner: &str,
    domain: &str,
) -> ReflexResult<Option<DomainState>> {
    let sql =
        format!("SELECT {STATE_COLUMNS} FROM domain_states WHERE owner_id = ?1 AND domain = ?2");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![owner, domain], state_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(|e| to_storage_err(e.to_string()))?)),
        None => Ok(None),
    }
}

pub fn list_states(conn: &Connection, owner: &str) -> ReflexResult<Vec<DomainState>> {
    let sql =
        format!("SELECT {STATE_COLUMNS} FROM domain_states WHERE owner_id = ?1 ORDER BY domain");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner], state_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn upsert_state(conn: &Connection, state: &DomainState) -> ReflexResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO domain_states (
            domain, owner_id, pain_score, satisfaction_score, accuracy,
            calibration_offset, total_predictions, correct, wrong, partial,
            streak_type, streak_count, best_streak, worst_streak, decay_rate,
            volatility, trend, last_outcome_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            state.domain,
            state.owner_id,
            state.pain_score.value(),
            state.satisfaction_score.value(),
            state.accuracy.value(),
            state.calibration_offset,
            state.total_predictions as i64,
            state.correct as i64,
            state.wrong as i64,
            state.partial as i64,
            state.streak_type.map(|s| s.as_str()),
            state.streak_count as i64,
            state.best_streak as i64,
            state.worst_streak as i64,
            state.decay_rate,
            state.volatility.value(),
            state.trend.as_str(),
            state.last_outcome_at.map(|t| t.to_rfc3339()),
            state.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("upsert domain state: {e}")))?;
    Ok(())
}

/// Read-modify-write one (domain, owner) row in a single transaction.
pub fn modify_state(
    conn: &Connection,
    owner: &str,
    domain: &str,
    decay_rate: f64,
    mutate: &mut dyn FnMut(&mut DomainState),
) -> ReflexResult<DomainState> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("modify state begin: {e}")))?;

    let mut state = get_state(&tx, owner, domain)?
        .unwrap_or_else(|| DomainState::fresh(domain, owner, decay_rate));
    mutate(&mut state);
    state.updated_at = Utc::now();
    upsert_state(&tx, &state)?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("modify state commit: {e}")))?;
    Ok(state)
}

pub fn append_history(conn: &Connection, point: &DomainHistoryPoint) -> ReflexResult<()> {
    conn.execute(
        "INSERT INTO domain_history (
            domain, owner_id, pain_score, satisfaction_score, accuracy, trigger, excerpt, at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            point.domain,
            point.owner_id,
            point.pain_score.value(),
            point.satisfaction_score.value(),
            point.accuracy.value(),
            point.trigger,
            point.excerpt,
            point.at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("append history: {e}")))?;
    Ok(())
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<DomainHistoryPoint> {
    let at: String = row.get(7)?;
    Ok(DomainHistoryPoint {
        domain: row.get(0)?,
        owner_id: row.get(1)?,
        pain_score: Score::new(row.get(2)?),
        satisfaction_score: Score::new(row.get(3)?),
        accuracy: Score::new(row.get(4)?),
        trigger: row.get(5)?,
        excerpt: row.get(6)?,
        at: parse_ts(&at)?,
    })
}

/// Most recent history first.
pub fn recent_history(
    conn: &Connection,
    owner: &str,
    domain: &str,
    limit: usize,
) -> ReflexResult<Vec<DomainHistoryPoint>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT domain, owner_id, pain_score, satisfaction_score, accuracy, trigger, excerpt, at \
             FROM domain_history WHERE owner_id = ?1 AND domain = ?2 \
             ORDER BY at DESC, id DESC LIMIT {limit}"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, domain], history_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn prune_history_before(
    conn: &Connection,
    owner: &str,
    cutoff: DateTime<Utc>,
) -> ReflexResult<usize> {
    conn.execute(
        "DELETE FROM domain_history WHERE owner_id = ?1 AND at < ?2",
        params![owner, cutoff.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(format!("prune history: {e}")))
}
