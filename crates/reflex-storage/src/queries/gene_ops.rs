//! Gene CRUD. Every insert/update carries its audit entry in the same
//! transaction; the audit log itself is append-only.

use rusqlite::{params, Connection, Row};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{
    AuditAction, Gene, GeneAuditEntry, GeneStatus, RegressionRisk, Score,
};
use reflex_core::traits::GeneFilter;

use crate::to_storage_err;

use super::{conv_err, parse_opt_ts, parse_ts};

const COLUMNS: &str = "id, owner_id, text, gene_type, domain, source_pattern, source_pattern_id, \
                       trigger_condition, action_directive, strength, status, confirmations, \
                       contradictions, applications, requires_review, regression_risk, \
                       last_applied_at, mutation_history, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Gene> {
    let status: String = row.get(10)?;
    let regression_risk: String = row.get(15)?;
    let last_applied_at: Option<String> = row.get(16)?;
    let mutation_history: String = row.get(17)?;
    let created_at: String = row.get(18)?;
    let updated_at: String = row.get(19)?;
    Ok(Gene {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        text: row.get(2)?,
        gene_type: row.get(3)?,
        domain: row.get(4)?,
        source_pattern: row.get(5)?,
        source_pattern_id: row.get(6)?,
        trigger_condition: row.get(7)?,
        action_directive: row.get(8)?,
        strength: Score::new(row.get(9)?),
        status: GeneStatus::parse(&status).map_err(conv_err)?,
        confirmations: row.get::<_, i64>(11)? as u32,
        contradictions: row.get::<_, i64>(12)? as u32,
        applications: row.get::<_, i64>(13)? as u32,
        requires_review: row.get::<_, i64>(14)? != 0,
        regression_risk: RegressionRisk::parse(&regression_risk).map_err(conv_err)?,
        last_applied_at: parse_opt_ts(last_applied_at)?,
        mutation_history: serde_json::from_str(&mutation_history)
            .map_err(|e| conv_err(e.into()))?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn append_audit(conn: &Connection, entry: &GeneAuditEntry) -> ReflexResult<()> {
    let before = entry
        .before
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let after = entry
        .after
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO gene_audit_log (
            id, owner_id, gene_id, action, before_state, after_state, reason, actor, at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.id,
            entry.owner_id,
            entry.gene_id,
            entry.action.as_str(),
            before,
            after,
            entry.reason,
            entry.actor,
            entry.at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("append audit: {e}")))?;
    Ok(())
}

pub fn insert(conn: &Connection, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert gene begin: {e}")))?;
    let mutation_history = serde_json::to_string(&gene.mutation_history)?;
    tx.execute(
        "INSERT INTO genes (
            id, owner_id, text, gene_type, domain, source_pattern, source_pattern_id,
            trigger_condition, action_directive, strength, status, confirmations,
            contradictions, applications, requires_review, regression_risk,
            last_applied_at, mutation_history, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            gene.id,
            gene.owner_id,
            gene.text,
            gene.gene_type,
            gene.domain,
            gene.source_pattern,
            gene.source_pattern_id,
            gene.trigger_condition,
            gene.action_directive,
            gene.strength.value(),
            gene.status.as_str(),
            gene.confirmations as i64,
            gene.contradictions as i64,
            gene.applications as i64,
            gene.requires_review as i64,
            gene.regression_risk.as_str(),
            gene.last_applied_at.map(|t| t.to_rfc3339()),
            mutation_history,
            gene.created_at.to_rfc3339(),
            gene.updated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(format!("insert gene: {e}")))?;
    append_audit(&tx, audit)?;
    tx.commit()
        .map_err(|e| to_storage_err(format!("insert gene commit: {e}")))?;
    Ok(())
}

pub fn update(conn: &Connection, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("update gene begin: {e}")))?;
    let mutation_history = serde_json::to_string(&gene.mutation_history)?;
    tx.execute(
        "UPDATE genes SET text = ?1, trigger_condition = ?2, action_directive = ?3,
            strength = ?4, status = ?5, confirmations = ?6, contradictions = ?7,
            applications = ?8, requires_review = ?9, regression_risk = ?10,
            last_applied_at = ?11, mutation_history = ?12, updated_at = ?13
         WHERE owner_id = ?14 AND id = ?15",
        params![
            gene.text,
            gene.trigger_condition,
            gene.action_directive,
            gene.strength.value(),
            gene.status.as_str(),
            gene.confirmations as i64,
            gene.contradictions as i64,
            gene.applications as i64,
            gene.requires_review as i64,
            gene.regression_risk.as_str(),
            gene.last_applied_at.map(|t| t.to_rfc3339()),
            mutation_history,
            gene.updated_at.to_rfc3339(),
            gene.owner_id,
            gene.id,
        ],
    )
    .map_err(|e| to_storage_err(format!("update gene: {e}")))?;
    append_audit(&tx, audit)?;
    tx.commit()
        .map_err(|e| to_storage_err(format!("update gene commit: {e}")))?;
    Ok(())
}

pub fn get(conn: &Connection, owner: &str, id: &str) -> ReflexResult<Option<Gene>> {
    let sql = format!("SELECT {COLUMNS} FROM genes WHERE owner_id = ?1 AND id = ?2");
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

pub fn list(conn: &Connection, owner: &str, filter: &GeneFilter) -> ReflexResult<Vec<Gene>> {
    let mut sql = format!("SELECT {COLUMNS} FROM genes WHERE owner_id = ?1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];
    if let Some(status) = filter.status {
        args.push(Box::new(status.as_str().to_string()));
        sql.push_str(&format!(" AND status = ?{}", args.len()));
    }
    if let Some(domain) = &filter.domain {
        args.push(Box::new(domain.clone()));
        sql.push_str(&format!(" AND domain = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY strength DESC, updated_at DESC");
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

pub fn count_active(conn: &Connection, owner: &str, domain: &str) -> ReflexResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM genes \
             WHERE owner_id = ?1 AND domain = ?2 AND status = 'active'",
            params![owner, domain],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}

pub fn exists(conn: &Connection, owner: &str, domain: &str, text: &str) -> ReflexResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM genes \
             WHERE owner_id = ?1 AND domain = ?2 AND text = ?3 AND status != 'deleted'",
            params![owner, domain, text],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count > 0)
}

pub fn pending_review_count(conn: &Connection, owner: &str) -> ReflexResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM genes WHERE owner_id = ?1 AND status = 'pending_review'",
            params![owner],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}

pub fn auto_activation_candidates(
    conn: &Connection,
    owner: &str,
    min_confirmations: u32,
) -> ReflexResult<Vec<Gene>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM genes \
         WHERE owner_id = ?1 AND status = 'pending_review' \
         AND confirmations >= ?2 AND contradictions = 0"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, min_confirmations as i64], from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Hard-delete dormant genes below the strength threshold. The only path
/// that removes gene rows.
pub fn delete_weak(conn: &Connection, owner: &str, max_strength: f64) -> ReflexResult<usize> {
    conn.execute(
        "DELETE FROM genes \
         WHERE owner_id = ?1 AND status = 'dormant' AND strength < ?2",
        params![owner, max_strength],
    )
    .map_err(|e| to_storage_err(format!("delete weak genes: {e}")))
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<GeneAuditEntry> {
    let action: String = row.get(3)?;
    let before: Option<String> = row.get(4)?;
    let after: Option<String> = row.get(5)?;
    let at: String = row.get(8)?;
    let before = before
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| conv_err(e.into()))?;
    let after = after
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| conv_err(e.into()))?;
    Ok(GeneAuditEntry {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        gene_id: row.get(2)?,
        action: AuditAction::parse(&action).map_err(conv_err)?,
        before,
        after,
        reason: row.get(6)?,
        actor: row.get(7)?,
        at: parse_ts(&at)?,
    })
}

pub fn audit_trail(
    conn: &Connection,
    owner: &str,
    gene_id: &str,
) -> ReflexResult<Vec<GeneAuditEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, owner_id, gene_id, action, before_state, after_state, reason, actor, at \
             FROM gene_audit_log WHERE owner_id = ?1 AND gene_id = ?2 ORDER BY at",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![owner, gene_id], audit_from_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
