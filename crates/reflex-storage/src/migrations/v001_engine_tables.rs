//! v001: predictions, outcomes, domain_states, domain_history, patterns,
//! genes, gene_audit_log, calibration_snapshots.

use rusqlite::Connection;

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> ReflexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS predictions (
            id                TEXT PRIMARY KEY,
            owner_id          TEXT NOT NULL,
            conversation_id   TEXT,
            message_id        TEXT,
            text              TEXT NOT NULL,
            prediction_type   TEXT NOT NULL,
            domain            TEXT NOT NULL,
            confidence        REAL NOT NULL,
            context_summary   TEXT,
            source_model      TEXT,
            extraction_method TEXT NOT NULL,
            status            TEXT NOT NULL DEFAULT 'pending',
            source_hash       TEXT NOT NULL,
            expires_at        TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_predictions_owner_status ON predictions(owner_id, status);
        CREATE INDEX IF NOT EXISTS idx_predictions_owner_domain ON predictions(owner_id, domain);
        CREATE INDEX IF NOT EXISTS idx_predictions_conversation ON predictions(owner_id, conversation_id);
        CREATE INDEX IF NOT EXISTS idx_predictions_hash ON predictions(owner_id, source_hash);

        CREATE TABLE IF NOT EXISTS outcomes (
            id                TEXT PRIMARY KEY,
            owner_id          TEXT NOT NULL,
            prediction_id     TEXT,
            trigger_type      TEXT NOT NULL,
            trigger_source    TEXT NOT NULL,
            trigger_data      TEXT,
            result            TEXT NOT NULL,
            conf_delta        REAL NOT NULL,
            pain_delta        REAL NOT NULL,
            sat_delta         REAL NOT NULL,
            lesson_learned    TEXT,
            corrective_action TEXT,
            domain            TEXT NOT NULL,
            severity          TEXT NOT NULL DEFAULT 'medium',
            cascade_effects   TEXT NOT NULL DEFAULT '[]',
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_outcomes_owner ON outcomes(owner_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_outcomes_prediction ON outcomes(prediction_id);

        CREATE TABLE IF NOT EXISTS domain_states (
            domain             TEXT NOT NULL,
            owner_id           TEXT NOT NULL,
            pain_score         REAL NOT NULL DEFAULT 0,
            satisfaction_score REAL NOT NULL DEFAULT 0,
            accuracy           REAL NOT NULL DEFAULT 0,
            calibration_offset REAL NOT NULL DEFAULT 0,
            total_predictions  INTEGER NOT NULL DEFAULT 0,
            correct            INTEGER NOT NULL DEFAULT 0,
            wrong              INTEGER NOT NULL DEFAULT 0,
            partial            INTEGER NOT NULL DEFAULT 0,
            streak_type        TEXT,
            streak_count       INTEGER NOT NULL DEFAULT 0,
            best_streak        INTEGER NOT NULL DEFAULT 0,
            worst_streak       INTEGER NOT NULL DEFAULT 0,
            decay_rate         REAL NOT NULL DEFAULT 0.9,
            volatility         REAL NOT NULL DEFAULT 0,
            trend              TEXT NOT NULL DEFAULT 'stable',
            last_outcome_at    TEXT,
            updated_at         TEXT NOT NULL,
            PRIMARY KEY (domain, owner_id)
        );

        CREATE TABLE IF NOT EXISTS domain_history (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            domain             TEXT NOT NULL,
            owner_id           TEXT NOT NULL,
            pain_score         REAL NOT NULL,
            satisfaction_score REAL NOT NULL,
            accuracy           REAL NOT NULL,
            trigger            TEXT NOT NULL,
            excerpt            TEXT NOT NULL DEFAULT '',
            at                 TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_owner_domain ON domain_history(owner_id, domain, at);

        CREATE TABLE IF NOT EXISTS patterns (
            id                       TEXT PRIMARY KEY,
            owner_id                 TEXT NOT NULL,
            domain                   TEXT NOT NULL,
            pattern_type             TEXT NOT NULL,
            signature                TEXT NOT NULL,
            description              TEXT NOT NULL DEFAULT '',
            frequency                INTEGER NOT NULL DEFAULT 1,
            confidence               REAL NOT NULL DEFAULT 0.3,
            contributing_outcome_ids TEXT NOT NULL DEFAULT '[]',
            promoted_gene_text       TEXT,
            status                   TEXT NOT NULL DEFAULT 'emerging',
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL,
            UNIQUE (owner_id, domain, signature)
        );

        CREATE INDEX IF NOT EXISTS idx_patterns_owner_domain ON patterns(owner_id, domain);

        CREATE TABLE IF NOT EXISTS genes (
            id                TEXT PRIMARY KEY,
            owner_id          TEXT NOT NULL,
            text              TEXT NOT NULL,
            gene_type         TEXT NOT NULL,
            domain            TEXT NOT NULL,
            source_pattern    TEXT,
            source_pattern_id TEXT,
            trigger_condition TEXT NOT NULL DEFAULT '',
            action_directive  TEXT NOT NULL DEFAULT '',
            strength          REAL NOT NULL,
            status            TEXT NOT NULL,
            confirmations     INTEGER NOT NULL DEFAULT 0,
            contradictions    INTEGER NOT NULL DEFAULT 0,
            applications      INTEGER NOT NULL DEFAULT 0,
            requires_review   INTEGER NOT NULL DEFAULT 0,
            regression_risk   TEXT NOT NULL DEFAULT 'none',
            last_applied_at   TEXT,
            mutation_history  TEXT NOT NULL DEFAULT '[]',
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_genes_owner_status ON genes(owner_id, status);
        CREATE INDEX IF NOT EXISTS idx_genes_owner_domain ON genes(owner_id, domain, status);

        CREATE TABLE IF NOT EXISTS gene_audit_log (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL,
            gene_id      TEXT NOT NULL,
            action       TEXT NOT NULL,
            before_state TEXT,
            after_state  TEXT,
            reason       TEXT,
            actor        TEXT NOT NULL DEFAULT 'system',
            at           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_gene ON gene_audit_log(owner_id, gene_id, at);

        CREATE TABLE IF NOT EXISTS calibration_snapshots (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL,
            domain          TEXT NOT NULL,
            bucket          INTEGER NOT NULL,
            bucket_min      REAL NOT NULL,
            bucket_max      REAL NOT NULL,
            total           INTEGER NOT NULL,
            correct         INTEGER NOT NULL,
            actual_accuracy REAL NOT NULL,
            delta           REAL NOT NULL,
            at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_calibration_owner ON calibration_snapshots(owner_id, domain, at);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
