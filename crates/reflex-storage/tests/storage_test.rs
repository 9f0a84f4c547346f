//! Storage engine behavior that the higher layers depend on:
//! durability across reopen, one-shot prediction transitions, and the
//! gene audit log.

use chrono::Utc;
use uuid::Uuid;

use reflex_core::errors::ReflexError;
use reflex_core::models::{
    AuditAction, ExtractionMethod, Gene, GeneAuditEntry, GeneStatus, Prediction, PredictionStatus,
    PredictionType, RegressionRisk, Score,
};
use reflex_core::traits::{GeneFilter, IReflexStorage, PredictionFilter};
use reflex_storage::StorageEngine;

const OWNER: &str = "owner-1";

fn prediction(text: &str, hash: &str) -> Prediction {
    Prediction {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        conversation_id: Some("conv-1".to_string()),
        message_id: Some("msg-1".to_string()),
        text: text.to_string(),
        prediction_type: PredictionType::OutcomeForecast,
        domain: "code_generation".to_string(),
        confidence: Score::new(0.7),
        context_summary: None,
        source_model: None,
        extraction_method: ExtractionMethod::Pattern,
        status: PredictionStatus::Pending,
        source_hash: hash.to_string(),
        expires_at: None,
        created_at: Utc::now(),
    }
}

fn gene(text: &str, status: GeneStatus) -> Gene {
    let now = Utc::now();
    Gene {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        text: text.to_string(),
        gene_type: "caution".to_string(),
        domain: "tool_reliability".to_string(),
        source_pattern: None,
        source_pattern_id: None,
        trigger_condition: String::new(),
        action_directive: String::new(),
        strength: Score::new(0.5),
        status,
        confirmations: 0,
        contradictions: 0,
        applications: 0,
        requires_review: false,
        regression_risk: RegressionRisk::Low,
        last_applied_at: None,
        mutation_history: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn audit(gene: &Gene, action: AuditAction) -> GeneAuditEntry {
    GeneAuditEntry::record(OWNER, &gene.id, action, None, None, None, "tester")
}

#[test]
fn predictions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reflex.db");

    let p = prediction("the migration will apply cleanly", "hash-1");
    {
        let storage = StorageEngine::open(&path).unwrap();
        storage.insert_prediction(&p).unwrap();
    }

    let storage = StorageEngine::open(&path).unwrap();
    let loaded = storage.get_prediction(OWNER, &p.id).unwrap().unwrap();
    assert_eq!(loaded.text, p.text);
    assert_eq!(loaded.status, PredictionStatus::Pending);
    assert_eq!(loaded.source_hash, "hash-1");
}

#[test]
fn reopen_runs_migrations_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reflex.db");
    StorageEngine::open(&path).unwrap();
    // A second open over the same file must not fail on existing schema.
    let storage = StorageEngine::open(&path).unwrap();
    assert!(storage
        .list_predictions(OWNER, &PredictionFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn transition_returns_the_pending_row_and_is_one_shot() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let p = prediction("the deploy will succeed", "hash-t");
    storage.insert_prediction(&p).unwrap();

    let before = storage
        .transition_prediction(OWNER, &p.id, PredictionStatus::VerifiedCorrect)
        .unwrap();
    assert_eq!(before.status, PredictionStatus::Pending);

    let after = storage.get_prediction(OWNER, &p.id).unwrap().unwrap();
    assert_eq!(after.status, PredictionStatus::VerifiedCorrect);

    let second = storage.transition_prediction(OWNER, &p.id, PredictionStatus::VerifiedWrong);
    assert!(matches!(second, Err(ReflexError::Conflict { .. })));
}

#[test]
fn transition_of_missing_row_is_not_found() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let result = storage.transition_prediction(OWNER, "no-such-id", PredictionStatus::Expired);
    assert!(matches!(result, Err(ReflexError::NotFound { .. })));
}

#[test]
fn hash_lookup_is_owner_scoped() {
    let storage = StorageEngine::open_in_memory().unwrap();
    let p = prediction("tests will be green", "hash-dup");
    storage.insert_prediction(&p).unwrap();

    assert!(storage.prediction_exists_by_hash(OWNER, "hash-dup").unwrap());
    assert!(!storage
        .prediction_exists_by_hash("other-owner", "hash-dup")
        .unwrap());
    assert!(!storage.prediction_exists_by_hash(OWNER, "hash-other").unwrap());
}

#[test]
fn modify_domain_state_creates_then_updates_one_row() {
    let storage = StorageEngine::open_in_memory().unwrap();

    let created = storage
        .modify_domain_state(OWNER, "task_planning", 0.9, &mut |s| {
            s.pain_score = Score::new(0.4);
        })
        .unwrap();
    assert_eq!(created.pain_score.value(), 0.4);
    assert_eq!(created.decay_rate, 0.9);

    let updated = storage
        .modify_domain_state(OWNER, "task_planning", 0.9, &mut |s| {
            s.total_predictions += 1;
        })
        .unwrap();
    assert_eq!(updated.pain_score.value(), 0.4);
    assert_eq!(updated.total_predictions, 1);
    assert_eq!(storage.list_domain_states(OWNER).unwrap().len(), 1);
}

#[test]
fn soft_deleted_genes_do_not_block_recreation() {
    let storage = StorageEngine::open_in_memory().unwrap();

    let mut g = gene("Always run the linter before committing", GeneStatus::Active);
    storage
        .insert_gene(&g, &audit(&g, AuditAction::ManualCreate))
        .unwrap();
    assert!(storage.gene_exists(OWNER, &g.domain, &g.text).unwrap());

    g.status = GeneStatus::Deleted;
    storage
        .update_gene(&g, &audit(&g, AuditAction::Deleted))
        .unwrap();
    assert!(!storage.gene_exists(OWNER, &g.domain, &g.text).unwrap());
}

#[test]
fn audit_trail_is_returned_oldest_first() {
    let storage = StorageEngine::open_in_memory().unwrap();

    let mut g = gene("Check disk space before large writes", GeneStatus::PendingReview);
    storage
        .insert_gene(&g, &audit(&g, AuditAction::ManualCreate))
        .unwrap();
    g.confirmations += 1;
    storage
        .update_gene(&g, &audit(&g, AuditAction::Confirmed))
        .unwrap();
    g.status = GeneStatus::Active;
    storage
        .update_gene(&g, &audit(&g, AuditAction::Approved))
        .unwrap();

    let trail = storage.audit_trail(OWNER, &g.id).unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ManualCreate,
            AuditAction::Confirmed,
            AuditAction::Approved
        ]
    );
}

#[test]
fn gene_listing_filters_by_status_and_domain() {
    let storage = StorageEngine::open_in_memory().unwrap();

    let active = gene("Prefer explicit timeouts on network calls", GeneStatus::Active);
    let dormant = gene("Retry idempotent requests once", GeneStatus::Dormant);
    storage
        .insert_gene(&active, &audit(&active, AuditAction::ManualCreate))
        .unwrap();
    storage
        .insert_gene(&dormant, &audit(&dormant, AuditAction::ManualCreate))
        .unwrap();

    let filter = GeneFilter {
        status: Some(GeneStatus::Active),
        domain: Some("tool_reliability".to_string()),
        limit: None,
    };
    let listed = storage.list_genes(OWNER, &filter).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, active.id);
}
