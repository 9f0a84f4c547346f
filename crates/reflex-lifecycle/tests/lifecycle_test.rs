//! Sweep behavior against the real storage engine.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use reflex_core::config::ReflexConfig;
use reflex_core::models::{
    AuditAction, DomainState, ExtractionMethod, FailurePattern, Gene, GeneAuditEntry, GeneStatus,
    PatternStatus, Prediction, PredictionStatus, PredictionType, RegressionRisk, Score,
};
use reflex_core::traits::IReflexStorage;
use reflex_lifecycle::LifecycleSweeper;
use reflex_storage::StorageEngine;

const OWNER: &str = "owner-1";

fn storage() -> Arc<dyn IReflexStorage> {
    Arc::new(StorageEngine::open_in_memory().unwrap())
}

fn pending(age_days: i64, expires_at: Option<chrono::DateTime<Utc>>) -> Prediction {
    Prediction {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        conversation_id: None,
        message_id: None,
        text: "pending prediction awaiting verification".to_string(),
        prediction_type: PredictionType::OutcomeForecast,
        domain: "code_generation".to_string(),
        confidence: Score::new(0.5),
        context_summary: None,
        source_model: None,
        extraction_method: ExtractionMethod::Pattern,
        status: PredictionStatus::Pending,
        source_hash: Uuid::new_v4().to_string(),
        expires_at,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

fn gene(status: GeneStatus, strength: f64, confirmations: u32) -> Gene {
    let now = Utc::now();
    Gene {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        text: format!("directive {}", Uuid::new_v4()),
        gene_type: "caution".to_string(),
        domain: "code_generation".to_string(),
        source_pattern: None,
        source_pattern_id: None,
        trigger_condition: "always".to_string(),
        action_directive: "double-check".to_string(),
        strength: Score::new(strength),
        status,
        confirmations,
        contradictions: 0,
        applications: 0,
        requires_review: status == GeneStatus::PendingReview,
        regression_risk: RegressionRisk::Low,
        last_applied_at: None,
        mutation_history: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn insert_gene(storage: &Arc<dyn IReflexStorage>, gene: &Gene) {
    let audit = GeneAuditEntry::record(
        OWNER,
        &gene.id,
        AuditAction::ManualCreate,
        None,
        None,
        None,
        "test",
    );
    storage.insert_gene(gene, &audit).unwrap();
}

fn pattern(frequency: u32) -> FailurePattern {
    let now = Utc::now();
    FailurePattern {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        domain: "code_generation".to_string(),
        pattern_type: "repeated_failure".to_string(),
        signature: format!("sig-{}", Uuid::new_v4()),
        description: "test pattern".to_string(),
        frequency,
        confidence: Score::new(0.3),
        contributing_outcome_ids: Vec::new(),
        promoted_gene_text: None,
        status: PatternStatus::Emerging,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn stale_and_ttl_pending_expire_others_stay() {
    let storage = storage();
    let stale = pending(8, None);
    let fresh = pending(0, None);
    let past_ttl = pending(0, Some(Utc::now() - Duration::hours(1)));
    for p in [&stale, &fresh, &past_ttl] {
        storage.insert_prediction(p).unwrap();
    }

    let report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);

    assert_eq!(report.stale_predictions_expired, 1);
    assert_eq!(report.ttl_predictions_expired, 1);
    assert!(report.failed_steps.is_empty());
    let fresh_row = storage.get_prediction(OWNER, &fresh.id).unwrap().unwrap();
    assert_eq!(fresh_row.status, PredictionStatus::Pending);
    let stale_row = storage.get_prediction(OWNER, &stale.id).unwrap().unwrap();
    assert_eq!(stale_row.status, PredictionStatus::Expired);
}

#[test]
fn weak_dormant_genes_are_hard_deleted() {
    let storage = storage();
    let weak = gene(GeneStatus::Dormant, 0.01, 0);
    let strong_dormant = gene(GeneStatus::Dormant, 0.5, 0);
    let weak_active = gene(GeneStatus::Active, 0.01, 0);
    for g in [&weak, &strong_dormant, &weak_active] {
        insert_gene(&storage, g);
    }

    let report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);

    assert_eq!(report.weak_genes_deleted, 1);
    assert!(storage.get_gene(OWNER, &weak.id).unwrap().is_none());
    assert!(storage.get_gene(OWNER, &strong_dormant.id).unwrap().is_some());
    assert!(storage.get_gene(OWNER, &weak_active.id).unwrap().is_some());
}

#[test]
fn low_frequency_emerging_patterns_are_pruned() {
    let storage = storage();
    let weak = pattern(1);
    let kept = pattern(3);
    storage.insert_pattern(&weak).unwrap();
    storage.insert_pattern(&kept).unwrap();

    let report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);

    assert_eq!(report.weak_patterns_pruned, 1);
    let remaining = storage.list_patterns(OWNER, None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[test]
fn decay_step_runs_even_without_outcomes() {
    let storage = storage();
    let mut state = DomainState::fresh("deployment", OWNER, 0.9);
    state.pain_score = Score::new(0.8);
    state.satisfaction_score = Score::new(0.4);
    storage.upsert_domain_state(&state).unwrap();

    let report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);

    assert_eq!(report.domains_decayed, 1);
    let decayed = storage.get_domain_state(OWNER, "deployment").unwrap().unwrap();
    assert!((decayed.pain_score.value() - 0.72).abs() < 1e-9);
    assert!((decayed.satisfaction_score.value() - 0.36).abs() < 1e-9);
    // Counters are untouched by decay.
    assert_eq!(decayed.total_predictions, 0);
}

#[test]
fn auto_activation_only_runs_off_private_deployments() {
    let storage = storage();
    let candidate = gene(GeneStatus::PendingReview, 0.5, 5);
    let under_confirmed = gene(GeneStatus::PendingReview, 0.5, 3);
    insert_gene(&storage, &candidate);
    insert_gene(&storage, &under_confirmed);

    // Private: nothing happens.
    let private_report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);
    assert_eq!(private_report.genes_auto_activated, 0);

    let mut public = ReflexConfig::default();
    public.deployment.is_private = false;
    let report = LifecycleSweeper::new(Arc::clone(&storage), public).sweep_owner(OWNER);

    assert_eq!(report.genes_auto_activated, 1);
    let activated = storage.get_gene(OWNER, &candidate.id).unwrap().unwrap();
    assert_eq!(activated.status, GeneStatus::Active);
    let trail = storage.audit_trail(OWNER, &candidate.id).unwrap();
    assert_eq!(trail.last().unwrap().action, AuditAction::AutoActivated);

    let untouched = storage.get_gene(OWNER, &under_confirmed.id).unwrap().unwrap();
    assert_eq!(untouched.status, GeneStatus::PendingReview);
}

#[test]
fn snapshot_step_writes_buckets_for_each_domain() {
    let storage = storage();
    storage
        .upsert_domain_state(&DomainState::fresh("deployment", OWNER, 0.9))
        .unwrap();
    storage
        .upsert_domain_state(&DomainState::fresh("code_generation", OWNER, 0.9))
        .unwrap();

    let report = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_owner(OWNER);

    // Five buckets per domain.
    assert_eq!(report.calibration_buckets_written, 10);
    assert_eq!(
        storage.list_calibration(OWNER, Some("deployment"), 100).unwrap().len(),
        5
    );
}

#[test]
fn sweep_all_covers_every_owner() {
    let storage = storage();
    let mut a = pending(8, None);
    a.owner_id = "owner-a".to_string();
    let mut b = pending(8, None);
    b.owner_id = "owner-b".to_string();
    storage.insert_prediction(&a).unwrap();
    storage.insert_prediction(&b).unwrap();

    let reports = LifecycleSweeper::new(Arc::clone(&storage), ReflexConfig::default())
        .sweep_all()
        .unwrap();

    assert_eq!(reports.len(), 2);
    for (_, report) in &reports {
        assert_eq!(report.stale_predictions_expired, 1);
    }
}
