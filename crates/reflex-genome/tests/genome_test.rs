//! Pattern mining, promotion, and gene governance against the real
//! storage engine.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::config::ReflexConfig;
use reflex_core::errors::ReflexError;
use reflex_core::models::{
    AuditAction, ExtractionMethod, GeneStatus, PatternStatus, Prediction, PredictionStatus,
    PredictionType, RegressionRisk, Score,
};
use reflex_core::traits::{GeneFilter, IReflexStorage};
use reflex_genome::{CreateGeneRequest, Genome, PatternMiner};
use reflex_storage::StorageEngine;

const OWNER: &str = "owner-1";

fn storage() -> Arc<dyn IReflexStorage> {
    Arc::new(StorageEngine::open_in_memory().unwrap())
}

fn wrong_prediction(domain: &str, text: &str) -> Prediction {
    Prediction {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        conversation_id: None,
        message_id: None,
        text: text.to_string(),
        prediction_type: PredictionType::OutcomeForecast,
        domain: domain.to_string(),
        confidence: Score::new(0.6),
        context_summary: None,
        source_model: None,
        extraction_method: ExtractionMethod::Pattern,
        status: PredictionStatus::VerifiedWrong,
        source_hash: Uuid::new_v4().to_string(),
        expires_at: None,
        created_at: Utc::now(),
    }
}

fn create_request(domain: &str, text: &str) -> CreateGeneRequest {
    CreateGeneRequest {
        text: text.to_string(),
        gene_type: "caution".to_string(),
        domain: domain.to_string(),
        trigger_condition: "always".to_string(),
        action_directive: "double-check first".to_string(),
        strength: 0.5,
        regression_risk: RegressionRisk::Low,
    }
}

#[test]
fn one_wrong_prediction_creates_no_pattern() {
    let storage = storage();
    storage
        .insert_prediction(&wrong_prediction("deployment", "the deploy pipeline timed out"))
        .unwrap();

    let miner = PatternMiner::new(Arc::clone(&storage), ReflexConfig::default());
    let result = miner.mine(OWNER, "deployment", "outcome-1").unwrap();
    assert!(result.pattern_detected.is_none());
    assert!(storage.list_patterns(OWNER, None).unwrap().is_empty());
}

#[test]
fn repeat_mining_strengthens_then_promotes_exactly_once() {
    let storage = storage();
    let miner = PatternMiner::new(Arc::clone(&storage), ReflexConfig::default());
    let text = "the deploy pipeline timed out waiting for the smoke test";

    storage
        .insert_prediction(&wrong_prediction("deployment", text))
        .unwrap();
    storage
        .insert_prediction(&wrong_prediction("deployment", text))
        .unwrap();

    // Two wrong predictions on the books: first pass creates.
    let first = miner.mine(OWNER, "deployment", "outcome-1").unwrap();
    let signature = first.pattern_detected.clone().unwrap();
    assert!(first.gene_created.is_none());
    let created = storage
        .find_pattern(OWNER, "deployment", &signature)
        .unwrap()
        .unwrap();
    assert_eq!(created.frequency, 1);
    assert_eq!(created.status, PatternStatus::Emerging);
    assert!((created.confidence.value() - 0.3).abs() < 1e-9);

    // Second pass strengthens.
    storage
        .insert_prediction(&wrong_prediction("deployment", text))
        .unwrap();
    let second = miner.mine(OWNER, "deployment", "outcome-2").unwrap();
    assert!(second.gene_created.is_none());
    let strengthened = storage
        .find_pattern(OWNER, "deployment", &signature)
        .unwrap()
        .unwrap();
    assert_eq!(strengthened.frequency, 2);
    assert!((strengthened.confidence.value() - 0.4).abs() < 1e-9);

    // Third pass crosses the threshold and promotes.
    let third = miner.mine(OWNER, "deployment", "outcome-3").unwrap();
    let gene_id = third.gene_created.expect("promotion at frequency 3");
    let gene = storage.get_gene(OWNER, &gene_id).unwrap().unwrap();
    // Private deployment, no avoidance language: straight to active.
    assert_eq!(gene.status, GeneStatus::Active);
    assert_eq!(gene.source_pattern.as_deref(), Some(signature.as_str()));
    let promoted = storage
        .find_pattern(OWNER, "deployment", &signature)
        .unwrap()
        .unwrap();
    assert_eq!(promoted.status, PatternStatus::Promoted);
    assert_eq!(promoted.promoted_gene_text.as_deref(), Some(gene.text.as_str()));

    // Fourth pass: pattern is promoted, never promotes again.
    let fourth = miner.mine(OWNER, "deployment", "outcome-4").unwrap();
    assert!(fourth.gene_created.is_none());
    let genes = storage.list_genes(OWNER, &GeneFilter::default()).unwrap();
    assert_eq!(genes.len(), 1);
}

#[test]
fn avoidance_language_raises_the_promotion_bar() {
    let storage = storage();
    let miner = PatternMiner::new(Arc::clone(&storage), ReflexConfig::default());
    let text = "we should avoid shipping the parser rewrite before the holiday freeze";
    storage
        .insert_prediction(&wrong_prediction("task_planning", text))
        .unwrap();
    storage
        .insert_prediction(&wrong_prediction("task_planning", text))
        .unwrap();

    // Frequencies 1 through 4 never promote a capability-reducing gene.
    for i in 0..4 {
        let result = miner
            .mine(OWNER, "task_planning", &format!("outcome-{i}"))
            .unwrap();
        assert!(result.gene_created.is_none());
    }
    // Frequency 5 does, and it lands in review with its risk marked.
    let result = miner.mine(OWNER, "task_planning", "outcome-5").unwrap();
    let gene_id = result.gene_created.expect("promotion at frequency 5");
    let gene = storage.get_gene(OWNER, &gene_id).unwrap().unwrap();
    assert_eq!(gene.status, GeneStatus::PendingReview);
    assert!(gene.requires_review);
    assert_eq!(gene.regression_risk, RegressionRisk::Moderate);
}

#[test]
fn confirm_then_contradict_moves_strength_and_dormancy() {
    let storage = storage();
    let genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    let gene = genome
        .create(OWNER, &create_request("code_generation", "re-run the unit suite"), "operator")
        .unwrap();
    assert!((gene.strength.value() - 0.5).abs() < 1e-9);

    let confirmed = genome.confirm(OWNER, &gene.id, "operator").unwrap();
    assert!((confirmed.strength.value() - 0.6).abs() < 1e-9);
    assert_eq!(confirmed.confirmations, 1);

    let contradicted = genome.contradict(OWNER, &gene.id, "operator").unwrap();
    assert!((contradicted.strength.value() - 0.45).abs() < 1e-9);
    assert_eq!(contradicted.contradictions, 1);
    assert_eq!(contradicted.status, GeneStatus::Dormant);
}

#[test]
fn quota_blocks_creation_with_counts() {
    let storage = storage();
    let mut config = ReflexConfig::default();
    config.genome.max_active_per_domain = 2;
    let genome = Genome::new(Arc::clone(&storage), config);

    genome
        .create(OWNER, &create_request("deployment", "first directive"), "operator")
        .unwrap();
    genome
        .create(OWNER, &create_request("deployment", "second directive"), "operator")
        .unwrap();
    let err = genome
        .create(OWNER, &create_request("deployment", "third directive"), "operator")
        .unwrap_err();
    match err {
        ReflexError::QuotaExceeded { current, limit, .. } => {
            assert_eq!(current, 2);
            assert_eq!(limit, 2);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }
}

#[test]
fn duplicate_text_in_domain_conflicts() {
    let storage = storage();
    let genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    genome
        .create(OWNER, &create_request("deployment", "check the rollout twice"), "operator")
        .unwrap();
    let err = genome
        .create(OWNER, &create_request("deployment", "check the rollout twice"), "operator")
        .unwrap_err();
    assert!(matches!(err, ReflexError::Conflict { .. }));
}

#[test]
fn approve_is_gated_by_privacy_and_status() {
    let storage = storage();

    let mut public = ReflexConfig::default();
    public.deployment.is_private = false;
    let public_genome = Genome::new(Arc::clone(&storage), public);
    let gene = public_genome
        .create(OWNER, &create_request("deployment", "directive under review"), "operator")
        .unwrap();
    // Non-private creation always lands in review.
    assert_eq!(gene.status, GeneStatus::PendingReview);
    let err = public_genome.approve(OWNER, &gene.id, "operator").unwrap_err();
    assert!(matches!(err, ReflexError::Forbidden { .. }));

    let private_genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    let approved = private_genome.approve(OWNER, &gene.id, "operator").unwrap();
    assert_eq!(approved.status, GeneStatus::Active);
    // Approving an already-active gene conflicts.
    let err = private_genome.approve(OWNER, &gene.id, "operator").unwrap_err();
    assert!(matches!(err, ReflexError::Conflict { .. }));
}

#[test]
fn moderate_risk_requires_review_even_on_private() {
    let storage = storage();
    let genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    let mut request = create_request("deployment", "roll back on elevated error rates");
    request.regression_risk = RegressionRisk::Moderate;
    let gene = genome.create(OWNER, &request, "operator").unwrap();
    assert_eq!(gene.status, GeneStatus::PendingReview);
}

#[test]
fn mutation_history_is_bounded_to_ten() {
    let storage = storage();
    let genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    let gene = genome
        .create(OWNER, &create_request("deployment", "directive v0"), "operator")
        .unwrap();
    for i in 1..=12 {
        genome
            .mutate(
                OWNER,
                &gene.id,
                &format!("directive v{i}"),
                None,
                None,
                Some("clarified".to_string()),
                "operator",
            )
            .unwrap();
    }
    let mutated = storage.get_gene(OWNER, &gene.id).unwrap().unwrap();
    assert_eq!(mutated.text, "directive v12");
    assert_eq!(mutated.mutation_history.len(), 10);
    assert_eq!(mutated.mutation_history[0].from, "directive v2");
}

#[test]
fn every_operation_leaves_one_audit_entry() {
    let storage = storage();
    let genome = Genome::new(Arc::clone(&storage), ReflexConfig::default());
    let gene = genome
        .create(OWNER, &create_request("deployment", "audited directive"), "operator")
        .unwrap();
    genome.confirm(OWNER, &gene.id, "operator").unwrap();
    genome.contradict(OWNER, &gene.id, "reviewer").unwrap();
    genome.delete(OWNER, &gene.id, "operator").unwrap();

    let trail = storage.audit_trail(OWNER, &gene.id).unwrap();
    let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ManualCreate,
            AuditAction::Confirmed,
            AuditAction::Contradicted,
            AuditAction::Deleted,
        ]
    );
    // Soft delete keeps the row.
    let row = storage.get_gene(OWNER, &gene.id).unwrap().unwrap();
    assert_eq!(row.status, GeneStatus::Deleted);
}
