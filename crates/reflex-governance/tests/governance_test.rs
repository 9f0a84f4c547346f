//! Addendum assembly against the real storage engine.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::config::DeploymentConfig;
use reflex_core::models::{
    AuditAction, DomainState, Gene, GeneAuditEntry, GeneStatus, RegressionRisk, Score,
};
use reflex_core::traits::IReflexStorage;
use reflex_governance::{AddendumAssembler, GovernanceGate};
use reflex_storage::StorageEngine;

const OWNER: &str = "owner-1";

fn storage() -> Arc<dyn IReflexStorage> {
    Arc::new(StorageEngine::open_in_memory().unwrap())
}

fn gene(status: GeneStatus, strength: f64) -> Gene {
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
        confirmations: 0,
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

fn insert(storage: &Arc<dyn IReflexStorage>, g: &Gene) {
    let audit =
        GeneAuditEntry::record(OWNER, &g.id, AuditAction::ManualCreate, None, None, None, "test");
    storage.insert_gene(g, &audit).unwrap();
}

#[test]
fn addendum_filters_by_status_and_strength() {
    let storage = storage();
    let strong_active = gene(GeneStatus::Active, 0.8);
    insert(&storage, &strong_active);
    insert(&storage, &gene(GeneStatus::Active, 0.2)); // below the floor
    insert(&storage, &gene(GeneStatus::PendingReview, 0.9));
    insert(&storage, &gene(GeneStatus::Dormant, 0.9));
    storage
        .upsert_domain_state(&DomainState::fresh("code_generation", OWNER, 0.9))
        .unwrap();

    let data = AddendumAssembler::new(Arc::clone(&storage))
        .assemble(OWNER, false, false)
        .unwrap();

    assert_eq!(data.active_genes.len(), 1);
    assert_eq!(data.active_genes[0].id, strong_active.id);
    assert_eq!(data.pending_review_count, 1);
    assert_eq!(data.domain_states.len(), 1);
    assert!(!data.bootstrap_active);
    assert!(!data.kill_switch_active);
}

#[test]
fn addendum_caps_at_twenty_strongest() {
    let storage = storage();
    for i in 0..25 {
        insert(&storage, &gene(GeneStatus::Active, 0.3 + f64::from(i) * 0.02));
    }

    let data = AddendumAssembler::new(Arc::clone(&storage))
        .assemble(OWNER, false, false)
        .unwrap();

    assert_eq!(data.active_genes.len(), 20);
    // Sorted strongest first; the five weakest fell off.
    assert!(data.active_genes[0].strength.value() >= data.active_genes[19].strength.value());
    assert!(data.active_genes[19].strength.value() >= 0.3 + 5.0 * 0.02 - 1e-9);
}

#[test]
fn kill_switch_empties_only_the_gene_list() {
    let storage = storage();
    insert(&storage, &gene(GeneStatus::Active, 0.8));
    insert(&storage, &gene(GeneStatus::PendingReview, 0.5));
    storage
        .upsert_domain_state(&DomainState::fresh("deployment", OWNER, 0.9))
        .unwrap();

    let gate = GovernanceGate::new(DeploymentConfig::default());
    gate.set_kill_switch(true);

    let data = AddendumAssembler::new(Arc::clone(&storage))
        .assemble(OWNER, gate.bootstrap_active(), gate.kill_switch_active())
        .unwrap();

    assert!(data.active_genes.is_empty());
    assert_eq!(data.pending_review_count, 1);
    assert_eq!(data.domain_states.len(), 1);
    assert!(data.kill_switch_active);
}
