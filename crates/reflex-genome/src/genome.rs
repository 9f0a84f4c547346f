//! Administrative operations on the gene store. Every mutating call
//! writes exactly one audit entry, committed with the gene row.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::config::ReflexConfig;
use reflex_core::errors::{ReflexError, ReflexResult};
use reflex_core::models::{
    AuditAction, Gene, GeneAuditEntry, GeneMutation, GeneStatus, RegressionRisk, Score,
};
use reflex_core::traits::IReflexStorage;

use crate::signature::is_capability_reducing;

/// Minimum strength a manually created gene starts with.
const MIN_CREATE_STRENGTH: f64 = 0.1;

/// Parameters for manual gene creation.
#[derive(Debug, Clone)]
pub struct CreateGeneRequest {
    pub text: String,
    pub gene_type: String,
    pub domain: String,
    pub trigger_condition: String,
    pub action_directive: String,
    pub strength: f64,
    pub regression_risk: RegressionRisk,
}

/// The gene store and its governance rules.
pub struct Genome {
    storage: Arc<dyn IReflexStorage>,
    config: ReflexConfig,
}

impl Genome {
    pub fn new(storage: Arc<dyn IReflexStorage>, config: ReflexConfig) -> Self {
        Self { storage, config }
    }

    fn require(&self, owner: &str, id: &str) -> ReflexResult<Gene> {
        self.storage
            .get_gene(owner, id)?
            .ok_or_else(|| ReflexError::not_found("gene", id))
    }

    /// Create a gene manually. Fails with `QuotaExceeded` when the
    /// domain's active roster is full and `Conflict` when an identical
    /// (domain, text) gene already exists.
    pub fn create(&self, owner: &str, request: &CreateGeneRequest, actor: &str) -> ReflexResult<Gene> {
        if request.text.trim().is_empty() {
            return Err(ReflexError::invalid("gene text must not be empty"));
        }
        if request.domain.trim().is_empty() {
            return Err(ReflexError::invalid("gene domain must not be empty"));
        }
        if self
            .storage
            .gene_exists(owner, &request.domain, &request.text)?
        {
            return Err(ReflexError::conflict(format!(
                "gene with identical text already exists in {}",
                request.domain
            )));
        }
        let active = self.storage.count_active_genes(owner, &request.domain)?;
        let limit = self.config.genome.max_active_per_domain;
        if active >= limit {
            return Err(ReflexError::QuotaExceeded {
                resource: "active genes per domain",
                current: active,
                limit,
            });
        }

        let requires_review = !self.config.deployment.is_private
            || matches!(
                request.regression_risk,
                RegressionRisk::Moderate | RegressionRisk::High
            )
            || is_capability_reducing(&request.text);
        let now = Utc::now();
        let gene = Gene {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            text: request.text.clone(),
            gene_type: request.gene_type.clone(),
            domain: request.domain.clone(),
            source_pattern: None,
            source_pattern_id: None,
            trigger_condition: request.trigger_condition.clone(),
            action_directive: request.action_directive.clone(),
            strength: Score::new(request.strength.max(MIN_CREATE_STRENGTH)),
            status: if requires_review {
                GeneStatus::PendingReview
            } else {
                GeneStatus::Active
            },
            confirmations: 0,
            contradictions: 0,
            applications: 0,
            requires_review,
            regression_risk: request.regression_risk,
            last_applied_at: None,
            mutation_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let audit = GeneAuditEntry::record(
            owner,
            &gene.id,
            AuditAction::ManualCreate,
            None,
            Some(serde_json::to_value(&gene)?),
            None,
            actor,
        );
        self.storage.insert_gene(&gene, &audit)?;
        tracing::info!(owner = %owner, gene = %gene.id, domain = %gene.domain,
            status = %gene.status.as_str(), "gene created");
        Ok(gene)
    }

    /// Strength += 0.1 (capped at 1), confirmations += 1.
    pub fn confirm(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        let mut gene = self.require(owner, id)?;
        let before = serde_json::to_value(&gene)?;
        gene.strength = gene.strength + self.config.genome.confirm_bonus;
        gene.confirmations += 1;
        gene.updated_at = Utc::now();
        let audit = GeneAuditEntry::record(
            owner,
            id,
            AuditAction::Confirmed,
            Some(before),
            Some(serde_json::to_value(&gene)?),
            None,
            actor,
        );
        self.storage.update_gene(&gene, &audit)?;
        Ok(gene)
    }

    /// Strength −= 0.15 (floored at 0), contradictions += 1, status
    /// drops to dormant.
    pub fn contradict(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        let mut gene = self.require(owner, id)?;
        let before = serde_json::to_value(&gene)?;
        gene.strength = gene.strength - self.config.genome.contradict_penalty;
        gene.contradictions += 1;
        gene.status = GeneStatus::Dormant;
        gene.updated_at = Utc::now();
        let audit = GeneAuditEntry::record(
            owner,
            id,
            AuditAction::Contradicted,
            Some(before),
            Some(serde_json::to_value(&gene)?),
            None,
            actor,
        );
        self.storage.update_gene(&gene, &audit)?;
        Ok(gene)
    }

    /// Activate a pending-review gene. Private deployments only.
    pub fn approve(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        if !self.config.deployment.is_private {
            return Err(ReflexError::Forbidden {
                message: "gene approval requires a private deployment".to_string(),
            });
        }
        let mut gene = self.require(owner, id)?;
        if gene.status != GeneStatus::PendingReview {
            return Err(ReflexError::conflict(format!(
                "gene {id} is {}, expected pending_review",
                gene.status.as_str()
            )));
        }
        let before = serde_json::to_value(&gene)?;
        gene.status = GeneStatus::Active;
        gene.updated_at = Utc::now();
        let audit = GeneAuditEntry::record(
            owner,
            id,
            AuditAction::Approved,
            Some(before),
            Some(serde_json::to_value(&gene)?),
            None,
            actor,
        );
        self.storage.update_gene(&gene, &audit)?;
        Ok(gene)
    }

    /// Rewrite the directive, recording the transition in the bounded
    /// mutation history.
    pub fn mutate(
        &self,
        owner: &str,
        id: &str,
        new_text: &str,
        new_trigger: Option<&str>,
        new_action: Option<&str>,
        reason: Option<String>,
        actor: &str,
    ) -> ReflexResult<Gene> {
        if new_text.trim().is_empty() {
            return Err(ReflexError::invalid("mutated gene text must not be empty"));
        }
        let mut gene = self.require(owner, id)?;
        let before = serde_json::to_value(&gene)?;
        let now = Utc::now();
        gene.push_mutation(GeneMutation {
            from: gene.text.clone(),
            to: new_text.to_string(),
            reason: reason.clone(),
            at: now,
        });
        gene.text = new_text.to_string();
        if let Some(trigger) = new_trigger {
            gene.trigger_condition = trigger.to_string();
        }
        if let Some(action) = new_action {
            gene.action_directive = action.to_string();
        }
        gene.updated_at = now;
        let audit = GeneAuditEntry::record(
            owner,
            id,
            AuditAction::Mutated,
            Some(before),
            Some(serde_json::to_value(&gene)?),
            reason,
            actor,
        );
        self.storage.update_gene(&gene, &audit)?;
        Ok(gene)
    }

    /// Soft delete. The row stays for audit; only the weak-gene prune
    /// sweep ever hard-removes genes.
    pub fn delete(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        let mut gene = self.require(owner, id)?;
        let before = serde_json::to_value(&gene)?;
        gene.status = GeneStatus::Deleted;
        gene.updated_at = Utc::now();
        let audit = GeneAuditEntry::record(
            owner,
            id,
            AuditAction::Deleted,
            Some(before),
            Some(serde_json::to_value(&gene)?),
            None,
            actor,
        );
        self.storage.update_gene(&gene, &audit)?;
        Ok(gene)
    }
}
