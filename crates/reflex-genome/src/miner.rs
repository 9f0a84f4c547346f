//! Mining pass run after a wrong resolution: cluster recent wrong
//! predictions by token signature, strengthen or create the pattern,
//! and promote it into a gene once it crosses the frequency threshold.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::config::ReflexConfig;
use reflex_core::constants::{HISTORY_EXCERPT_LEN, RECENT_WRONG_WINDOW};
use reflex_core::errors::ReflexResult;
use reflex_core::models::{
    AuditAction, FailurePattern, Gene, GeneAuditEntry, GeneStatus, PatternStatus, Prediction,
    RegressionRisk, Score,
};
use reflex_core::traits::IReflexStorage;

use crate::signature::{failure_signature, is_capability_reducing};

/// What one mining pass produced, for the resolution report.
#[derive(Debug, Clone, Default)]
pub struct MiningResult {
    /// Signature of the pattern created or strengthened.
    pub pattern_detected: Option<String>,
    /// Id of the gene promoted from the pattern.
    pub gene_created: Option<String>,
}

/// Clusters wrong predictions into patterns and promotes genes.
pub struct PatternMiner {
    storage: Arc<dyn IReflexStorage>,
    config: ReflexConfig,
}

impl PatternMiner {
    pub fn new(storage: Arc<dyn IReflexStorage>, config: ReflexConfig) -> Self {
        Self { storage, config }
    }

    /// Run one mining pass for the domain that just took a wrong
    /// resolution. Needs at least two recent wrong predictions sharing
    /// the window before any pattern exists.
    pub fn mine(&self, owner: &str, domain: &str, outcome_id: &str) -> ReflexResult<MiningResult> {
        let wrong = self
            .storage
            .recent_wrong_predictions(owner, domain, RECENT_WRONG_WINDOW)?;
        if wrong.len() < 2 {
            return Ok(MiningResult::default());
        }

        let texts: Vec<&str> = wrong.iter().map(|p| p.text.as_str()).collect();
        let signature = failure_signature(&texts);
        let now = Utc::now();

        let mut result = MiningResult {
            pattern_detected: Some(signature.clone()),
            gene_created: None,
        };

        match self.storage.find_pattern(owner, domain, &signature)? {
            Some(mut pattern) => {
                pattern.frequency += 1;
                pattern.confidence =
                    pattern.confidence + self.config.genome.pattern_confidence_step;
                pattern.push_outcome_id(outcome_id.to_string());
                pattern.updated_at = now;

                if pattern.status == PatternStatus::Emerging {
                    result.gene_created = self.try_promote(owner, &mut pattern, &wrong)?;
                }
                self.storage.update_pattern(&pattern)?;
            }
            None => {
                let pattern = FailurePattern {
                    id: Uuid::new_v4().to_string(),
                    owner_id: owner.to_string(),
                    domain: domain.to_string(),
                    pattern_type: "repeated_failure".to_string(),
                    signature: signature.clone(),
                    description: format!(
                        "{} recent wrong predictions in {domain} share [{signature}]",
                        wrong.len()
                    ),
                    frequency: 1,
                    confidence: Score::new(self.config.genome.pattern_base_confidence),
                    contributing_outcome_ids: vec![outcome_id.to_string()],
                    promoted_gene_text: None,
                    status: PatternStatus::Emerging,
                    created_at: now,
                    updated_at: now,
                };
                self.storage.insert_pattern(&pattern)?;
                tracing::info!(owner = %owner, domain = %domain, signature = %signature,
                    "new failure pattern");
            }
        }

        Ok(result)
    }

    /// Promote the pattern into a gene when it crossed the frequency
    /// threshold. Capability-reducing directives need a higher
    /// frequency and always land in review.
    fn try_promote(
        &self,
        owner: &str,
        pattern: &mut FailurePattern,
        wrong: &[Prediction],
    ) -> ReflexResult<Option<String>> {
        let gene_text = gene_text_for(pattern, wrong);
        let capability_reducing = is_capability_reducing(&gene_text);
        let required = if capability_reducing {
            self.config.genome.capability_reducing_frequency
        } else {
            self.config.genome.promotion_frequency
        };
        if pattern.frequency < required {
            return Ok(None);
        }
        if self
            .storage
            .gene_exists(owner, &pattern.domain, &gene_text)?
        {
            return Ok(None);
        }

        let requires_review = capability_reducing || !self.config.deployment.is_private;
        let mut status = if requires_review {
            GeneStatus::PendingReview
        } else {
            GeneStatus::Active
        };
        // A full active roster downgrades the promotion to review
        // instead of dropping it.
        if status == GeneStatus::Active {
            let active = self.storage.count_active_genes(owner, &pattern.domain)?;
            if active >= self.config.genome.max_active_per_domain {
                tracing::warn!(owner = %owner, domain = %pattern.domain,
                    "active gene quota full, promoting into review");
                status = GeneStatus::PendingReview;
            }
        }

        let now = Utc::now();
        let gene = Gene {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            text: gene_text.clone(),
            gene_type: "caution".to_string(),
            domain: pattern.domain.clone(),
            source_pattern: Some(pattern.signature.clone()),
            source_pattern_id: Some(pattern.id.clone()),
            trigger_condition: format!(
                "working in {} on topics matching [{}]",
                pattern.domain, pattern.signature
            ),
            action_directive: "verify the claim before asserting it and state lower confidence"
                .to_string(),
            strength: pattern.confidence,
            status,
            confirmations: 0,
            contradictions: 0,
            applications: 0,
            requires_review,
            regression_risk: if capability_reducing {
                RegressionRisk::Moderate
            } else {
                RegressionRisk::Low
            },
            last_applied_at: None,
            mutation_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let audit = GeneAuditEntry::record(
            owner,
            &gene.id,
            AuditAction::AutoPromoted,
            None,
            Some(serde_json::to_value(&gene)?),
            Some(format!(
                "pattern [{}] reached frequency {}",
                pattern.signature, pattern.frequency
            )),
            "pattern_miner",
        );
        self.storage.insert_gene(&gene, &audit)?;

        pattern.status = PatternStatus::Promoted;
        pattern.promoted_gene_text = Some(gene_text);

        tracing::info!(owner = %owner, domain = %gene.domain, gene = %gene.id,
            status = %gene.status.as_str(), "pattern promoted into gene");
        Ok(Some(gene.id))
    }
}

fn gene_text_for(pattern: &FailurePattern, wrong: &[Prediction]) -> String {
    let examples = wrong
        .iter()
        .take(3)
        .map(|p| Prediction::cap_text(&p.text, HISTORY_EXCERPT_LEN))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Exercise caution in {}: repeated failures around [{}]. Recent wrong predictions: {}",
        pattern.domain, pattern.signature, examples
    )
}
