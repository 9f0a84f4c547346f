//! The lifecycle sweeper: nine isolated maintenance steps, safe to run
//! on a timer alongside live resolution traffic. A failing step is
//! logged into the report and never aborts the rest of the sweep.

use std::sync::Arc;

use chrono::{Duration, Utc};

use reflex_calibration::CalibrationEngine;
use reflex_core::config::ReflexConfig;
use reflex_core::errors::ReflexResult;
use reflex_core::models::{AuditAction, GeneAuditEntry, GeneStatus, PredictionStatus, SweepReport};
use reflex_core::traits::IReflexStorage;

pub struct LifecycleSweeper {
    storage: Arc<dyn IReflexStorage>,
    config: ReflexConfig,
    calibration: CalibrationEngine,
}

impl LifecycleSweeper {
    pub fn new(storage: Arc<dyn IReflexStorage>, config: ReflexConfig) -> Self {
        let calibration = CalibrationEngine::new(Arc::clone(&storage));
        Self {
            storage,
            config,
            calibration,
        }
    }

    /// Run one full sweep for an owner.
    pub fn sweep_owner(&self, owner: &str) -> SweepReport {
        let mut report = SweepReport::default();

        step(&mut report, "expire_stale_pending", |r| {
            r.stale_predictions_expired = self.expire_stale_pending(owner)?;
            Ok(())
        });
        step(&mut report, "expire_ttl_pending", |r| {
            r.ttl_predictions_expired = self.expire_ttl_pending(owner)?;
            Ok(())
        });
        step(&mut report, "delete_weak_genes", |r| {
            r.weak_genes_deleted = self
                .storage
                .delete_weak_genes(owner, self.config.lifecycle.weak_gene_strength)?;
            Ok(())
        });
        step(&mut report, "prune_weak_patterns", |r| {
            r.weak_patterns_pruned = self
                .storage
                .prune_weak_patterns(owner, self.config.lifecycle.weak_pattern_frequency)?;
            Ok(())
        });
        step(&mut report, "prune_history", |r| {
            let cutoff = Utc::now() - Duration::days(self.config.lifecycle.history_retention_days);
            r.history_points_pruned = self.storage.prune_history_before(owner, cutoff)?;
            Ok(())
        });
        step(&mut report, "prune_calibration", |r| {
            let cutoff =
                Utc::now() - Duration::days(self.config.lifecycle.calibration_retention_days);
            r.calibration_snapshots_pruned =
                self.storage.prune_calibration_before(owner, cutoff)?;
            Ok(())
        });
        step(&mut report, "auto_activate_genes", |r| {
            r.genes_auto_activated = self.auto_activate(owner)?;
            Ok(())
        });
        step(&mut report, "calibration_snapshot", |r| {
            r.calibration_buckets_written = self.calibration.snapshot_all(owner)?;
            Ok(())
        });
        step(&mut report, "decay_domains", |r| {
            r.domains_decayed = self.decay_domains(owner)?;
            Ok(())
        });

        tracing::info!(
            owner = %owner,
            expired = report.stale_predictions_expired + report.ttl_predictions_expired,
            decayed = report.domains_decayed,
            failed = report.failed_steps.len(),
            "lifecycle sweep finished"
        );
        report
    }

    /// Sweep every owner present in storage.
    pub fn sweep_all(&self) -> ReflexResult<Vec<(String, SweepReport)>> {
        let owners = self.storage.distinct_owners()?;
        Ok(owners
            .into_iter()
            .map(|owner| {
                let report = self.sweep_owner(&owner);
                (owner, report)
            })
            .collect())
    }

    fn expire_stale_pending(&self, owner: &str) -> ReflexResult<usize> {
        let cutoff = Utc::now() - Duration::days(self.config.lifecycle.pending_expiry_days);
        let stale = self.storage.pending_created_before(owner, cutoff)?;
        let mut expired = 0;
        for prediction in stale {
            match self
                .storage
                .transition_prediction(owner, &prediction.id, PredictionStatus::Expired)
            {
                Ok(_) => expired += 1,
                // A concurrent resolution won the row; nothing to do.
                Err(e) => tracing::debug!(prediction = %prediction.id, error = %e,
                    "stale expiry skipped"),
            }
        }
        Ok(expired)
    }

    fn expire_ttl_pending(&self, owner: &str) -> ReflexResult<usize> {
        let past_ttl = self.storage.pending_past_ttl(owner, Utc::now())?;
        let mut expired = 0;
        for prediction in past_ttl {
            match self
                .storage
                .transition_prediction(owner, &prediction.id, PredictionStatus::Expired)
            {
                Ok(_) => expired += 1,
                Err(e) => tracing::debug!(prediction = %prediction.id, error = %e,
                    "ttl expiry skipped"),
            }
        }
        Ok(expired)
    }

    /// Non-private deployments only: promote well-confirmed review
    /// genes to active without operator involvement.
    fn auto_activate(&self, owner: &str) -> ReflexResult<usize> {
        if self.config.deployment.is_private {
            return Ok(0);
        }
        let candidates = self.storage.auto_activation_candidates(
            owner,
            self.config.lifecycle.auto_activate_confirmations,
        )?;
        let mut activated = 0;
        for mut gene in candidates {
            let before = serde_json::to_value(&gene)?;
            gene.status = GeneStatus::Active;
            gene.updated_at = Utc::now();
            let audit = GeneAuditEntry::record(
                owner,
                &gene.id,
                AuditAction::AutoActivated,
                Some(before),
                Some(serde_json::to_value(&gene)?),
                Some(format!("{} confirmations, 0 contradictions", gene.confirmations)),
                "lifecycle_sweeper",
            );
            self.storage.update_gene(&gene, &audit)?;
            activated += 1;
        }
        Ok(activated)
    }

    /// One multiplicative decay step for every domain, even absent new
    /// outcomes.
    fn decay_domains(&self, owner: &str) -> ReflexResult<usize> {
        let states = self.storage.list_domain_states(owner)?;
        let count = states.len();
        let now = Utc::now();
        for state in states {
            self.storage.modify_domain_state(
                owner,
                &state.domain,
                self.config.domains.decay_rate,
                &mut |s| {
                    s.pain_score = s.pain_score.decayed(s.decay_rate);
                    s.satisfaction_score = s.satisfaction_score.decayed(s.decay_rate);
                    s.updated_at = now;
                },
            )?;
        }
        Ok(count)
    }
}

/// Run one sweep step, recording a failure instead of propagating it.
fn step(report: &mut SweepReport, name: &'static str, f: impl FnOnce(&mut SweepReport) -> ReflexResult<()>) {
    if let Err(e) = f(report) {
        tracing::warn!(step = name, error = %e, "sweep step failed");
        report.failed_steps.push(name.to_string());
    }
}
