use chrono::{DateTime, Utc};

use crate::errors::ReflexResult;
use crate::models::{
    CalibrationSnapshot, DomainHistoryPoint, DomainState, FailurePattern, Gene, GeneAuditEntry,
    GeneStatus, Outcome, Prediction, PredictionStatus,
};

/// Filter for prediction listings.
#[derive(Debug, Clone, Default)]
pub struct PredictionFilter {
    pub status: Option<PredictionStatus>,
    pub domain: Option<String>,
    pub conversation_id: Option<String>,
    pub limit: Option<usize>,
}

/// Filter for gene listings.
#[derive(Debug, Clone, Default)]
pub struct GeneFilter {
    pub status: Option<GeneStatus>,
    pub domain: Option<String>,
    pub limit: Option<usize>,
}

/// Full persistence contract for the engine. All state is keyed by
/// (entity id, owner) or (domain, owner); per-row atomicity is assumed.
pub trait IReflexStorage: Send + Sync {
    // --- Predictions ---
    fn insert_prediction(&self, prediction: &Prediction) -> ReflexResult<()>;
    fn get_prediction(&self, owner: &str, id: &str) -> ReflexResult<Option<Prediction>>;
    /// Atomically move a pending prediction to a terminal status,
    /// returning its pre-transition row. Errors with `NotFound` when the
    /// row is absent for this owner and `Conflict` when already terminal.
    fn transition_prediction(
        &self,
        owner: &str,
        id: &str,
        to: PredictionStatus,
    ) -> ReflexResult<Prediction>;
    fn list_predictions(
        &self,
        owner: &str,
        filter: &PredictionFilter,
    ) -> ReflexResult<Vec<Prediction>>;
    fn prediction_exists_by_hash(&self, owner: &str, source_hash: &str) -> ReflexResult<bool>;
    fn most_recent_pending(
        &self,
        owner: &str,
        conversation_id: &str,
    ) -> ReflexResult<Option<Prediction>>;
    fn pending_created_before(
        &self,
        owner: &str,
        cutoff: DateTime<Utc>,
    ) -> ReflexResult<Vec<Prediction>>;
    fn pending_past_ttl(&self, owner: &str, now: DateTime<Utc>) -> ReflexResult<Vec<Prediction>>;
    fn recent_wrong_predictions(
        &self,
        owner: &str,
        domain: &str,
        limit: usize,
    ) -> ReflexResult<Vec<Prediction>>;
    /// Resolved (verified_*) predictions, optionally per domain.
    fn resolved_predictions(
        &self,
        owner: &str,
        domain: Option<&str>,
    ) -> ReflexResult<Vec<Prediction>>;

    // --- Outcomes ---
    fn insert_outcome(&self, outcome: &Outcome) -> ReflexResult<()>;
    fn get_outcome(&self, owner: &str, id: &str) -> ReflexResult<Option<Outcome>>;
    fn list_outcomes(&self, owner: &str, limit: usize) -> ReflexResult<Vec<Outcome>>;

    // --- Domain state ---
    fn get_domain_state(&self, owner: &str, domain: &str) -> ReflexResult<Option<DomainState>>;
    fn list_domain_states(&self, owner: &str) -> ReflexResult<Vec<DomainState>>;
    fn upsert_domain_state(&self, state: &DomainState) -> ReflexResult<()>;
    /// Read-modify-write of one (domain, owner) row in a single
    /// transaction; creates a fresh row when none exists.
    fn modify_domain_state(
        &self,
        owner: &str,
        domain: &str,
        decay_rate: f64,
        mutate: &mut dyn FnMut(&mut DomainState),
    ) -> ReflexResult<DomainState>;

    // --- Domain history ---
    fn append_history(&self, point: &DomainHistoryPoint) -> ReflexResult<()>;
    /// Most recent history points, newest first.
    fn recent_history(
        &self,
        owner: &str,
        domain: &str,
        limit: usize,
    ) -> ReflexResult<Vec<DomainHistoryPoint>>;
    fn prune_history_before(&self, owner: &str, cutoff: DateTime<Utc>) -> ReflexResult<usize>;

    // --- Patterns ---
    fn insert_pattern(&self, pattern: &FailurePattern) -> ReflexResult<()>;
    fn update_pattern(&self, pattern: &FailurePattern) -> ReflexResult<()>;
    fn find_pattern(
        &self,
        owner: &str,
        domain: &str,
        signature: &str,
    ) -> ReflexResult<Option<FailurePattern>>;
    fn list_patterns(&self, owner: &str, domain: Option<&str>)
        -> ReflexResult<Vec<FailurePattern>>;
    /// Delete emerging patterns with frequency below the threshold.
    fn prune_weak_patterns(&self, owner: &str, min_frequency: u32) -> ReflexResult<usize>;

    // --- Genes ---
    /// Insert a gene together with its audit entry, in one transaction.
    fn insert_gene(&self, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()>;
    /// Persist the full updated gene row together with its audit entry.
    fn update_gene(&self, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()>;
    fn get_gene(&self, owner: &str, id: &str) -> ReflexResult<Option<Gene>>;
    fn list_genes(&self, owner: &str, filter: &GeneFilter) -> ReflexResult<Vec<Gene>>;
    fn count_active_genes(&self, owner: &str, domain: &str) -> ReflexResult<u64>;
    fn gene_exists(&self, owner: &str, domain: &str, text: &str) -> ReflexResult<bool>;
    fn pending_review_count(&self, owner: &str) -> ReflexResult<u64>;
    /// Pending-review genes with at least the given confirmations and
    /// zero contradictions.
    fn auto_activation_candidates(
        &self,
        owner: &str,
        min_confirmations: u32,
    ) -> ReflexResult<Vec<Gene>>;
    /// Hard-delete dormant genes below the strength threshold.
    /// The only path that ever removes a gene row.
    fn delete_weak_genes(&self, owner: &str, max_strength: f64) -> ReflexResult<usize>;

    // --- Gene audit ---
    fn audit_trail(&self, owner: &str, gene_id: &str) -> ReflexResult<Vec<GeneAuditEntry>>;

    // --- Calibration ---
    fn insert_calibration(&self, snapshot: &CalibrationSnapshot) -> ReflexResult<()>;
    fn list_calibration(
        &self,
        owner: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> ReflexResult<Vec<CalibrationSnapshot>>;
    fn prune_calibration_before(&self, owner: &str, cutoff: DateTime<Utc>) -> ReflexResult<usize>;

    // --- Maintenance / import ---
    fn distinct_owners(&self) -> ReflexResult<Vec<String>>;
    /// Delete every row belonging to the owner (used by clearing imports).
    fn clear_owner(&self, owner: &str) -> ReflexResult<()>;
}
