//! Composite results returned by engine operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    CalibrationSnapshot, DomainState, FailurePattern, Gene, Outcome, Prediction,
};

/// Result of resolving a prediction: the recorded outcome, the updated
/// domain state, and whatever the (isolated) pattern-mining pass produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub outcome: Outcome,
    pub domain_state: DomainState,
    /// Signature of the pattern detected or strengthened, if any.
    pub pattern_detected: Option<String>,
    /// Id of the gene created by promotion, if any.
    pub gene_created: Option<String>,
}

/// Result of `resolve_most_recent_pending`; `resolved` is false when the
/// conversation had no pending prediction (a no-op, not an error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentResolution {
    pub resolved: bool,
    pub prediction_id: Option<String>,
    pub report: Option<ResolutionReport>,
}

impl RecentResolution {
    pub fn skipped() -> Self {
        Self {
            resolved: false,
            prediction_id: None,
            report: None,
        }
    }
}

/// Per-step counts from one lifecycle sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub stale_predictions_expired: usize,
    pub ttl_predictions_expired: usize,
    pub weak_genes_deleted: usize,
    pub weak_patterns_pruned: usize,
    pub history_points_pruned: usize,
    pub calibration_snapshots_pruned: usize,
    pub genes_auto_activated: usize,
    pub calibration_buckets_written: usize,
    pub domains_decayed: usize,
    /// Steps that failed (by name); a failing step never aborts the sweep.
    pub failed_steps: Vec<String>,
}

/// The sole contract consumed by the external prompt assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddendumData {
    pub domain_states: Vec<DomainState>,
    /// Active genes with strength >= 0.3, capped at 20.
    /// Empty whenever the kill switch is engaged.
    pub active_genes: Vec<Gene>,
    pub pending_review_count: u64,
    pub bootstrap_active: bool,
    pub kill_switch_active: bool,
}

/// Aggregate view for the operator dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_predictions: u64,
    pub pending: u64,
    pub correct: u64,
    pub wrong: u64,
    pub partial: u64,
    pub expired: u64,
    pub overall_accuracy: f64,
    pub domain_states: Vec<DomainState>,
    pub active_gene_count: u64,
    pub pending_review_count: u64,
    pub emerging_pattern_count: u64,
    pub recent_outcomes: Vec<Outcome>,
}

/// Full state dump for export/import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub owner_id: String,
    pub exported_at: DateTime<Utc>,
    pub engine_version: String,
    pub predictions: Vec<Prediction>,
    pub outcomes: Vec<Outcome>,
    pub domain_states: Vec<DomainState>,
    pub patterns: Vec<FailurePattern>,
    pub genes: Vec<Gene>,
    pub calibration: Vec<CalibrationSnapshot>,
}

/// Row counts from an import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub predictions: usize,
    pub outcomes: usize,
    pub domain_states: usize,
    pub patterns: usize,
    pub genes: usize,
    pub calibration: usize,
}
