use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_MUTATION_HISTORY;
use crate::errors::{ReflexError, ReflexResult};
use crate::models::Score;

/// Lifecycle of a behavioral gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneStatus {
    PendingReview,
    Active,
    Dormant,
    Deleted,
}

impl GeneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Active => "active",
            Self::Dormant => "dormant",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "pending_review" => Ok(Self::PendingReview),
            "active" => Ok(Self::Active),
            "dormant" => Ok(Self::Dormant),
            "deleted" => Ok(Self::Deleted),
            other => Err(ReflexError::invalid(format!("unknown gene status: {other}"))),
        }
    }
}

/// How risky it would be to regress behavior if this gene misfires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegressionRisk {
    #[default]
    None,
    Low,
    Moderate,
    High,
}

impl RegressionRisk {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            other => Err(ReflexError::invalid(format!(
                "unknown regression risk: {other}"
            ))),
        }
    }
}

/// One entry in a gene's bounded mutation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneMutation {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// A strength-scored, human-readable behavioral directive derived from
/// repeated failure patterns (or created manually).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gene {
    pub id: String,
    pub owner_id: String,
    pub text: String,
    pub gene_type: String,
    pub domain: String,
    /// Signature of the pattern this gene was promoted from, if any.
    pub source_pattern: Option<String>,
    pub source_pattern_id: Option<String>,
    pub trigger_condition: String,
    pub action_directive: String,
    pub strength: Score,
    pub status: GeneStatus,
    pub confirmations: u32,
    pub contradictions: u32,
    pub applications: u32,
    pub requires_review: bool,
    pub regression_risk: RegressionRisk,
    pub last_applied_at: Option<DateTime<Utc>>,
    /// Bounded to the most recent `MAX_MUTATION_HISTORY` entries.
    pub mutation_history: Vec<GeneMutation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gene {
    /// Append a mutation record, keeping the history bounded.
    pub fn push_mutation(&mut self, mutation: GeneMutation) {
        self.mutation_history.push(mutation);
        let len = self.mutation_history.len();
        if len > MAX_MUTATION_HISTORY {
            self.mutation_history.drain(..len - MAX_MUTATION_HISTORY);
        }
    }
}

/// Action recorded in the append-only gene audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ManualCreate,
    AutoPromoted,
    Confirmed,
    Contradicted,
    Approved,
    Mutated,
    Deleted,
    AutoActivated,
    Imported,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManualCreate => "manual_create",
            Self::AutoPromoted => "auto_promoted",
            Self::Confirmed => "confirmed",
            Self::Contradicted => "contradicted",
            Self::Approved => "approved",
            Self::Mutated => "mutated",
            Self::Deleted => "deleted",
            Self::AutoActivated => "auto_activated",
            Self::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "manual_create" => Ok(Self::ManualCreate),
            "auto_promoted" => Ok(Self::AutoPromoted),
            "confirmed" => Ok(Self::Confirmed),
            "contradicted" => Ok(Self::Contradicted),
            "approved" => Ok(Self::Approved),
            "mutated" => Ok(Self::Mutated),
            "deleted" => Ok(Self::Deleted),
            "auto_activated" => Ok(Self::AutoActivated),
            "imported" => Ok(Self::Imported),
            other => Err(ReflexError::invalid(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// Append-only audit record; one entry per state-changing gene operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneAuditEntry {
    pub id: String,
    pub owner_id: String,
    pub gene_id: String,
    pub action: AuditAction,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl GeneAuditEntry {
    /// Build an entry for the given gene transition.
    pub fn record(
        owner_id: &str,
        gene_id: &str,
        action: AuditAction,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        reason: Option<String>,
        actor: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            gene_id: gene_id.to_string(),
            action,
            before,
            after,
            reason,
            actor: actor.to_string(),
            at: Utc::now(),
        }
    }
}
