use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_CONTRIBUTING_OUTCOMES;
use crate::models::Score;

/// Lifecycle of a mined failure pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    Emerging,
    Promoted,
    Dormant,
}

impl PatternStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emerging => "emerging",
            Self::Promoted => "promoted",
            Self::Dormant => "dormant",
        }
    }

    pub fn parse(s: &str) -> crate::errors::ReflexResult<Self> {
        match s {
            "emerging" => Ok(Self::Emerging),
            "promoted" => Ok(Self::Promoted),
            "dormant" => Ok(Self::Dormant),
            other => Err(crate::errors::ReflexError::invalid(format!(
                "unknown pattern status: {other}"
            ))),
        }
    }
}

/// A recurring cluster of wrong predictions sharing a token signature
/// within a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePattern {
    pub id: String,
    pub owner_id: String,
    pub domain: String,
    pub pattern_type: String,
    /// Top recurring tokens of the contributing wrong predictions,
    /// comma-joined. Unique per (domain, owner).
    pub signature: String,
    pub description: String,
    pub frequency: u32,
    pub confidence: Score,
    /// Bounded to the most recent `MAX_CONTRIBUTING_OUTCOMES` entries.
    pub contributing_outcome_ids: Vec<String>,
    /// Set exactly once, when the pattern is promoted into a gene.
    pub promoted_gene_text: Option<String>,
    pub status: PatternStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FailurePattern {
    /// Record a further contributing outcome, keeping the id list bounded.
    pub fn push_outcome_id(&mut self, outcome_id: String) {
        self.contributing_outcome_ids.push(outcome_id);
        let len = self.contributing_outcome_ids.len();
        if len > MAX_CONTRIBUTING_OUTCOMES {
            self.contributing_outcome_ids
                .drain(..len - MAX_CONTRIBUTING_OUTCOMES);
        }
    }
}
