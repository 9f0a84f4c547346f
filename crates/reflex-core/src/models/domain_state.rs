use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Score;

/// Result type of the current streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    Correct,
    Wrong,
    Partial,
}

impl StreakType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Wrong => "wrong",
            Self::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> crate::errors::ReflexResult<Self> {
        match s {
            "correct" => Ok(Self::Correct),
            "wrong" => Ok(Self::Wrong),
            "partial" => Ok(Self::Partial),
            other => Err(crate::errors::ReflexError::invalid(format!(
                "unknown streak type: {other}"
            ))),
        }
    }
}

/// Direction of recent accuracy movement over the history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }

    pub fn parse(s: &str) -> crate::errors::ReflexResult<Self> {
        match s {
            "improving" => Ok(Self::Improving),
            "stable" => Ok(Self::Stable),
            "declining" => Ok(Self::Declining),
            other => Err(crate::errors::ReflexError::invalid(format!(
                "unknown trend: {other}"
            ))),
        }
    }
}

/// Per-(domain, owner) statistical mood state.
///
/// Invariants: all scores in [0, 1]; `total_predictions` equals
/// `correct + wrong + partial` after every resolution. Mutated only by
/// the outcome resolver and the lifecycle decay pass; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainState {
    pub domain: String,
    pub owner_id: String,
    pub pain_score: Score,
    pub satisfaction_score: Score,
    pub accuracy: Score,
    /// EMA of (declared confidence − actual correctness); can be negative.
    pub calibration_offset: f64,
    pub total_predictions: u64,
    pub correct: u64,
    pub wrong: u64,
    pub partial: u64,
    pub streak_type: Option<StreakType>,
    pub streak_count: u32,
    pub best_streak: u32,
    pub worst_streak: u32,
    pub decay_rate: f64,
    pub volatility: Score,
    pub trend: Trend,
    pub last_outcome_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DomainState {
    /// Fresh state for a domain that has never seen an outcome.
    pub fn fresh(domain: &str, owner_id: &str, decay_rate: f64) -> Self {
        Self {
            domain: domain.to_string(),
            owner_id: owner_id.to_string(),
            pain_score: Score::default(),
            satisfaction_score: Score::default(),
            accuracy: Score::default(),
            calibration_offset: 0.0,
            total_predictions: 0,
            correct: 0,
            wrong: 0,
            partial: 0,
            streak_type: None,
            streak_count: 0,
            best_streak: 0,
            worst_streak: 0,
            decay_rate,
            volatility: Score::default(),
            trend: Trend::Stable,
            last_outcome_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// One history snapshot appended after every resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainHistoryPoint {
    pub domain: String,
    pub owner_id: String,
    pub pain_score: Score,
    pub satisfaction_score: Score,
    pub accuracy: Score,
    pub trigger: String,
    /// Truncated excerpt of the prediction that produced this point.
    pub excerpt: String,
    pub at: DateTime<Utc>,
}
