use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ReflexError, ReflexResult};

/// Verification verdict for a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResult {
    Correct,
    Wrong,
    Partial,
}

impl OutcomeResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Wrong => "wrong",
            Self::Partial => "partial",
        }
    }

    /// Parse edge for the administrative surface; a bad result string
    /// surfaces as `InvalidArgument`.
    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "correct" => Ok(Self::Correct),
            "wrong" => Ok(Self::Wrong),
            "partial" => Ok(Self::Partial),
            other => Err(ReflexError::invalid(format!(
                "result must be correct, wrong or partial, got: {other}"
            ))),
        }
    }

    /// Actual correctness used in calibration-offset EMA (1 / 0.5 / 0).
    pub fn correctness(self) -> f64 {
        match self {
            Self::Correct => 1.0,
            Self::Partial => 0.5,
            Self::Wrong => 0.0,
        }
    }
}

/// What caused a verification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Explicit API call naming the prediction.
    Explicit,
    /// Automatic resolver keyed to the most recent pending prediction.
    Conversation,
    /// Reported via user feedback.
    Feedback,
    /// Produced by the lifecycle sweeper.
    Sweep,
}

impl TriggerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Conversation => "conversation",
            Self::Feedback => "feedback",
            Self::Sweep => "sweep",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "explicit" => Ok(Self::Explicit),
            "conversation" => Ok(Self::Conversation),
            "feedback" => Ok(Self::Feedback),
            "sweep" => Ok(Self::Sweep),
            other => Err(ReflexError::invalid(format!(
                "unknown trigger type: {other}"
            ))),
        }
    }
}

/// Severity attached to an outcome by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ReflexError::invalid(format!("unknown severity: {other}"))),
        }
    }
}

/// Secondary pain adjustment applied to an adjacent domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeEffect {
    pub domain: String,
    pub pain_delta: f64,
}

/// Immutable record of a verification event and its statistical deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub owner_id: String,
    /// Set when this outcome resolves a tracked prediction.
    pub prediction_id: Option<String>,
    pub trigger_type: TriggerType,
    pub trigger_source: String,
    pub trigger_data: Option<serde_json::Value>,
    pub result: OutcomeResult,
    pub conf_delta: f64,
    pub pain_delta: f64,
    pub sat_delta: f64,
    pub lesson_learned: Option<String>,
    pub corrective_action: Option<String>,
    pub domain: String,
    pub severity: Severity,
    pub cascade_effects: Vec<CascadeEffect>,
    pub created_at: DateTime<Utc>,
}
