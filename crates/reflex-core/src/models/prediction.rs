use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ReflexError, ReflexResult};
use crate::models::Score;

/// Lifecycle status of a prediction. Transitions exactly once,
/// from `Pending` to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Pending,
    VerifiedCorrect,
    VerifiedWrong,
    VerifiedPartial,
    Expired,
}

impl PredictionStatus {
    /// True for any state other than `Pending`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// True for the three verified_* states.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            Self::VerifiedCorrect | Self::VerifiedWrong | Self::VerifiedPartial
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::VerifiedCorrect => "verified_correct",
            Self::VerifiedWrong => "verified_wrong",
            Self::VerifiedPartial => "verified_partial",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified_correct" => Ok(Self::VerifiedCorrect),
            "verified_wrong" => Ok(Self::VerifiedWrong),
            "verified_partial" => Ok(Self::VerifiedPartial),
            "expired" => Ok(Self::Expired),
            other => Err(ReflexError::invalid(format!(
                "unknown prediction status: {other}"
            ))),
        }
    }
}

/// Semantic category of a forward-looking statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    OutcomeForecast,
    CapabilityClaim,
    TimeEstimate,
    RiskWarning,
    QualityClaim,
    ExplicitForecast,
}

impl PredictionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OutcomeForecast => "outcome_forecast",
            Self::CapabilityClaim => "capability_claim",
            Self::TimeEstimate => "time_estimate",
            Self::RiskWarning => "risk_warning",
            Self::QualityClaim => "quality_claim",
            Self::ExplicitForecast => "explicit_forecast",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "outcome_forecast" => Ok(Self::OutcomeForecast),
            "capability_claim" => Ok(Self::CapabilityClaim),
            "time_estimate" => Ok(Self::TimeEstimate),
            "risk_warning" => Ok(Self::RiskWarning),
            "quality_claim" => Ok(Self::QualityClaim),
            "explicit_forecast" => Ok(Self::ExplicitForecast),
            other => Err(ReflexError::invalid(format!(
                "unknown prediction type: {other}"
            ))),
        }
    }
}

/// How a prediction entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Surfaced by the template scan over assistant output.
    Pattern,
    /// Submitted explicitly through the administrative surface.
    Explicit,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Explicit => "explicit",
        }
    }

    pub fn parse(s: &str) -> ReflexResult<Self> {
        match s {
            "pattern" => Ok(Self::Pattern),
            "explicit" => Ok(Self::Explicit),
            other => Err(ReflexError::invalid(format!(
                "unknown extraction method: {other}"
            ))),
        }
    }
}

/// A tracked forward-looking statement awaiting verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub owner_id: String,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    /// Statement text, capped at 500 chars at construction.
    pub text: String,
    pub prediction_type: PredictionType,
    pub domain: String,
    pub confidence: Score,
    pub context_summary: Option<String>,
    pub source_model: Option<String>,
    pub extraction_method: ExtractionMethod,
    pub status: PredictionStatus,
    /// blake3 of (message id, normalized text); enforces dedup by source.
    pub source_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    /// Truncate text to the storage cap, respecting char boundaries.
    pub fn cap_text(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            text.to_string()
        } else {
            text.chars().take(max).collect()
        }
    }
}
