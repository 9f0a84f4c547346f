//! Linguistic templates for surfacing forward-looking statements.
//!
//! Each template is a compiled matcher with a semantic type tag and a
//! base confidence, evaluated in fixed priority order. Extending the
//! table means adding a row, not touching control flow.

use regex::Regex;
use std::sync::LazyLock;

use reflex_core::models::PredictionType;

/// A compiled prediction-extraction template.
pub struct PredictionTemplate {
    pub name: &'static str,
    pub regex: &'static LazyLock<Option<Regex>>,
    pub prediction_type: PredictionType,
    pub base_confidence: f64,
}

macro_rules! prediction_template {
    ($name:ident, $regex_str:expr) => {
        pub static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Explicit forecasts ─────────────────────────────────────────────────────
prediction_template!(
    RE_EXPLICIT_FORECAST,
    r"(?i)\bI (?:expect|predict|anticipate)\b[^.!?\n]{5,240}"
);

// ── Plain future claims ────────────────────────────────────────────────────
prediction_template!(
    RE_THIS_WILL,
    r"(?i)\b(?:this|that|it) (?:will|won't|will not)\b[^.!?\n]{5,240}"
);
prediction_template!(
    RE_GOING_TO,
    r"(?i)\b(?:is|are) going to\b[^.!?\n]{5,240}"
);

// ── Capability claims ──────────────────────────────────────────────────────
prediction_template!(
    RE_CAN_HANDLE,
    r"(?i)\b(?:can|is able to) (?:handle|process|manage|support|cope with)\b[^.!?\n]{3,240}"
);
prediction_template!(
    RE_SHOULD_BE_ABLE,
    r"(?i)\bshould be able to\b[^.!?\n]{5,240}"
);

// ── Quality claims ─────────────────────────────────────────────────────────
prediction_template!(
    RE_SHOULD_WORK,
    r"(?i)\b(?:this|that|it|everything) should (?:now )?(?:work|pass|compile|build|deploy|succeed|resolve)\b[^.!?\n]{0,240}"
);

// ── Time estimates ─────────────────────────────────────────────────────────
prediction_template!(
    RE_TIME_ESTIMATE,
    r"(?i)\b(?:within|in (?:about|roughly|under)?\s?|by) (?:\d+|a few|a couple of|an?) (?:seconds?|minutes?|hours?|days?|weeks?)\b[^.!?\n]{0,200}"
);

// ── Risk warnings ──────────────────────────────────────────────────────────
prediction_template!(
    RE_RISK_WARNING,
    r"(?i)\b(?:might|may|could) (?:fail|break|time out|error|not work|be flaky|struggle)\b[^.!?\n]{0,240}"
);

/// All templates in priority order. Explicit forecasts first so they
/// claim the dedup slot before broader future-tense matches.
pub fn all_templates() -> Vec<PredictionTemplate> {
    vec![
        PredictionTemplate {
            name: "explicit_forecast",
            regex: &RE_EXPLICIT_FORECAST,
            prediction_type: PredictionType::ExplicitForecast,
            base_confidence: 0.7,
        },
        PredictionTemplate {
            name: "this_will",
            regex: &RE_THIS_WILL,
            prediction_type: PredictionType::OutcomeForecast,
            base_confidence: 0.6,
        },
        PredictionTemplate {
            name: "going_to",
            regex: &RE_GOING_TO,
            prediction_type: PredictionType::OutcomeForecast,
            base_confidence: 0.55,
        },
        PredictionTemplate {
            name: "can_handle",
            regex: &RE_CAN_HANDLE,
            prediction_type: PredictionType::CapabilityClaim,
            base_confidence: 0.5,
        },
        PredictionTemplate {
            name: "should_be_able",
            regex: &RE_SHOULD_BE_ABLE,
            prediction_type: PredictionType::CapabilityClaim,
            base_confidence: 0.5,
        },
        PredictionTemplate {
            name: "should_work",
            regex: &RE_SHOULD_WORK,
            prediction_type: PredictionType::QualityClaim,
            base_confidence: 0.55,
        },
        PredictionTemplate {
            name: "time_estimate",
            regex: &RE_TIME_ESTIMATE,
            prediction_type: PredictionType::TimeEstimate,
            base_confidence: 0.45,
        },
        PredictionTemplate {
            name: "risk_warning",
            regex: &RE_RISK_WARNING,
            prediction_type: PredictionType::RiskWarning,
            base_confidence: 0.4,
        },
    ]
}
