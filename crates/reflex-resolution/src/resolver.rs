//! The resolution pipeline: claim the prediction, record the outcome,
//! fold state, cascade, append history.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::config::ReflexConfig;
use reflex_core::constants::{ACCURACY_WINDOW, HISTORY_EXCERPT_LEN};
use reflex_core::errors::ReflexResult;
use reflex_core::models::{
    CascadeEffect, DomainHistoryPoint, Outcome, OutcomeResult, Prediction, PredictionStatus,
    RecentResolution, ResolutionReport, Severity, TriggerType,
};
use reflex_core::traits::IReflexStorage;

use crate::deltas::OutcomeDeltas;
use crate::state;

/// Caller-provided context for one verification event.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub result: OutcomeResult,
    pub trigger_type: TriggerType,
    pub trigger_source: String,
    pub trigger_data: Option<serde_json::Value>,
    pub lesson_learned: Option<String>,
    pub corrective_action: Option<String>,
    pub severity: Severity,
}

impl ResolveRequest {
    pub fn new(result: OutcomeResult, trigger_type: TriggerType) -> Self {
        Self {
            result,
            trigger_type,
            trigger_source: trigger_type.as_str().to_string(),
            trigger_data: None,
            lesson_learned: None,
            corrective_action: None,
            severity: Severity::default(),
        }
    }
}

fn terminal_status(result: OutcomeResult) -> PredictionStatus {
    match result {
        OutcomeResult::Correct => PredictionStatus::VerifiedCorrect,
        OutcomeResult::Wrong => PredictionStatus::VerifiedWrong,
        OutcomeResult::Partial => PredictionStatus::VerifiedPartial,
    }
}

/// Applies verification verdicts. Stateless apart from its handles;
/// the storage layer provides per-row atomicity.
pub struct OutcomeResolver {
    storage: Arc<dyn IReflexStorage>,
    config: ReflexConfig,
}

impl OutcomeResolver {
    pub fn new(storage: Arc<dyn IReflexStorage>, config: ReflexConfig) -> Self {
        Self { storage, config }
    }

    /// Resolve one prediction by id. Errors with `NotFound` for an
    /// unknown id and `Conflict` when the prediction is already
    /// terminal, leaving all state untouched in both cases.
    pub fn resolve(
        &self,
        owner: &str,
        prediction_id: &str,
        request: &ResolveRequest,
    ) -> ReflexResult<ResolutionReport> {
        let now = Utc::now();

        // Step 1: atomically claim the prediction.
        let prediction =
            self.storage
                .transition_prediction(owner, prediction_id, terminal_status(request.result))?;

        // Step 2: fixed delta table for the verdict.
        let deltas = OutcomeDeltas::for_result(request.result);

        // Step 3: history window read before this resolution is appended.
        let prior_accuracy: Vec<f64> = self
            .storage
            .recent_history(owner, &prediction.domain, ACCURACY_WINDOW - 1)?
            .iter()
            .map(|p| p.accuracy.value())
            .collect();

        // Step 4: fold the outcome into the domain state in one
        // read-modify-write, deriving trend and volatility from the
        // window including the new point.
        let declared = prediction.confidence.value();
        let alpha = self.config.resolution.calibration_alpha;
        let threshold = self.config.resolution.trend_threshold;
        let result = request.result;
        let domain_state = self.storage.modify_domain_state(
            owner,
            &prediction.domain,
            self.config.domains.decay_rate,
            &mut |s| {
                state::fold_outcome(s, result, declared, &deltas, alpha, now);
                let mut window = Vec::with_capacity(prior_accuracy.len() + 1);
                window.push(s.accuracy.value());
                window.extend_from_slice(&prior_accuracy);
                s.trend = state::accuracy_trend(&window, threshold);
                s.volatility = state::population_volatility(&window);
            },
        )?;

        // Step 5: cascade pain into adjacent domains on a wrong verdict.
        let mut cascade_effects = Vec::new();
        if request.result == OutcomeResult::Wrong {
            let cascade_pain = self.config.resolution.cascade_pain;
            for target in self.config.cascade_targets(&prediction.domain) {
                let applied = self.storage.modify_domain_state(
                    owner,
                    &target,
                    self.config.domains.decay_rate,
                    &mut |s| {
                        s.pain_score = s.pain_score + cascade_pain;
                        s.updated_at = now;
                    },
                );
                match applied {
                    Ok(_) => cascade_effects.push(CascadeEffect {
                        domain: target,
                        pain_delta: cascade_pain,
                    }),
                    Err(e) => {
                        tracing::warn!(domain = %target, error = %e, "cascade step failed");
                    }
                }
            }
        }

        // Step 6: the immutable outcome record.
        let outcome = Outcome {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            prediction_id: Some(prediction.id.clone()),
            trigger_type: request.trigger_type,
            trigger_source: request.trigger_source.clone(),
            trigger_data: request.trigger_data.clone(),
            result: request.result,
            conf_delta: deltas.confidence,
            pain_delta: deltas.pain,
            sat_delta: deltas.satisfaction,
            lesson_learned: request.lesson_learned.clone(),
            corrective_action: request.corrective_action.clone(),
            domain: prediction.domain.clone(),
            severity: request.severity,
            cascade_effects,
            created_at: now,
        };
        self.storage.insert_outcome(&outcome)?;

        // Step 7: append the history point for this resolution.
        self.storage.append_history(&DomainHistoryPoint {
            domain: prediction.domain.clone(),
            owner_id: owner.to_string(),
            pain_score: domain_state.pain_score,
            satisfaction_score: domain_state.satisfaction_score,
            accuracy: domain_state.accuracy,
            trigger: request.trigger_type.as_str().to_string(),
            excerpt: excerpt_of(&prediction),
            at: now,
        })?;

        tracing::info!(
            owner = %owner,
            prediction = %prediction.id,
            domain = %prediction.domain,
            result = %request.result.as_str(),
            accuracy = %domain_state.accuracy,
            "prediction resolved"
        );

        Ok(ResolutionReport {
            outcome,
            domain_state,
            pattern_detected: None,
            gene_created: None,
        })
    }

    /// Resolve the newest pending prediction in a conversation. A
    /// conversation with nothing pending is a no-op, not an error.
    pub fn resolve_most_recent_pending(
        &self,
        owner: &str,
        conversation_id: &str,
        request: &ResolveRequest,
    ) -> ReflexResult<RecentResolution> {
        let Some(pending) = self.storage.most_recent_pending(owner, conversation_id)? else {
            tracing::debug!(owner = %owner, conversation = %conversation_id, "nothing pending");
            return Ok(RecentResolution::skipped());
        };
        let report = self.resolve(owner, &pending.id, request)?;
        Ok(RecentResolution {
            resolved: true,
            prediction_id: Some(pending.id),
            report: Some(report),
        })
    }
}

fn excerpt_of(prediction: &Prediction) -> String {
    Prediction::cap_text(&prediction.text, HISTORY_EXCERPT_LEN)
}
