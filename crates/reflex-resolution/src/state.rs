//! Pure state math: decay, counters, streaks, trend, volatility.

use chrono::{DateTime, Utc};

use reflex_core::models::{DomainState, OutcomeResult, Score, StreakType, Trend};

use crate::deltas::OutcomeDeltas;

fn streak_for(result: OutcomeResult) -> StreakType {
    match result {
        OutcomeResult::Correct => StreakType::Correct,
        OutcomeResult::Wrong => StreakType::Wrong,
        OutcomeResult::Partial => StreakType::Partial,
    }
}

/// Fold one verified outcome into a domain state.
///
/// Pain and satisfaction take a multiplicative decay step before the
/// delta is added; counters keep `total = correct + wrong + partial`;
/// the calibration offset moves by EMA toward (declared confidence −
/// actual correctness).
pub(crate) fn fold_outcome(
    state: &mut DomainState,
    result: OutcomeResult,
    declared_confidence: f64,
    deltas: &OutcomeDeltas,
    calibration_alpha: f64,
    now: DateTime<Utc>,
) {
    state.pain_score = state.pain_score.decayed(state.decay_rate) + deltas.pain;
    state.satisfaction_score =
        state.satisfaction_score.decayed(state.decay_rate) + deltas.satisfaction;

    state.total_predictions += 1;
    match result {
        OutcomeResult::Correct => state.correct += 1,
        OutcomeResult::Wrong => state.wrong += 1,
        OutcomeResult::Partial => state.partial += 1,
    }
    state.accuracy = Score::new(
        (state.correct as f64 + 0.5 * state.partial as f64) / state.total_predictions as f64,
    );

    let sample = declared_confidence - result.correctness();
    state.calibration_offset =
        (1.0 - calibration_alpha) * state.calibration_offset + calibration_alpha * sample;

    let streak = streak_for(result);
    if state.streak_type == Some(streak) {
        state.streak_count += 1;
    } else {
        state.streak_type = Some(streak);
        state.streak_count = 1;
    }
    match streak {
        StreakType::Correct => state.best_streak = state.best_streak.max(state.streak_count),
        StreakType::Wrong => state.worst_streak = state.worst_streak.max(state.streak_count),
        StreakType::Partial => {}
    }

    state.last_outcome_at = Some(now);
    state.updated_at = now;
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trend over an accuracy window, newest value first: mean of the
/// newer half against the mean of the older half, with movement past
/// the threshold breaking a Stable reading.
pub fn accuracy_trend(window_newest_first: &[f64], threshold: f64) -> Trend {
    let mid = window_newest_first.len() / 2;
    if mid == 0 {
        return Trend::Stable;
    }
    let movement = mean(&window_newest_first[..mid]) - mean(&window_newest_first[mid..]);
    if movement > threshold {
        Trend::Improving
    } else if movement < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Population standard deviation of the window, clamped to [0, 1].
pub fn population_volatility(values: &[f64]) -> Score {
    if values.is_empty() {
        return Score::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Score::new(variance.sqrt())
}
