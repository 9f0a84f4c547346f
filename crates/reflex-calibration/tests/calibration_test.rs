//! Snapshot persistence against the real storage engine.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_calibration::CalibrationEngine;
use reflex_core::constants::CALIBRATION_BUCKETS;
use reflex_core::models::{
    ExtractionMethod, Prediction, PredictionStatus, PredictionType, Score,
};
use reflex_core::traits::IReflexStorage;
use reflex_storage::StorageEngine;

const OWNER: &str = "owner-1";

fn storage() -> Arc<dyn IReflexStorage> {
    Arc::new(StorageEngine::open_in_memory().unwrap())
}

fn resolved(domain: &str, confidence: f64, status: PredictionStatus) -> Prediction {
    Prediction {
        id: Uuid::new_v4().to_string(),
        owner_id: OWNER.to_string(),
        conversation_id: None,
        message_id: None,
        text: "resolved prediction for calibration".to_string(),
        prediction_type: PredictionType::OutcomeForecast,
        domain: domain.to_string(),
        confidence: Score::new(confidence),
        context_summary: None,
        source_model: None,
        extraction_method: ExtractionMethod::Explicit,
        status,
        source_hash: Uuid::new_v4().to_string(),
        expires_at: None,
        created_at: Utc::now(),
    }
}

#[test]
fn snapshot_persists_one_row_per_bucket() {
    let storage = storage();
    let engine = CalibrationEngine::new(Arc::clone(&storage));

    storage
        .insert_prediction(&resolved(
            "code_generation",
            0.9,
            PredictionStatus::VerifiedCorrect,
        ))
        .unwrap();
    storage
        .insert_prediction(&resolved(
            "code_generation",
            0.9,
            PredictionStatus::VerifiedWrong,
        ))
        .unwrap();

    let snapshots = engine.snapshot(OWNER, "code_generation").unwrap();
    assert_eq!(snapshots.len(), CALIBRATION_BUCKETS);

    let stored = storage
        .list_calibration(OWNER, Some("code_generation"), 100)
        .unwrap();
    assert_eq!(stored.len(), CALIBRATION_BUCKETS);

    let top = stored.iter().find(|s| s.bucket == 4).unwrap();
    assert_eq!(top.total, 2);
    assert_eq!(top.correct, 1);
    assert!((top.actual_accuracy - 0.5).abs() < 1e-9);
}

#[test]
fn pending_predictions_are_excluded() {
    let storage = storage();
    let engine = CalibrationEngine::new(Arc::clone(&storage));

    storage
        .insert_prediction(&resolved(
            "task_planning",
            0.9,
            PredictionStatus::Pending,
        ))
        .unwrap();
    storage
        .insert_prediction(&resolved(
            "task_planning",
            0.9,
            PredictionStatus::Expired,
        ))
        .unwrap();

    let snapshots = engine.snapshot(OWNER, "task_planning").unwrap();
    assert!(snapshots.iter().all(|s| s.total == 0));
}
