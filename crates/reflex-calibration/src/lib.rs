//! Calibration: bucket resolved predictions by declared confidence and
//! compare each bucket's expectation against observed accuracy.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use reflex_core::constants::CALIBRATION_BUCKETS;
use reflex_core::errors::ReflexResult;
use reflex_core::models::{CalibrationSnapshot, Prediction, PredictionStatus};
use reflex_core::traits::IReflexStorage;

/// Takes and persists calibration snapshots.
pub struct CalibrationEngine {
    storage: Arc<dyn IReflexStorage>,
}

impl CalibrationEngine {
    pub fn new(storage: Arc<dyn IReflexStorage>) -> Self {
        Self { storage }
    }

    /// Snapshot one domain: five equal-width confidence buckets over
    /// its resolved predictions, persisted as an appended series and
    /// returned in bucket order.
    pub fn snapshot(&self, owner: &str, domain: &str) -> ReflexResult<Vec<CalibrationSnapshot>> {
        let resolved = self.storage.resolved_predictions(owner, Some(domain))?;
        let snapshots = bucketize(owner, domain, &resolved);
        for snapshot in &snapshots {
            self.storage.insert_calibration(snapshot)?;
        }
        tracing::debug!(owner = %owner, domain = %domain, resolved = resolved.len(),
            "calibration snapshot taken");
        Ok(snapshots)
    }

    /// Snapshot every domain the owner has state for. Returns the
    /// number of bucket rows written.
    pub fn snapshot_all(&self, owner: &str) -> ReflexResult<usize> {
        let mut written = 0;
        for state in self.storage.list_domain_states(owner)? {
            written += self.snapshot(owner, &state.domain)?.len();
        }
        Ok(written)
    }
}

/// Pure bucketing over a resolved-prediction set.
fn bucketize(owner: &str, domain: &str, resolved: &[Prediction]) -> Vec<CalibrationSnapshot> {
    let now = Utc::now();
    let width = 1.0 / CALIBRATION_BUCKETS as f64;
    (0..CALIBRATION_BUCKETS)
        .map(|bucket| {
            let min = bucket as f64 * width;
            // The last bucket closes at 1.0 inclusive.
            let max = min + width;
            let in_bucket: Vec<&Prediction> = resolved
                .iter()
                .filter(|p| {
                    let c = p.confidence.value();
                    c >= min && (c < max || (bucket == CALIBRATION_BUCKETS - 1 && c <= max))
                })
                .collect();
            let total = in_bucket.len() as u64;
            let correct = in_bucket
                .iter()
                .filter(|p| p.status == PredictionStatus::VerifiedCorrect)
                .count() as u64;
            let actual = if total == 0 {
                0.0
            } else {
                correct as f64 / total as f64
            };
            let midpoint = min + width / 2.0;
            CalibrationSnapshot {
                id: Uuid::new_v4().to_string(),
                owner_id: owner.to_string(),
                domain: domain.to_string(),
                bucket: bucket as u8,
                bucket_min: min,
                bucket_max: max,
                total,
                correct,
                actual_accuracy: actual,
                delta: midpoint - actual,
                at: now,
            }
        })
        .collect()
}
