use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-bucket comparison of declared confidence against observed
/// accuracy; appended as a time series, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    pub id: String,
    pub owner_id: String,
    pub domain: String,
    /// Bucket index in [0, 4].
    pub bucket: u8,
    pub bucket_min: f64,
    pub bucket_max: f64,
    pub total: u64,
    pub correct: u64,
    /// correct / total, 0 when the bucket is empty.
    pub actual_accuracy: f64,
    /// Bucket midpoint minus actual accuracy; positive = overconfident.
    pub delta: f64,
    pub at: DateTime<Utc>,
}

impl CalibrationSnapshot {
    /// A bucket is flagged overconfident with enough samples and a
    /// positive expected-minus-actual gap above 0.15.
    pub fn is_overconfident(&self) -> bool {
        self.total >= 5 && self.delta > 0.15
    }
}
