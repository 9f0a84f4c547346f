use serde::{Deserialize, Serialize};

use crate::errors::ReflexResult;
use crate::models::{OutcomeResult, Score};

/// Sample handed to the training-data collector after a correct or
/// partial resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub owner_id: String,
    pub prediction_id: String,
    pub text: String,
    pub result: OutcomeResult,
    pub domain: String,
    pub confidence: Score,
    pub source_model: Option<String>,
}

/// Optional sink for verified predictions. Calls are best-effort:
/// failures are logged by the dispatcher and never reach the resolver.
pub trait ITrainingSink: Send + Sync {
    fn record(&self, sample: &TrainingSample) -> ReflexResult<()>;
}

/// Default sink that drops every sample.
pub struct NoOpTrainingSink;

impl ITrainingSink for NoOpTrainingSink {
    fn record(&self, _sample: &TrainingSample) -> ReflexResult<()> {
        Ok(())
    }
}
