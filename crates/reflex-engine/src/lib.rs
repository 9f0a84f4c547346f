//! # reflex-engine
//!
//! Facade over the whole workspace: behavioral feedback tracking for
//! assistant deployments. Predictions are extracted from assistant
//! output, verified against reality, folded into per-domain mood
//! state, mined for recurring failure patterns, and distilled into
//! governed behavioral genes surfaced back into the prompt.

mod dispatch;
mod engine;
pub mod telemetry;

pub use dispatch::Dispatcher;
pub use engine::{RecordOutcome, ReflexEngine, SubmitPrediction};

// The types callers need to drive the engine.
pub use reflex_core::config::ReflexConfig;
pub use reflex_core::errors::{ReflexError, ReflexResult};
pub use reflex_core::models::{
    AddendumData, DashboardSummary, ExportBundle, ImportSummary, OutcomeResult, RecentResolution,
    ResolutionReport, Severity, SweepReport, TriggerType,
};
pub use reflex_core::traits::{
    GeneFilter, ITrainingSink, NoOpTrainingSink, PredictionFilter, TrainingSample,
};
pub use reflex_extraction::ExtractedPrediction;
pub use reflex_genome::CreateGeneRequest;
pub use reflex_resolution::ResolveRequest;
