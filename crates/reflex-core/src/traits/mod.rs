//! Seams between the engine and its collaborators.

mod storage;
mod training;

pub use storage::{GeneFilter, IReflexStorage, PredictionFilter};
pub use training::{ITrainingSink, NoOpTrainingSink, TrainingSample};
