//! Typed entities for the consequence engine. Internal logic operates on
//! these; serialization happens only at the persistence and API edges.

mod calibration;
mod domain_state;
mod gene;
mod outcome;
mod pattern;
mod prediction;
mod reports;
mod score;

pub use calibration::CalibrationSnapshot;
pub use domain_state::{DomainHistoryPoint, DomainState, StreakType, Trend};
pub use gene::{AuditAction, Gene, GeneAuditEntry, GeneMutation, GeneStatus, RegressionRisk};
pub use outcome::{CascadeEffect, Outcome, OutcomeResult, Severity, TriggerType};
pub use pattern::{FailurePattern, PatternStatus};
pub use prediction::{ExtractionMethod, Prediction, PredictionStatus, PredictionType};
pub use reports::{
    AddendumData, DashboardSummary, ExportBundle, ImportSummary, RecentResolution,
    ResolutionReport, SweepReport,
};
pub use score::Score;
