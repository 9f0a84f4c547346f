//! The engine facade: one object owning storage, governance, and the
//! background dispatcher, exposing the full administrative surface.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use reflex_calibration::CalibrationEngine;
use reflex_core::config::ReflexConfig;
use reflex_core::constants::{MAX_PREDICTION_TEXT_LEN, VERSION};
use reflex_core::errors::{ReflexError, ReflexResult};
use reflex_core::models::{
    AddendumData, AuditAction, CalibrationSnapshot, DashboardSummary, DomainHistoryPoint,
    DomainState, ExportBundle, ExtractionMethod, FailurePattern, Gene, GeneAuditEntry, GeneStatus,
    ImportSummary, Outcome, OutcomeResult, PatternStatus, Prediction, PredictionStatus,
    PredictionType, RecentResolution, ResolutionReport, Score, Severity, SweepReport, TriggerType,
};
use reflex_core::traits::{
    GeneFilter, IReflexStorage, ITrainingSink, NoOpTrainingSink, PredictionFilter, TrainingSample,
};
use reflex_extraction::{extract, ExtractedPrediction};
use reflex_genome::{CreateGeneRequest, Genome, PatternMiner};
use reflex_governance::{AddendumAssembler, GovernanceGate};
use reflex_lifecycle::LifecycleSweeper;
use reflex_resolution::{OutcomeDeltas, OutcomeResolver, ResolveRequest};
use reflex_storage::StorageEngine;

use crate::dispatch::Dispatcher;

/// Row cap applied when exporting unbounded tables.
const EXPORT_ROW_LIMIT: usize = 100_000;

/// Parameters for explicit prediction submission.
#[derive(Debug, Clone)]
pub struct SubmitPrediction {
    pub text: String,
    /// Classified from the text when absent.
    pub domain: Option<String>,
    pub prediction_type: PredictionType,
    pub confidence: f64,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub context_summary: Option<String>,
    pub source_model: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A verification event reported without a tracked prediction behind
/// it (external monitoring, manual review). Deltas still come from the
/// fixed per-verdict table.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub result: OutcomeResult,
    pub domain: String,
    pub trigger_type: TriggerType,
    pub trigger_source: String,
    pub trigger_data: Option<serde_json::Value>,
    pub lesson_learned: Option<String>,
    pub corrective_action: Option<String>,
    pub severity: Severity,
}

impl RecordOutcome {
    pub fn new(result: OutcomeResult, domain: &str, trigger_type: TriggerType) -> Self {
        Self {
            result,
            domain: domain.to_string(),
            trigger_type,
            trigger_source: trigger_type.as_str().to_string(),
            trigger_data: None,
            lesson_learned: None,
            corrective_action: None,
            severity: Severity::default(),
        }
    }
}

/// One engine instance per deployment. All administrative operations
/// are synchronous request/response; derived work (stream ingestion,
/// training callbacks) runs on the background dispatcher and never
/// surfaces failures to callers.
pub struct ReflexEngine {
    storage: Arc<dyn IReflexStorage>,
    config: ReflexConfig,
    gate: Arc<GovernanceGate>,
    training: Arc<dyn ITrainingSink>,
    dispatcher: Dispatcher,
    resolver: OutcomeResolver,
    miner: PatternMiner,
    genome: Genome,
    calibration: CalibrationEngine,
    sweeper: LifecycleSweeper,
    assembler: AddendumAssembler,
}

impl ReflexEngine {
    pub fn new(storage: Arc<dyn IReflexStorage>, config: ReflexConfig) -> Self {
        Self::with_training_sink(storage, config, Arc::new(NoOpTrainingSink))
    }

    pub fn with_training_sink(
        storage: Arc<dyn IReflexStorage>,
        config: ReflexConfig,
        training: Arc<dyn ITrainingSink>,
    ) -> Self {
        let gate = Arc::new(GovernanceGate::new(config.deployment.clone()));
        let resolver = OutcomeResolver::new(Arc::clone(&storage), config.clone());
        let miner = PatternMiner::new(Arc::clone(&storage), config.clone());
        let genome = Genome::new(Arc::clone(&storage), config.clone());
        let calibration = CalibrationEngine::new(Arc::clone(&storage));
        let sweeper = LifecycleSweeper::new(Arc::clone(&storage), config.clone());
        let assembler = AddendumAssembler::new(Arc::clone(&storage));
        Self {
            storage,
            config,
            gate,
            training,
            dispatcher: Dispatcher::new(),
            resolver,
            miner,
            genome,
            calibration,
            sweeper,
            assembler,
        }
    }

    /// Open a file-backed engine.
    pub fn open(path: &Path, config: ReflexConfig) -> ReflexResult<Self> {
        let storage: Arc<dyn IReflexStorage> = Arc::new(StorageEngine::open(path)?);
        Ok(Self::new(storage, config))
    }

    /// In-memory engine, mainly for tests.
    pub fn open_in_memory(config: ReflexConfig) -> ReflexResult<Self> {
        let storage: Arc<dyn IReflexStorage> = Arc::new(StorageEngine::open_in_memory()?);
        Ok(Self::new(storage, config))
    }

    pub fn config(&self) -> &ReflexConfig {
        &self.config
    }

    // --- Ingestion ---

    /// Fire-and-forget ingestion of one completed assistant message.
    /// Extraction and persistence run on the dispatcher; failures are
    /// logged, never surfaced.
    pub fn record_predictions_from_stream(
        &self,
        owner: &str,
        conversation_id: &str,
        message_id: &str,
        text: &str,
        source_model: Option<&str>,
    ) {
        let storage = Arc::clone(&self.storage);
        let config = self.config.clone();
        let owner = owner.to_string();
        let conversation_id = conversation_id.to_string();
        let message_id = message_id.to_string();
        let text = text.to_string();
        let source_model = source_model.map(str::to_string);
        self.dispatcher.dispatch(move || {
            if let Err(e) = ingest_stream(
                storage.as_ref(),
                &config,
                &owner,
                &conversation_id,
                &message_id,
                &text,
                source_model.as_deref(),
            ) {
                tracing::warn!(owner = %owner, message = %message_id, error = %e,
                    "stream ingestion failed");
            }
        });
    }

    /// Synchronous variant of stream ingestion; returns how many
    /// predictions were recorded after dedup.
    pub fn ingest_stream(
        &self,
        owner: &str,
        conversation_id: &str,
        message_id: &str,
        text: &str,
        source_model: Option<&str>,
    ) -> ReflexResult<usize> {
        ingest_stream(
            self.storage.as_ref(),
            &self.config,
            owner,
            conversation_id,
            message_id,
            text,
            source_model,
        )
    }

    /// Explicit submission through the administrative surface.
    pub fn submit_prediction(
        &self,
        owner: &str,
        request: &SubmitPrediction,
    ) -> ReflexResult<Prediction> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(ReflexError::invalid("prediction text must not be empty"));
        }
        let text = Prediction::cap_text(text, MAX_PREDICTION_TEXT_LEN);
        let domain = match &request.domain {
            Some(domain) => domain.clone(),
            None => reflex_extraction::classify(&text, &self.config),
        };
        let prediction = Prediction {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            conversation_id: request.conversation_id.clone(),
            message_id: request.message_id.clone(),
            source_hash: source_hash(request.message_id.as_deref(), &text),
            text,
            prediction_type: request.prediction_type,
            domain,
            confidence: Score::new(request.confidence),
            context_summary: request.context_summary.clone(),
            source_model: request.source_model.clone(),
            extraction_method: ExtractionMethod::Explicit,
            status: PredictionStatus::Pending,
            expires_at: request.expires_at,
            created_at: Utc::now(),
        };
        self.storage.insert_prediction(&prediction)?;
        Ok(prediction)
    }

    /// Dry-run extraction: what the ingestion path would pull out of
    /// `text`, without persisting anything.
    pub fn extract_predictions(&self, text: &str) -> Vec<ExtractedPrediction> {
        extract(text, &self.config)
    }

    pub fn get_prediction(&self, owner: &str, id: &str) -> ReflexResult<Option<Prediction>> {
        self.storage.get_prediction(owner, id)
    }

    pub fn list_predictions(
        &self,
        owner: &str,
        filter: &PredictionFilter,
    ) -> ReflexResult<Vec<Prediction>> {
        self.storage.list_predictions(owner, filter)
    }

    // --- Resolution ---

    /// Resolve one prediction. Mining runs isolated after the
    /// resolution commits; a mining failure leaves the report's
    /// pattern/gene fields empty but never fails the call.
    pub fn resolve(
        &self,
        owner: &str,
        prediction_id: &str,
        request: &ResolveRequest,
    ) -> ReflexResult<ResolutionReport> {
        let mut report = self.resolver.resolve(owner, prediction_id, request)?;
        self.after_resolution(owner, &mut report);
        Ok(report)
    }

    /// Resolve the newest pending prediction in a conversation.
    pub fn resolve_most_recent_pending(
        &self,
        owner: &str,
        conversation_id: &str,
        request: &ResolveRequest,
    ) -> ReflexResult<RecentResolution> {
        let mut resolution =
            self.resolver
                .resolve_most_recent_pending(owner, conversation_id, request)?;
        if let Some(report) = resolution.report.as_mut() {
            self.after_resolution(owner, report);
        }
        Ok(resolution)
    }

    /// Derived work after a committed resolution: pattern mining on
    /// wrong verdicts (bootstrap permitting) and the training callback
    /// on correct/partial ones.
    fn after_resolution(&self, owner: &str, report: &mut ResolutionReport) {
        match report.outcome.result {
            OutcomeResult::Wrong => {
                if self.gate.bootstrap_active() {
                    tracing::debug!(owner = %owner, domain = %report.outcome.domain,
                        "bootstrap active, mining skipped");
                    return;
                }
                match self
                    .miner
                    .mine(owner, &report.outcome.domain, &report.outcome.id)
                {
                    Ok(mined) => {
                        report.pattern_detected = mined.pattern_detected;
                        report.gene_created = mined.gene_created;
                    }
                    Err(e) => {
                        tracing::warn!(owner = %owner, domain = %report.outcome.domain,
                            error = %e, "pattern mining failed");
                    }
                }
            }
            OutcomeResult::Correct | OutcomeResult::Partial => {
                let Some(prediction_id) = report.outcome.prediction_id.clone() else {
                    return;
                };
                let storage = Arc::clone(&self.storage);
                let training = Arc::clone(&self.training);
                let owner = owner.to_string();
                let result = report.outcome.result;
                self.dispatcher.dispatch(move || {
                    let outcome = storage.get_prediction(&owner, &prediction_id).and_then(
                        |prediction| {
                            let Some(p) = prediction else { return Ok(()) };
                            training.record(&TrainingSample {
                                owner_id: owner.clone(),
                                prediction_id,
                                text: p.text,
                                result,
                                domain: p.domain,
                                confidence: p.confidence,
                                source_model: p.source_model,
                            })
                        },
                    );
                    if let Err(e) = outcome {
                        tracing::warn!(owner = %owner, error = %e, "training callback failed");
                    }
                });
            }
        }
    }

    // --- Outcomes ---

    /// Record a standalone outcome, one with no prediction behind it.
    /// Immutable once written; domain state is untouched since there is
    /// no declared confidence to verify against.
    pub fn record_outcome(&self, owner: &str, request: &RecordOutcome) -> ReflexResult<Outcome> {
        if request.domain.trim().is_empty() {
            return Err(ReflexError::invalid("outcome domain must not be empty"));
        }
        let deltas = OutcomeDeltas::for_result(request.result);
        let outcome = Outcome {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            prediction_id: None,
            trigger_type: request.trigger_type,
            trigger_source: request.trigger_source.clone(),
            trigger_data: request.trigger_data.clone(),
            result: request.result,
            conf_delta: deltas.confidence,
            pain_delta: deltas.pain,
            sat_delta: deltas.satisfaction,
            lesson_learned: request.lesson_learned.clone(),
            corrective_action: request.corrective_action.clone(),
            domain: request.domain.clone(),
            severity: request.severity,
            cascade_effects: Vec::new(),
            created_at: Utc::now(),
        };
        self.storage.insert_outcome(&outcome)?;
        Ok(outcome)
    }

    pub fn get_outcome(&self, owner: &str, id: &str) -> ReflexResult<Option<Outcome>> {
        self.storage.get_outcome(owner, id)
    }

    pub fn list_outcomes(&self, owner: &str, limit: usize) -> ReflexResult<Vec<Outcome>> {
        self.storage.list_outcomes(owner, limit)
    }

    // --- Domain state ---

    pub fn get_domain_state(&self, owner: &str, domain: &str) -> ReflexResult<Option<DomainState>> {
        self.storage.get_domain_state(owner, domain)
    }

    pub fn list_domain_states(&self, owner: &str) -> ReflexResult<Vec<DomainState>> {
        self.storage.list_domain_states(owner)
    }

    pub fn domain_history(
        &self,
        owner: &str,
        domain: &str,
        limit: usize,
    ) -> ReflexResult<Vec<DomainHistoryPoint>> {
        self.storage.recent_history(owner, domain, limit)
    }

    // --- Patterns ---

    pub fn list_patterns(
        &self,
        owner: &str,
        domain: Option<&str>,
    ) -> ReflexResult<Vec<FailurePattern>> {
        self.storage.list_patterns(owner, domain)
    }

    // --- Genes ---

    pub fn create_gene(
        &self,
        owner: &str,
        request: &CreateGeneRequest,
        actor: &str,
    ) -> ReflexResult<Gene> {
        self.genome.create(owner, request, actor)
    }

    pub fn get_gene(&self, owner: &str, id: &str) -> ReflexResult<Option<Gene>> {
        self.storage.get_gene(owner, id)
    }

    pub fn list_genes(&self, owner: &str, filter: &GeneFilter) -> ReflexResult<Vec<Gene>> {
        self.storage.list_genes(owner, filter)
    }

    pub fn confirm_gene(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        self.genome.confirm(owner, id, actor)
    }

    pub fn contradict_gene(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        self.genome.contradict(owner, id, actor)
    }

    pub fn approve_gene(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        self.genome.approve(owner, id, actor)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn mutate_gene(
        &self,
        owner: &str,
        id: &str,
        new_text: &str,
        new_trigger: Option<&str>,
        new_action: Option<&str>,
        reason: Option<String>,
        actor: &str,
    ) -> ReflexResult<Gene> {
        self.genome
            .mutate(owner, id, new_text, new_trigger, new_action, reason, actor)
    }

    pub fn delete_gene(&self, owner: &str, id: &str, actor: &str) -> ReflexResult<Gene> {
        self.genome.delete(owner, id, actor)
    }

    pub fn gene_audit_trail(&self, owner: &str, id: &str) -> ReflexResult<Vec<GeneAuditEntry>> {
        self.storage.audit_trail(owner, id)
    }

    // --- Governance ---

    /// The sole contract consumed by the external prompt assembler.
    pub fn addendum_data(&self, owner: &str) -> ReflexResult<AddendumData> {
        self.assembler.assemble(
            owner,
            self.gate.bootstrap_active(),
            self.gate.kill_switch_active(),
        )
    }

    pub fn kill_switch_active(&self) -> bool {
        self.gate.kill_switch_active()
    }

    pub fn set_kill_switch(&self, active: bool) {
        self.gate.set_kill_switch(active);
    }

    pub fn bootstrap_active(&self) -> bool {
        self.gate.bootstrap_active()
    }

    // --- Calibration ---

    pub fn calibration_snapshot(
        &self,
        owner: &str,
        domain: &str,
    ) -> ReflexResult<Vec<CalibrationSnapshot>> {
        self.calibration.snapshot(owner, domain)
    }

    pub fn list_calibration(
        &self,
        owner: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> ReflexResult<Vec<CalibrationSnapshot>> {
        self.storage.list_calibration(owner, domain, limit)
    }

    // --- Lifecycle ---

    pub fn run_lifecycle(&self, owner: &str) -> SweepReport {
        self.sweeper.sweep_owner(owner)
    }

    pub fn run_lifecycle_all(&self) -> ReflexResult<Vec<(String, SweepReport)>> {
        self.sweeper.sweep_all()
    }

    // --- Dashboard ---

    pub fn dashboard(&self, owner: &str) -> ReflexResult<DashboardSummary> {
        let predictions = self
            .storage
            .list_predictions(owner, &PredictionFilter::default())?;
        let count =
            |status: PredictionStatus| predictions.iter().filter(|p| p.status == status).count() as u64;
        let pending = count(PredictionStatus::Pending);
        let correct = count(PredictionStatus::VerifiedCorrect);
        let wrong = count(PredictionStatus::VerifiedWrong);
        let partial = count(PredictionStatus::VerifiedPartial);
        let expired = count(PredictionStatus::Expired);
        let resolved = correct + wrong + partial;
        let overall_accuracy = if resolved == 0 {
            0.0
        } else {
            (correct as f64 + 0.5 * partial as f64) / resolved as f64
        };

        let active_gene_count = self
            .storage
            .list_genes(
                owner,
                &GeneFilter {
                    status: Some(GeneStatus::Active),
                    domain: None,
                    limit: None,
                },
            )?
            .len() as u64;
        let emerging_pattern_count = self
            .storage
            .list_patterns(owner, None)?
            .iter()
            .filter(|p| p.status == PatternStatus::Emerging)
            .count() as u64;

        Ok(DashboardSummary {
            total_predictions: predictions.len() as u64,
            pending,
            correct,
            wrong,
            partial,
            expired,
            overall_accuracy,
            domain_states: self.storage.list_domain_states(owner)?,
            active_gene_count,
            pending_review_count: self.storage.pending_review_count(owner)?,
            emerging_pattern_count,
            recent_outcomes: self.storage.list_outcomes(owner, 10)?,
        })
    }

    // --- Export / import ---

    pub fn export(&self, owner: &str) -> ReflexResult<ExportBundle> {
        Ok(ExportBundle {
            owner_id: owner.to_string(),
            exported_at: Utc::now(),
            engine_version: VERSION.to_string(),
            predictions: self
                .storage
                .list_predictions(owner, &PredictionFilter::default())?,
            outcomes: self.storage.list_outcomes(owner, EXPORT_ROW_LIMIT)?,
            domain_states: self.storage.list_domain_states(owner)?,
            patterns: self.storage.list_patterns(owner, None)?,
            genes: self.storage.list_genes(owner, &GeneFilter::default())?,
            calibration: self.storage.list_calibration(owner, None, EXPORT_ROW_LIMIT)?,
        })
    }

    /// Import a bundle. Every imported gene lands as `pending_review`
    /// regardless of its exported status; domain states are upserted
    /// directly. With `clear_existing` the owner's rows are wiped
    /// first; otherwise colliding rows are skipped, never overwritten.
    pub fn import(
        &self,
        owner: &str,
        bundle: &ExportBundle,
        clear_existing: bool,
    ) -> ReflexResult<ImportSummary> {
        if clear_existing {
            self.storage.clear_owner(owner)?;
        }
        let mut summary = ImportSummary::default();

        for prediction in &bundle.predictions {
            let mut row = prediction.clone();
            row.owner_id = owner.to_string();
            match self.storage.insert_prediction(&row) {
                Ok(()) => summary.predictions += 1,
                Err(e) => tracing::warn!(id = %row.id, error = %e, "prediction import skipped"),
            }
        }
        for outcome in &bundle.outcomes {
            let mut row = outcome.clone();
            row.owner_id = owner.to_string();
            match self.storage.insert_outcome(&row) {
                Ok(()) => summary.outcomes += 1,
                Err(e) => tracing::warn!(id = %row.id, error = %e, "outcome import skipped"),
            }
        }
        for state in &bundle.domain_states {
            let mut row = state.clone();
            row.owner_id = owner.to_string();
            self.storage.upsert_domain_state(&row)?;
            summary.domain_states += 1;
        }
        for pattern in &bundle.patterns {
            let mut row = pattern.clone();
            row.owner_id = owner.to_string();
            match self.storage.insert_pattern(&row) {
                Ok(()) => summary.patterns += 1,
                Err(e) => tracing::warn!(id = %row.id, error = %e, "pattern import skipped"),
            }
        }
        for gene in &bundle.genes {
            let mut row = gene.clone();
            row.owner_id = owner.to_string();
            row.status = GeneStatus::PendingReview;
            row.requires_review = true;
            row.updated_at = Utc::now();
            let audit = GeneAuditEntry::record(
                owner,
                &row.id,
                AuditAction::Imported,
                None,
                Some(serde_json::to_value(&row)?),
                Some(format!("imported from bundle of {}", bundle.owner_id)),
                "import",
            );
            match self.storage.insert_gene(&row, &audit) {
                Ok(()) => summary.genes += 1,
                Err(e) => tracing::warn!(id = %row.id, error = %e, "gene import skipped"),
            }
        }
        for snapshot in &bundle.calibration {
            let mut row = snapshot.clone();
            row.owner_id = owner.to_string();
            match self.storage.insert_calibration(&row) {
                Ok(()) => summary.calibration += 1,
                Err(e) => tracing::warn!(id = %row.id, error = %e, "calibration import skipped"),
            }
        }

        tracing::info!(owner = %owner, genes = summary.genes,
            predictions = summary.predictions, clear_existing, "import finished");
        Ok(summary)
    }
}

/// Dedup hash over the message id and normalized text.
fn source_hash(message_id: Option<&str>, text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let mut hasher = blake3::Hasher::new();
    hasher.update(message_id.unwrap_or("").as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn ingest_stream(
    storage: &dyn IReflexStorage,
    config: &ReflexConfig,
    owner: &str,
    conversation_id: &str,
    message_id: &str,
    text: &str,
    source_model: Option<&str>,
) -> ReflexResult<usize> {
    let mut recorded = 0;
    for extracted in extract(text, config) {
        let hash = source_hash(Some(message_id), &extracted.text);
        if storage.prediction_exists_by_hash(owner, &hash)? {
            continue;
        }
        let prediction = Prediction {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            conversation_id: Some(conversation_id.to_string()),
            message_id: Some(message_id.to_string()),
            text: extracted.text,
            prediction_type: extracted.prediction_type,
            domain: extracted.domain,
            confidence: extracted.confidence,
            context_summary: None,
            source_model: source_model.map(str::to_string),
            extraction_method: ExtractionMethod::Pattern,
            status: PredictionStatus::Pending,
            source_hash: hash,
            expires_at: None,
            created_at: Utc::now(),
        };
        storage.insert_prediction(&prediction)?;
        recorded += 1;
    }
    if recorded > 0 {
        tracing::debug!(owner = %owner, conversation = %conversation_id,
            recorded, "stream predictions recorded");
    }
    Ok(recorded)
}
