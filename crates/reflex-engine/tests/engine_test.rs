//! Facade-level behavior: ingestion dedup, the resolution loop with
//! mining, governance gating, export/import, dashboard aggregation.

use std::sync::{Arc, Mutex};

use reflex_engine::{
    CreateGeneRequest, ITrainingSink, OutcomeResult, PredictionFilter, RecordOutcome,
    ReflexConfig, ReflexEngine, ResolveRequest, SubmitPrediction, TrainingSample, TriggerType,
};

use reflex_core::errors::{ReflexError, ReflexResult};
use reflex_core::models::{GeneStatus, PredictionStatus, PredictionType, RegressionRisk};

const OWNER: &str = "owner-1";

fn engine() -> ReflexEngine {
    ReflexEngine::open_in_memory(ReflexConfig::default()).unwrap()
}

fn submit(text: &str, domain: Option<&str>, confidence: f64) -> SubmitPrediction {
    SubmitPrediction {
        text: text.to_string(),
        domain: domain.map(str::to_string),
        prediction_type: PredictionType::OutcomeForecast,
        confidence,
        conversation_id: Some("conv-1".to_string()),
        message_id: None,
        context_summary: None,
        source_model: None,
        expires_at: None,
    }
}

#[test]
fn stream_ingestion_dedups_by_source() {
    let engine = engine();
    let text = "I expect the rollout to finish cleanly tonight, and this will unblock \
                the mobile team tomorrow morning.";

    let first = engine
        .ingest_stream(OWNER, "conv-1", "msg-1", text, Some("model-a"))
        .unwrap();
    assert!(first >= 1);

    // Same message again: everything is deduplicated by source hash.
    let second = engine
        .ingest_stream(OWNER, "conv-1", "msg-1", text, Some("model-a"))
        .unwrap();
    assert_eq!(second, 0);

    // Same text under a different message id is a fresh source.
    let third = engine
        .ingest_stream(OWNER, "conv-1", "msg-2", text, Some("model-a"))
        .unwrap();
    assert_eq!(third, first);

    let stored = engine
        .list_predictions(OWNER, &PredictionFilter::default())
        .unwrap();
    assert_eq!(stored.len(), first * 2);
    assert!(stored.iter().all(|p| p.status == PredictionStatus::Pending));
}

#[test]
fn classified_domain_fills_in_on_submission() {
    let engine = engine();
    let p = engine
        .submit_prediction(
            OWNER,
            &submit("the deploy rollout will finish before midnight", None, 0.7),
        )
        .unwrap();
    assert_eq!(p.domain, "deployment");

    let fallback = engine
        .submit_prediction(OWNER, &submit("everything is perfectly fine", None, 0.5))
        .unwrap();
    assert_eq!(fallback.domain, "general_competence");
}

#[test]
fn repeated_wrong_resolutions_mine_and_promote_through_the_facade() {
    let engine = engine();
    let req = ResolveRequest::new(OutcomeResult::Wrong, TriggerType::Feedback);
    let text = "the deploy pipeline will pass the smoke test this time";

    let mut last_report = None;
    for _ in 0..4 {
        let p = engine
            .submit_prediction(OWNER, &submit(text, Some("deployment"), 0.6))
            .unwrap();
        last_report = Some(engine.resolve(OWNER, &p.id, &req).unwrap());
    }

    // Mining needed two wrong rows before its first pattern, so the
    // fourth resolution carries the promotion.
    let report = last_report.unwrap();
    assert!(report.pattern_detected.is_some());
    let gene_id = report.gene_created.expect("gene promoted");
    let gene = engine.get_gene(OWNER, &gene_id).unwrap().unwrap();
    assert_eq!(gene.status, GeneStatus::Active);
    assert_eq!(gene.domain, "deployment");

    // The promoted gene flows into addendum data.
    let addendum = engine.addendum_data(OWNER).unwrap();
    assert_eq!(addendum.active_genes.len(), 1);
}

#[test]
fn bootstrap_suppresses_mining_but_not_tracking() {
    let mut config = ReflexConfig::default();
    config.deployment.is_private = false;
    config.deployment.bootstrap_until = Some(chrono::Utc::now() + chrono::Duration::days(7));
    let engine = ReflexEngine::open_in_memory(config).unwrap();
    assert!(engine.bootstrap_active());

    let req = ResolveRequest::new(OutcomeResult::Wrong, TriggerType::Feedback);
    for _ in 0..5 {
        let p = engine
            .submit_prediction(
                OWNER,
                &submit("the deploy pipeline will pass", Some("deployment"), 0.6),
            )
            .unwrap();
        let report = engine.resolve(OWNER, &p.id, &req).unwrap();
        assert!(report.pattern_detected.is_none());
        assert!(report.gene_created.is_none());
    }

    // Tracking continued: state moved, but no patterns or genes exist.
    let state = engine.get_domain_state(OWNER, "deployment").unwrap().unwrap();
    assert_eq!(state.wrong, 5);
    assert!(engine.list_patterns(OWNER, None).unwrap().is_empty());
    let addendum = engine.addendum_data(OWNER).unwrap();
    assert!(addendum.bootstrap_active);
    assert!(addendum.active_genes.is_empty());
}

#[test]
fn kill_switch_round_trips_through_the_facade() {
    let engine = engine();
    assert!(!engine.kill_switch_active());
    engine.set_kill_switch(true);
    assert!(engine.kill_switch_active());
    let addendum = engine.addendum_data(OWNER).unwrap();
    assert!(addendum.kill_switch_active);
}

struct CollectingSink {
    samples: Mutex<Vec<TrainingSample>>,
}

impl ITrainingSink for CollectingSink {
    fn record(&self, sample: &TrainingSample) -> ReflexResult<()> {
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }
}

#[test]
fn correct_resolutions_feed_the_training_sink() {
    let sink = Arc::new(CollectingSink {
        samples: Mutex::new(Vec::new()),
    });
    let storage: Arc<dyn reflex_core::traits::IReflexStorage> =
        Arc::new(reflex_storage::StorageEngine::open_in_memory().unwrap());
    let engine = ReflexEngine::with_training_sink(
        storage,
        ReflexConfig::default(),
        Arc::clone(&sink) as Arc<dyn ITrainingSink>,
    );

    let p = engine
        .submit_prediction(OWNER, &submit("this estimate will hold", Some("time_estimation"), 0.8))
        .unwrap();
    engine
        .resolve(
            OWNER,
            &p.id,
            &ResolveRequest::new(OutcomeResult::Correct, TriggerType::Explicit),
        )
        .unwrap();

    // Dropping the engine drains the dispatcher queue.
    drop(engine);
    let samples = sink.samples.lock().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].prediction_id, p.id);
    assert_eq!(samples[0].result, OutcomeResult::Correct);
    assert_eq!(samples[0].domain, "time_estimation");
}

#[test]
fn import_lands_genes_in_review_and_preserves_existing_rows() {
    let source = engine();
    let gene = source
        .create_gene(
            OWNER,
            &CreateGeneRequest {
                text: "re-run flaky suites before trusting them".to_string(),
                gene_type: "caution".to_string(),
                domain: "tool_reliability".to_string(),
                trigger_condition: "always".to_string(),
                action_directive: "re-run once".to_string(),
                strength: 0.7,
                regression_risk: RegressionRisk::Low,
            },
            "operator",
        )
        .unwrap();
    assert_eq!(gene.status, GeneStatus::Active);
    let bundle = source.export(OWNER).unwrap();

    let target = engine();
    let existing = target
        .create_gene(
            OWNER,
            &CreateGeneRequest {
                text: "check shell quoting before running scripts".to_string(),
                gene_type: "caution".to_string(),
                domain: "tool_reliability".to_string(),
                trigger_condition: "always".to_string(),
                action_directive: "inspect the command".to_string(),
                strength: 0.6,
                regression_risk: RegressionRisk::Low,
            },
            "operator",
        )
        .unwrap();

    let summary = target.import(OWNER, &bundle, false).unwrap();
    assert_eq!(summary.genes, 1);

    // Pre-existing rows survive a non-clearing import.
    assert!(target.get_gene(OWNER, &existing.id).unwrap().is_some());
    // Imported genes always land in review, even when exported active.
    let imported = target.get_gene(OWNER, &gene.id).unwrap().unwrap();
    assert_eq!(imported.status, GeneStatus::PendingReview);
    assert!(imported.requires_review);
}

#[test]
fn clearing_import_wipes_the_owner_first() {
    let source = engine();
    let p = source
        .submit_prediction(OWNER, &submit("this will hold up", Some("deployment"), 0.6))
        .unwrap();
    source
        .resolve(
            OWNER,
            &p.id,
            &ResolveRequest::new(OutcomeResult::Correct, TriggerType::Explicit),
        )
        .unwrap();
    let bundle = source.export(OWNER).unwrap();

    let target = engine();
    target
        .submit_prediction(OWNER, &submit("stale local row", Some("deployment"), 0.4))
        .unwrap();
    let summary = target.import(OWNER, &bundle, true).unwrap();

    assert_eq!(summary.predictions, 1);
    assert_eq!(summary.domain_states, bundle.domain_states.len());
    let rows = target
        .list_predictions(OWNER, &PredictionFilter::default())
        .unwrap();
    // Only the imported row remains.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, p.id);
}

#[test]
fn dashboard_aggregates_counts() {
    let engine = engine();
    let req_correct = ResolveRequest::new(OutcomeResult::Correct, TriggerType::Explicit);
    let req_wrong = ResolveRequest::new(OutcomeResult::Wrong, TriggerType::Explicit);

    let a = engine
        .submit_prediction(OWNER, &submit("first claim will hold", Some("deployment"), 0.6))
        .unwrap();
    let b = engine
        .submit_prediction(OWNER, &submit("second claim will hold", Some("deployment"), 0.6))
        .unwrap();
    engine
        .submit_prediction(OWNER, &submit("third claim still pending", Some("deployment"), 0.6))
        .unwrap();
    engine.resolve(OWNER, &a.id, &req_correct).unwrap();
    engine.resolve(OWNER, &b.id, &req_wrong).unwrap();

    let dashboard = engine.dashboard(OWNER).unwrap();
    assert_eq!(dashboard.total_predictions, 3);
    assert_eq!(dashboard.pending, 1);
    assert_eq!(dashboard.correct, 1);
    assert_eq!(dashboard.wrong, 1);
    assert!((dashboard.overall_accuracy - 0.5).abs() < 1e-9);
    assert_eq!(dashboard.recent_outcomes.len(), 2);
    assert_eq!(dashboard.domain_states.len(), 1);
}

#[test]
fn standalone_outcome_round_trips_without_a_prediction() {
    let engine = engine();

    let mut request = RecordOutcome::new(OutcomeResult::Wrong, "tool_reliability", TriggerType::Feedback);
    request.lesson_learned = Some("the shell tool times out on long clones".to_string());

    let recorded = engine.record_outcome(OWNER, &request).unwrap();
    assert!(recorded.prediction_id.is_none());
    assert_eq!(recorded.pain_delta, 0.2);
    assert_eq!(recorded.conf_delta, -0.1);
    assert!(recorded.cascade_effects.is_empty());

    let fetched = engine.get_outcome(OWNER, &recorded.id).unwrap().unwrap();
    assert_eq!(fetched.domain, "tool_reliability");
    assert_eq!(fetched.lesson_learned.as_deref(), Some("the shell tool times out on long clones"));

    let listed = engine.list_outcomes(OWNER, 10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, recorded.id);

    // No prediction was verified, so no domain state was created.
    assert!(engine.get_domain_state(OWNER, "tool_reliability").unwrap().is_none());
}

#[test]
fn standalone_outcome_requires_a_domain() {
    let engine = engine();
    let request = RecordOutcome::new(OutcomeResult::Correct, "  ", TriggerType::Explicit);
    let result = engine.record_outcome(OWNER, &request);
    assert!(matches!(result, Err(ReflexError::InvalidArgument { .. })));
}

#[test]
fn file_backed_engine_keeps_state_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reflex.db");

    let id = {
        let engine = ReflexEngine::open(&path, ReflexConfig::default()).unwrap();
        engine
            .submit_prediction(OWNER, &submit("the cache warmup will finish in time", Some("deployment"), 0.6))
            .unwrap()
            .id
    };

    let engine = ReflexEngine::open(&path, ReflexConfig::default()).unwrap();
    let loaded = engine.get_prediction(OWNER, &id).unwrap().unwrap();
    assert_eq!(loaded.status, PredictionStatus::Pending);
    assert_eq!(loaded.domain, "deployment");
}

#[test]
fn lifecycle_runs_through_the_facade() {
    let engine = engine();
    engine
        .submit_prediction(OWNER, &submit("pending claim for sweep", Some("deployment"), 0.6))
        .unwrap();
    let report = engine.run_lifecycle(OWNER);
    assert!(report.failed_steps.is_empty());
}
