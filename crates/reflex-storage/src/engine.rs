//! StorageEngine — owns the writer and reader connections, implements
//! `IReflexStorage`, runs migrations at open, and routes reads through
//! the reader pool when one exists.

use std::path::Path;

use chrono::{DateTime, Utc};

use reflex_core::errors::ReflexResult;
use reflex_core::models::{
    CalibrationSnapshot, DomainHistoryPoint, DomainState, FailurePattern, Gene, GeneAuditEntry,
    Outcome, Prediction, PredictionStatus,
};
use reflex_core::traits::{GeneFilter, IReflexStorage, PredictionFilter};

use crate::migrations;
use crate::pool::{ReadPool, WriteConnection};
use crate::queries::{
    calibration_ops, domain_ops, gene_ops, maintenance, outcome_ops, pattern_ops, prediction_ops,
};

const READ_POOL_SIZE: usize = 4;

/// The main storage engine. Mutations go through the single writer;
/// reads use the read pool for file-backed databases.
pub struct StorageEngine {
    writer: WriteConnection,
    /// `None` for in-memory databases: in-memory reader connections
    /// would be isolated databases, so all reads go through the writer.
    readers: Option<ReadPool>,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> ReflexResult<Self> {
        let engine = Self {
            writer: WriteConnection::open(path)?,
            readers: Some(ReadPool::open(path, READ_POOL_SIZE)?),
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> ReflexResult<Self> {
        let engine = Self {
            writer: WriteConnection::open_in_memory()?,
            readers: None,
        };
        engine.initialize()?;
        Ok(engine)
    }

    fn initialize(&self) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| migrations::run_migrations(conn))
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> ReflexResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> ReflexResult<T>,
    {
        match &self.readers {
            Some(pool) => pool.with_conn(f),
            None => self.writer.with_conn_sync(f),
        }
    }
}

impl IReflexStorage for StorageEngine {
    // --- Predictions ---

    fn insert_prediction(&self, prediction: &Prediction) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| prediction_ops::insert(conn, prediction))
    }

    fn get_prediction(&self, owner: &str, id: &str) -> ReflexResult<Option<Prediction>> {
        self.with_reader(|conn| prediction_ops::get(conn, owner, id))
    }

    fn transition_prediction(
        &self,
        owner: &str,
        id: &str,
        to: PredictionStatus,
    ) -> ReflexResult<Prediction> {
        self.writer
            .with_conn_sync(|conn| prediction_ops::transition(conn, owner, id, to))
    }

    fn list_predictions(
        &self,
        owner: &str,
        filter: &PredictionFilter,
    ) -> ReflexResult<Vec<Prediction>> {
        self.with_reader(|conn| prediction_ops::list(conn, owner, filter))
    }

    fn prediction_exists_by_hash(&self, owner: &str, source_hash: &str) -> ReflexResult<bool> {
        self.with_reader(|conn| prediction_ops::exists_by_hash(conn, owner, source_hash))
    }

    fn most_recent_pending(
        &self,
        owner: &str,
        conversation_id: &str,
    ) -> ReflexResult<Option<Prediction>> {
        self.with_reader(|conn| prediction_ops::most_recent_pending(conn, owner, conversation_id))
    }

    fn pending_created_before(
        &self,
        owner: &str,
        cutoff: DateTime<Utc>,
    ) -> ReflexResult<Vec<Prediction>> {
        self.with_reader(|conn| prediction_ops::pending_created_before(conn, owner, cutoff))
    }

    fn pending_past_ttl(&self, owner: &str, now: DateTime<Utc>) -> ReflexResult<Vec<Prediction>> {
        self.with_reader(|conn| prediction_ops::pending_past_ttl(conn, owner, now))
    }

    fn recent_wrong_predictions(
        &self,
        owner: &str,
        domain: &str,
        limit: usize,
    ) -> ReflexResult<Vec<Prediction>> {
        self.with_reader(|conn| prediction_ops::recent_wrong(conn, owner, domain, limit))
    }

    fn resolved_predictions(
        &self,
        owner: &str,
        domain: Option<&str>,
    ) -> ReflexResult<Vec<Prediction>> {
        self.with_reader(|conn| prediction_ops::resolved(conn, owner, domain))
    }

    // --- Outcomes ---

    fn insert_outcome(&self, outcome: &Outcome) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| outcome_ops::insert(conn, outcome))
    }

    fn get_outcome(&self, owner: &str, id: &str) -> ReflexResult<Option<Outcome>> {
        self.with_reader(|conn| outcome_ops::get(conn, owner, id))
    }

    fn list_outcomes(&self, owner: &str, limit: usize) -> ReflexResult<Vec<Outcome>> {
        self.with_reader(|conn| outcome_ops::list(conn, owner, limit))
    }

    // --- Domain state ---

    fn get_domain_state(&self, owner: &str, domain: &str) -> ReflexResult<Option<DomainState>> {
        self.with_reader(|conn| domain_ops::get_state(conn, owner, domain))
    }

    fn list_domain_states(&self, owner: &str) -> ReflexResult<Vec<DomainState>> {
        self.with_reader(|conn| domain_ops::list_states(conn, owner))
    }

    fn upsert_domain_state(&self, state: &DomainState) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| domain_ops::upsert_state(conn, state))
    }

    fn modify_domain_state(
        &self,
        owner: &str,
        domain: &str,
        decay_rate: f64,
        mutate: &mut dyn FnMut(&mut DomainState),
    ) -> ReflexResult<DomainState> {
        self.writer
            .with_conn_sync(|conn| domain_ops::modify_state(conn, owner, domain, decay_rate, mutate))
    }

    // --- Domain history ---

    fn append_history(&self, point: &DomainHistoryPoint) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| domain_ops::append_history(conn, point))
    }

    fn recent_history(
        &self,
        owner: &str,
        domain: &str,
        limit: usize,
    ) -> ReflexResult<Vec<DomainHistoryPoint>> {
        self.with_reader(|conn| domain_ops::recent_history(conn, owner, domain, limit))
    }

    fn prune_history_before(&self, owner: &str, cutoff: DateTime<Utc>) -> ReflexResult<usize> {
        self.writer
            .with_conn_sync(|conn| domain_ops::prune_history_before(conn, owner, cutoff))
    }

    // --- Patterns ---

    fn insert_pattern(&self, pattern: &FailurePattern) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| pattern_ops::insert(conn, pattern))
    }

    fn update_pattern(&self, pattern: &FailurePattern) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| pattern_ops::update(conn, pattern))
    }

    fn find_pattern(
        &self,
        owner: &str,
        domain: &str,
        signature: &str,
    ) -> ReflexResult<Option<FailurePattern>> {
        self.with_reader(|conn| pattern_ops::find(conn, owner, domain, signature))
    }

    fn list_patterns(
        &self,
        owner: &str,
        domain: Option<&str>,
    ) -> ReflexResult<Vec<FailurePattern>> {
        self.with_reader(|conn| pattern_ops::list(conn, owner, domain))
    }

    fn prune_weak_patterns(&self, owner: &str, min_frequency: u32) -> ReflexResult<usize> {
        self.writer
            .with_conn_sync(|conn| pattern_ops::prune_weak(conn, owner, min_frequency))
    }

    // --- Genes ---

    fn insert_gene(&self, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| gene_ops::insert(conn, gene, audit))
    }

    fn update_gene(&self, gene: &Gene, audit: &GeneAuditEntry) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| gene_ops::update(conn, gene, audit))
    }

    fn get_gene(&self, owner: &str, id: &str) -> ReflexResult<Option<Gene>> {
        self.with_reader(|conn| gene_ops::get(conn, owner, id))
    }

    fn list_genes(&self, owner: &str, filter: &GeneFilter) -> ReflexResult<Vec<Gene>> {
        self.with_reader(|conn| gene_ops::list(conn, owner, filter))
    }

    fn count_active_genes(&self, owner: &str, domain: &str) -> ReflexResult<u64> {
        self.with_reader(|conn| gene_ops::count_active(conn, owner, domain))
    }

    fn gene_exists(&self, owner: &str, domain: &str, text: &str) -> ReflexResult<bool> {
        self.with_reader(|conn| gene_ops::exists(conn, owner, domain, text))
    }

    fn pending_review_count(&self, owner: &str) -> ReflexResult<u64> {
        self.with_reader(|conn| gene_ops::pending_review_count(conn, owner))
    }

    fn auto_activation_candidates(
        &self,
        owner: &str,
        min_confirmations: u32,
    ) -> ReflexResult<Vec<Gene>> {
        self.with_reader(|conn| gene_ops::auto_activation_candidates(conn, owner, min_confirmations))
    }

    fn delete_weak_genes(&self, owner: &str, max_strength: f64) -> ReflexResult<usize> {
        self.writer
            .with_conn_sync(|conn| gene_ops::delete_weak(conn, owner, max_strength))
    }

    // --- Gene audit ---

    fn audit_trail(&self, owner: &str, gene_id: &str) -> ReflexResult<Vec<GeneAuditEntry>> {
        self.with_reader(|conn| gene_ops::audit_trail(conn, owner, gene_id))
    }

    // --- Calibration ---

    fn insert_calibration(&self, snapshot: &CalibrationSnapshot) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| calibration_ops::insert(conn, snapshot))
    }

    fn list_calibration(
        &self,
        owner: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> ReflexResult<Vec<CalibrationSnapshot>> {
        self.with_reader(|conn| calibration_ops::list(conn, owner, domain, limit))
    }

    fn prune_calibration_before(&self, owner: &str, cutoff: DateTime<Utc>) -> ReflexResult<usize> {
        self.writer
            .with_conn_sync(|conn| calibration_ops::prune_before(conn, owner, cutoff))
    }

    // --- Maintenance / import ---

    fn distinct_owners(&self) -> ReflexResult<Vec<String>> {
        self.with_reader(maintenance::distinct_owners)
    }

    fn clear_owner(&self, owner: &str) -> ReflexResult<()> {
        self.writer
            .with_conn_sync(|conn| maintenance::clear_owner(conn, owner))
    }
}
