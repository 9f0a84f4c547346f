//! Assembly of the data handed to the external prompt assembler.

use std::sync::Arc;

use reflex_core::errors::ReflexResult;
use reflex_core::models::{AddendumData, GeneStatus, Score};
use reflex_core::traits::{GeneFilter, IReflexStorage};

/// Maximum genes ever surfaced to the prompt assembler.
const ADDENDUM_GENE_CAP: usize = 20;

pub struct AddendumAssembler {
    storage: Arc<dyn IReflexStorage>,
}

impl AddendumAssembler {
    pub fn new(storage: Arc<dyn IReflexStorage>) -> Self {
        Self { storage }
    }

    /// Assemble addendum data for an owner. When the kill switch is
    /// engaged the active-gene list is empty, but domain states,
    /// pending-review counts and the gate flags still flow.
    pub fn assemble(
        &self,
        owner: &str,
        bootstrap_active: bool,
        kill_switch_active: bool,
    ) -> ReflexResult<AddendumData> {
        let domain_states = self.storage.list_domain_states(owner)?;
        let pending_review_count = self.storage.pending_review_count(owner)?;

        let active_genes = if kill_switch_active {
            Vec::new()
        } else {
            let mut genes = self.storage.list_genes(
                owner,
                &GeneFilter {
                    status: Some(GeneStatus::Active),
                    domain: None,
                    limit: None,
                },
            )?;
            genes.retain(|g| g.strength.value() >= Score::ADDENDUM_FLOOR);
            // Strongest first, stable across equal strengths.
            genes.sort_by(|a, b| {
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            genes.truncate(ADDENDUM_GENE_CAP);
            genes
        };

        Ok(AddendumData {
            domain_states,
            active_genes,
            pending_review_count,
            bootstrap_active,
            kill_switch_active,
        })
    }
}
