use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::answers::{AnswerOverride, AnswerSet, SessionId};
use super::cache::{CacheKey, ScoreCache};
use super::catalog::RuleCatalog;
use super::engine::ScoringEngine;
use super::error::{ConfigurationError, ScoringError};
use super::record::CalculationRecord;
use super::repository::{CalculationRepository, RepositoryError};
use super::rule::{RuleId, ScoringRule};
use super::taxonomy::Taxonomy;

fn persist_by_default() -> bool {
    true
}

/// Input for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub answers: AnswerSet,
    /// Explicit rule; the catalog default is used when absent.
    #[serde(default)]
    pub rule_id: Option<RuleId>,
    /// Hypothetical answers. A request carrying overrides is never cached or persisted.
    #[serde(default)]
    pub overrides: Vec<AnswerOverride>,
    #[serde(default = "persist_by_default")]
    pub persist: bool,
}

impl CalculationRequest {
    pub fn new(answers: AnswerSet) -> Self {
        Self {
            answers,
            rule_id: None,
            overrides: Vec::new(),
            persist: true,
        }
    }

    pub fn with_rule(mut self, rule_id: RuleId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    pub fn what_if(mut self, overrides: Vec<AnswerOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn is_what_if(&self) -> bool {
        !self.overrides.is_empty()
    }
}

/// Current taxonomy snapshot and the number of swaps that preceded it.
struct TaxonomySlot {
    generation: u64,
    taxonomy: Arc<Taxonomy>,
}

/// Service composing rule selection, the scoring engine, the score cache and persistence.
pub struct ScoringService<R, C> {
    catalog: RwLock<RuleCatalog>,
    taxonomy: RwLock<TaxonomySlot>,
    repository: Arc<R>,
    cache: Arc<C>,
}

impl<R, C> ScoringService<R, C>
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    pub fn new(catalog: RuleCatalog, taxonomy: Taxonomy, repository: Arc<R>, cache: Arc<C>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            taxonomy: RwLock::new(TaxonomySlot {
                generation: 0,
                taxonomy: Arc::new(taxonomy),
            }),
            repository,
            cache,
        }
    }

    /// Score a session against the current taxonomy.
    pub fn calculate(
        &self,
        request: CalculationRequest,
    ) -> Result<CalculationRecord, ScoringServiceError> {
        self.calculate_at(request, Utc::now())
    }

    /// Same as [`ScoringService::calculate`] with an explicit timestamp.
    pub fn calculate_at(
        &self,
        request: CalculationRequest,
        calculated_at: DateTime<Utc>,
    ) -> Result<CalculationRecord, ScoringServiceError> {
        let rule = self.resolve_rule(request.rule_id.as_ref())?;
        let (taxonomy_generation, taxonomy) = self.taxonomy()?;
        let engine = ScoringEngine::new(rule)?;

        if request.is_what_if() {
            let scenario = request.answers.with_overrides(&request.overrides);
            let record = engine.calculate(&taxonomy, &scenario, calculated_at)?;
            debug!(
                session = %record.session_id,
                overrides = request.overrides.len(),
                "what-if calculation served"
            );
            return Ok(record);
        }

        let key = CacheKey {
            session_id: request.answers.session_id.clone(),
            rule_id: engine.rule().id.clone(),
            rule_version: engine.rule().version,
            answer_set_version: request.answers.version,
            answers_digest: request.answers.digest(),
            taxonomy_generation,
        };

        let record = match self.cache.get(&key) {
            Some(hit) => {
                debug!(session = %key.session_id, rule = %key.rule_id, "score cache hit");
                hit
            }
            None => {
                let record = engine.calculate(&taxonomy, &request.answers, calculated_at)?;
                self.cache.put(key, record.clone());
                record
            }
        };

        if request.persist {
            self.persist(&record)?;
        }

        Ok(record)
    }

    /// Re-score many sessions in parallel; results keep the input order.
    pub fn recalculate_batch(
        &self,
        requests: Vec<CalculationRequest>,
    ) -> Vec<Result<CalculationRecord, ScoringServiceError>>
    where
        Self: Sync,
    {
        let calculated_at = Utc::now();
        let total = requests.len();
        let results: Vec<_> = requests
            .into_par_iter()
            .map(|request| self.calculate_at(request, calculated_at))
            .collect();
        let failed = results.iter().filter(|result| result.is_err()).count();
        info!(total, failed, "batch recalculation finished");
        results
    }

    /// Most recent persisted record for the session.
    pub fn latest(&self, session_id: &SessionId) -> Result<CalculationRecord, ScoringServiceError> {
        let record = self
            .repository
            .latest(session_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn history(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<CalculationRecord>, ScoringServiceError> {
        Ok(self.repository.history(session_id)?)
    }

    pub fn rules(&self) -> Result<Vec<ScoringRule>, ScoringServiceError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| ScoringServiceError::StatePoisoned)?;
        Ok(catalog.rules().cloned().collect())
    }

    pub fn add_rule(&self, rule: ScoringRule) -> Result<(), ScoringServiceError> {
        let mut catalog = self
            .catalog
            .write()
            .map_err(|_| ScoringServiceError::StatePoisoned)?;
        catalog.insert(rule)?;
        Ok(())
    }

    /// Store an edited rule as a new revision and drop every cached score computed with it.
    pub fn revise_rule(&self, rule: ScoringRule) -> Result<ScoringRule, ScoringServiceError> {
        let revised = {
            let mut catalog = self
                .catalog
                .write()
                .map_err(|_| ScoringServiceError::StatePoisoned)?;
            catalog.revise(rule)?.clone()
        };
        self.cache.invalidate_rule(&revised.id);
        info!(rule = %revised.id, version = revised.version, "scoring rule revised");
        Ok(revised)
    }

    pub fn set_default_rule(&self, rule_id: &RuleId) -> Result<(), ScoringServiceError> {
        let mut catalog = self
            .catalog
            .write()
            .map_err(|_| ScoringServiceError::StatePoisoned)?;
        catalog.set_default(rule_id)?;
        Ok(())
    }

    /// Swap in a new taxonomy snapshot; every cached score is discarded.
    ///
    /// The generation bump keeps a calculation that started on the old snapshot from
    /// serving its late cache write to requests made after the swap.
    pub fn replace_taxonomy(&self, taxonomy: Taxonomy) -> Result<(), ScoringServiceError> {
        let generation = {
            let mut current = self
                .taxonomy
                .write()
                .map_err(|_| ScoringServiceError::StatePoisoned)?;
            current.generation += 1;
            current.taxonomy = Arc::new(taxonomy);
            current.generation
        };
        self.invalidate_taxonomy();
        info!(generation, "taxonomy replaced");
        Ok(())
    }

    /// Drop every cached score; call after any taxonomy edit.
    pub fn invalidate_taxonomy(&self) {
        self.cache.clear();
    }

    /// Call after writing answers for `session_id`.
    pub fn invalidate_session(&self, session_id: &SessionId) {
        self.cache.invalidate_session(session_id);
    }

    fn resolve_rule(&self, rule_id: Option<&RuleId>) -> Result<ScoringRule, ScoringServiceError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| ScoringServiceError::StatePoisoned)?;
        Ok(catalog.resolve(rule_id)?.clone())
    }

    fn taxonomy(&self) -> Result<(u64, Arc<Taxonomy>), ScoringServiceError> {
        let slot = self
            .taxonomy
            .read()
            .map_err(|_| ScoringServiceError::StatePoisoned)?;
        Ok((slot.generation, Arc::clone(&slot.taxonomy)))
    }

    /// Append `record` unless it already is the session's latest. A cache hit for
    /// answers scored earlier becomes the latest again.
    fn persist(&self, record: &CalculationRecord) -> Result<(), ScoringServiceError> {
        let latest = self.repository.latest(&record.session_id)?;
        if latest.as_ref() == Some(record) {
            return Ok(());
        }
        self.repository.insert(record.clone())?;
        Ok(())
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("scoring state is unavailable after a panic in another request")]
    StatePoisoned,
}
