use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::scoring::answers::{AnswerSet, AnswerValue, SessionId};
use crate::scoring::cache::InMemoryScoreCache;
use crate::scoring::catalog::RuleCatalog;
use crate::scoring::engine::ScoringEngine;
use crate::scoring::record::CalculationRecord;
use crate::scoring::repository::{CalculationRepository, RepositoryError};
use crate::scoring::rule::ScoringRule;
use crate::scoring::service::ScoringService;
use crate::scoring::taxonomy::{
    Metric, MetricId, MetricKind, Pillar, PillarId, Taxonomy, Topic, TopicId,
};

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn pillar(id: &str) -> Pillar {
    Pillar {
        id: PillarId(id.to_string()),
        name: format!("Pillar {id}"),
        weight: 1.0,
        active: true,
    }
}

pub(super) fn topic(id: &str, pillar_id: &str) -> Topic {
    Topic {
        id: TopicId(id.to_string()),
        name: format!("Topic {id}"),
        pillar_id: PillarId(pillar_id.to_string()),
        weight: 1.0,
        active: true,
    }
}

pub(super) fn metric(id: &str, topic_id: &str, level: u32) -> Metric {
    Metric {
        id: MetricId(id.to_string()),
        name: format!("Metric {id}"),
        topic_id: TopicId(topic_id.to_string()),
        level,
        weight: 1.0,
        kind: MetricKind::Boolean,
        min_value: 0.0,
        max_value: 1.0,
        active: true,
    }
}

pub(super) fn metric_id(id: &str) -> MetricId {
    MetricId(id.to_string())
}

/// One pillar, one topic, metrics `m1` (level 1) and `m3` (level 3).
pub(super) fn single_topic_taxonomy() -> Taxonomy {
    Taxonomy::new(
        vec![pillar("governance")],
        vec![topic("policy", "governance")],
        vec![metric("m1", "policy", 1), metric("m3", "policy", 3)],
    )
    .expect("valid taxonomy")
}

/// Two pillars. `delivery` has two topics; `security` has one topic with a single metric.
pub(super) fn two_pillar_taxonomy() -> Taxonomy {
    Taxonomy::new(
        vec![pillar("delivery"), pillar("security")],
        vec![
            topic("pipeline", "delivery"),
            topic("release", "delivery"),
            topic("access", "security"),
        ],
        vec![
            metric("p1", "pipeline", 2),
            metric("p2", "pipeline", 4),
            metric("r1", "release", 3),
            metric("a1", "access", 5),
        ],
    )
    .expect("valid taxonomy")
}

pub(super) fn session(id: &str) -> SessionId {
    SessionId(id.to_string())
}

pub(super) fn answers(session_id: &str, answered: &[&str]) -> AnswerSet {
    let mut set = AnswerSet::new(session(session_id));
    for id in answered {
        set.record(metric_id(id), AnswerValue::Boolean(true));
    }
    set
}

pub(super) fn calculate(
    rule: ScoringRule,
    taxonomy: &Taxonomy,
    answers: &AnswerSet,
) -> CalculationRecord {
    ScoringEngine::new(rule)
        .expect("rule validates")
        .calculate(taxonomy, answers, fixed_time())
        .expect("calculation succeeds")
}

pub(super) fn build_service(
    taxonomy: Taxonomy,
) -> (
    ScoringService<MemoryRepository, InMemoryScoreCache>,
    Arc<MemoryRepository>,
    Arc<InMemoryScoreCache>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let cache = Arc::new(InMemoryScoreCache::new(32));
    let service = ScoringService::new(
        RuleCatalog::standard(),
        taxonomy,
        repository.clone(),
        cache.clone(),
    );
    (service, repository, cache)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, Vec<CalculationRecord>>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, session_id: &SessionId) -> usize {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(session_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl CalculationRepository for MemoryRepository {
    fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let history = guard.entry(record.session_id.clone()).or_default();
        if history.last() == Some(&record) {
            return Err(RepositoryError::Conflict);
        }
        history.push(record.clone());
        Ok(record)
    }

    fn latest(&self, session_id: &SessionId) -> Result<Option<CalculationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(session_id)
            .and_then(|records| records.last())
            .cloned())
    }

    fn history(&self, session_id: &SessionId) -> Result<Vec<CalculationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(session_id).cloned().unwrap_or_default())
    }
}

pub(super) struct UnavailableRepository;

impl CalculationRepository for UnavailableRepository {
    fn insert(&self, _record: CalculationRecord) -> Result<CalculationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest(&self, _session_id: &SessionId) -> Result<Option<CalculationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _session_id: &SessionId) -> Result<Vec<CalculationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
