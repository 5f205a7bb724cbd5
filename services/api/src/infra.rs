use maturity_engine::scoring::{CalculationRecord, CalculationRepository, RepositoryError, SessionId};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Append-only record store kept in process memory; each session keeps its full history.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCalculationRepository {
    records: Arc<Mutex<HashMap<SessionId, Vec<CalculationRecord>>>>,
}

impl InMemoryCalculationRepository {
    fn guard(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<SessionId, Vec<CalculationRecord>>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl CalculationRepository for InMemoryCalculationRepository {
    fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, RepositoryError> {
        let mut guard = self.guard()?;
        let history = guard.entry(record.session_id.clone()).or_default();
        if history.last() == Some(&record) {
            return Err(RepositoryError::Conflict);
        }
        history.push(record.clone());
        Ok(record)
    }

    fn latest(&self, session_id: &SessionId) -> Result<Option<CalculationRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard
            .get(session_id)
            .and_then(|history| history.last())
            .cloned())
    }

    fn history(&self, session_id: &SessionId) -> Result<Vec<CalculationRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.get(session_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use maturity_engine::scoring::{
        taxonomy_from_json_reader, AnswerSet, AnswerValue, CalculationRequest,
        InMemoryScoreCache, MetricId, RuleCatalog, ScoringEngine, ScoringRule, ScoringService,
        Taxonomy,
    };

    fn record(session: &str, minute: u32) -> CalculationRecord {
        let taxonomy = Taxonomy::default();
        let answers = AnswerSet::new(SessionId(session.to_string()));
        let at = Utc
            .with_ymd_and_hms(2025, 1, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp");
        ScoringEngine::new(ScoringRule::default())
            .expect("valid rule")
            .calculate(&taxonomy, &answers, at)
            .expect("calculation succeeds")
    }

    #[test]
    fn keeps_history_in_insertion_order() {
        let repository = InMemoryCalculationRepository::default();
        let session = SessionId("s-1".to_string());
        repository.insert(record("s-1", 0)).expect("first insert");
        let newest = repository.insert(record("s-1", 5)).expect("second insert");

        assert_eq!(repository.history(&session).expect("history").len(), 2);
        assert_eq!(repository.latest(&session).expect("latest"), Some(newest));
        assert!(repository
            .latest(&SessionId("other".to_string()))
            .expect("latest")
            .is_none());
    }

    #[test]
    fn rejects_identical_record() {
        let repository = InMemoryCalculationRepository::default();
        repository.insert(record("s-2", 0)).expect("first insert");

        assert!(matches!(
            repository.insert(record("s-2", 0)),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn rescoring_earlier_answers_through_the_service_succeeds() {
        let taxonomy = taxonomy_from_json_reader(
            r#"{
                "pillars": [{"id": "ops", "name": "Operations"}],
                "topics": [{"id": "release", "name": "Release", "pillar_id": "ops"}],
                "metrics": [
                    {"id": "m1", "name": "Scripted deploy", "topic_id": "release", "level": 1},
                    {"id": "m3", "name": "Canary", "topic_id": "release", "level": 3}
                ]
            }"#
            .as_bytes(),
        )
        .expect("taxonomy parses");
        let repository = Arc::new(InMemoryCalculationRepository::default());
        let service = ScoringService::new(
            RuleCatalog::standard(),
            taxonomy,
            repository.clone(),
            Arc::new(InMemoryScoreCache::new(32)),
        );
        let answers = |ids: &[&str]| {
            let mut set = AnswerSet::new(SessionId("s-3".to_string()));
            for id in ids {
                set.record(MetricId(id.to_string()), AnswerValue::Boolean(true));
            }
            CalculationRequest::new(set)
        };

        let first = service.calculate(answers(&["m1"])).expect("v1");
        service.calculate(answers(&["m1", "m3"])).expect("v2");
        let third = service.calculate(answers(&["m1"])).expect("v1 again");

        assert_eq!(third, first);
        let session = SessionId("s-3".to_string());
        assert_eq!(repository.history(&session).expect("history").len(), 3);
        assert_eq!(repository.latest(&session).expect("latest"), Some(first));
    }
}
