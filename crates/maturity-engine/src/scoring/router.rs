use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::answers::SessionId;
use super::cache::ScoreCache;
use super::error::ScoringError;
use super::record::CalculationRecord;
use super::repository::{CalculationRepository, RepositoryError};
use super::service::{CalculationRequest, ScoringService, ScoringServiceError};

/// Router builder exposing HTTP endpoints for calculation and retrieval.
pub fn scoring_router<R, C>(service: Arc<ScoringService<R, C>>) -> Router
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    Router::new()
        .route(
            "/api/v1/scoring/calculations",
            post(calculate_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/recalculations",
            post(recalculate_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/sessions/:session_id/latest",
            get(latest_handler::<R, C>),
        )
        .route(
            "/api/v1/scoring/sessions/:session_id/history",
            get(history_handler::<R, C>),
        )
        .route("/api/v1/scoring/rules", get(rules_handler::<R, C>))
        .with_state(service)
}

pub(crate) async fn calculate_handler<R, C>(
    State(service): State<Arc<ScoringService<R, C>>>,
    axum::Json(request): axum::Json<CalculationRequest>,
) -> Response
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    match service.calculate(request) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Serialize)]
struct BatchOutcome {
    session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<CalculationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub(crate) async fn recalculate_handler<R, C>(
    State(service): State<Arc<ScoringService<R, C>>>,
    axum::Json(requests): axum::Json<Vec<CalculationRequest>>,
) -> Response
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    let sessions: Vec<SessionId> = requests
        .iter()
        .map(|request| request.answers.session_id.clone())
        .collect();
    let worker = Arc::clone(&service);
    let results =
        match tokio::task::spawn_blocking(move || worker.recalculate_batch(requests)).await {
            Ok(results) => results,
            Err(error) => {
                let payload = json!({ "error": error.to_string() });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
            }
        };

    let outcomes: Vec<BatchOutcome> = sessions
        .into_iter()
        .zip(results)
        .map(|(session_id, result)| match result {
            Ok(record) => BatchOutcome {
                session_id,
                record: Some(record),
                error: None,
            },
            Err(error) => BatchOutcome {
                session_id,
                record: None,
                error: Some(error.to_string()),
            },
        })
        .collect();
    (StatusCode::OK, axum::Json(outcomes)).into_response()
}

pub(crate) async fn latest_handler<R, C>(
    State(service): State<Arc<ScoringService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    let id = SessionId(session_id);
    match service.latest(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(ScoringServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "session_id": id.0,
                "error": "no calculation recorded for session",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn history_handler<R, C>(
    State(service): State<Arc<ScoringService<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    match service.history(&SessionId(session_id)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rules_handler<R, C>(State(service): State<Arc<ScoringService<R, C>>>) -> Response
where
    R: CalculationRepository + 'static,
    C: ScoreCache + 'static,
{
    match service.rules() {
        Ok(rules) => (StatusCode::OK, axum::Json(rules)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ScoringServiceError) -> Response {
    let status = match &error {
        ScoringServiceError::Configuration(_)
        | ScoringServiceError::Scoring(ScoringError::Configuration(_))
        | ScoringServiceError::Scoring(ScoringError::Taxonomy(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScoringServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScoringServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ScoringServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ScoringServiceError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
