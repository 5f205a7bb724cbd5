use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::scoring::cache::NoopScoreCache;
use crate::scoring::catalog::RuleCatalog;
use crate::scoring::router::{calculate_handler, latest_handler, scoring_router};
use crate::scoring::rule::ScoringRule;
use crate::scoring::service::{CalculationRequest, ScoringService};

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(body).expect("serialize request body"),
        ))
        .expect("request builds")
}

#[tokio::test]
async fn calculation_route_returns_breakdown() {
    let (service, _, _) = build_service(single_topic_taxonomy());
    let router = scoring_router(Arc::new(service));

    let body = json!({
        "answers": {
            "session_id": "s-http",
            "version": 2,
            "answers": {
                "m1": {"value": true},
                "m3": {"value": true}
            }
        }
    });
    let response = router
        .oneshot(json_request("POST", "/api/v1/scoring/calculations", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["session_id"], json!("s-http"));
    assert_eq!(payload["overall_score"], json!(2.0));
    assert_eq!(payload["maturity_level"], json!("defined"));
    assert_eq!(payload["rule"]["id"], json!("standard"));
    assert_eq!(payload["completion"]["completion_percentage"], json!(100.0));
    assert!(payload["pillar_breakdown"]["governance"]["topics"].is_array());
}

#[tokio::test]
async fn calculate_handler_rejects_inconsistent_taxonomy() {
    let repository = Arc::new(MemoryRepository::default());
    let mut catalog = RuleCatalog::new();
    catalog
        .insert(ScoringRule {
            is_default: true,
            metric_max_level: 2,
            ..ScoringRule::default()
        })
        .expect("rule inserted");
    let service = Arc::new(ScoringService::new(
        catalog,
        single_topic_taxonomy(),
        repository,
        Arc::new(NoopScoreCache),
    ));

    let response = calculate_handler::<MemoryRepository, NoopScoreCache>(
        State(service),
        axum::Json(CalculationRequest::new(answers("s-bad", &["m1"]))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("m3"));
}

#[tokio::test]
async fn calculate_handler_reports_unavailable_repository() {
    let service = Arc::new(ScoringService::new(
        RuleCatalog::standard(),
        single_topic_taxonomy(),
        Arc::new(UnavailableRepository),
        Arc::new(NoopScoreCache),
    ));

    let response = calculate_handler::<UnavailableRepository, NoopScoreCache>(
        State(service),
        axum::Json(CalculationRequest::new(answers("s-offline", &["m1"]))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn latest_handler_returns_not_found_before_first_calculation() {
    let (service, _, _) = build_service(single_topic_taxonomy());

    let response = latest_handler::<MemoryRepository, _>(
        State(Arc::new(service)),
        Path("s-unknown".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["session_id"], json!("s-unknown"));
}

#[tokio::test]
async fn latest_route_returns_persisted_record() {
    let (service, _, _) = build_service(single_topic_taxonomy());
    let service = Arc::new(service);
    let stored = service
        .calculate_at(
            CalculationRequest::new(answers("s-latest", &["m3"])),
            fixed_time(),
        )
        .expect("calculation stored");

    let response = scoring_router(service)
        .oneshot(
            Request::get("/api/v1/scoring/sessions/s-latest/latest")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["overall_score"], json!(stored.overall_score));
    assert_eq!(payload["answer_set_version"], json!(1));
}

#[tokio::test]
async fn rules_route_lists_catalog() {
    let (service, _, _) = build_service(single_topic_taxonomy());

    let response = scoring_router(Arc::new(service))
        .oneshot(
            Request::get("/api/v1/scoring/rules")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let rules = payload.as_array().expect("rule list");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["topic_score_method"], json!("AVERAGE"));
    assert_eq!(rules[0]["is_default"], json!(true));
}

#[tokio::test]
async fn recalculation_route_reports_each_session() {
    let (service, _, _) = build_service(single_topic_taxonomy());

    let body = json!([
        {"answers": {"session_id": "s-r1", "version": 1, "answers": {"m1": {"value": true}}}},
        {"answers": {"session_id": "s-r2", "version": 1}, "rule_id": "ghost"}
    ]);
    let response = scoring_router(Arc::new(service))
        .oneshot(json_request("POST", "/api/v1/scoring/recalculations", &body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["session_id"], json!("s-r1"));
    assert_eq!(payload[0]["record"]["overall_score"], json!(0.5));
    assert_eq!(payload[1]["session_id"], json!("s-r2"));
    assert!(payload[1]["error"]
        .as_str()
        .unwrap_or_default()
        .contains("ghost"));
}

#[tokio::test]
async fn history_route_lists_every_stored_record() {
    let (service, _, _) = build_service(single_topic_taxonomy());
    let service = Arc::new(service);
    let mut set = answers("s-hist", &["m1"]);
    service
        .calculate(CalculationRequest::new(set.clone()))
        .expect("first");
    set.record(metric_id("m3"), crate::scoring::AnswerValue::Boolean(true));
    service
        .calculate(CalculationRequest::new(set))
        .expect("second");

    let response = scoring_router(service)
        .oneshot(
            Request::get("/api/v1/scoring/sessions/s-hist/history")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(2));
}
