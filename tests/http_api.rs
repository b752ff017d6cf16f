//! HTTP adapter wiring, driven through the router without binding a socket.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use lca_insight::clients::ResponseClient;
use lca_insight::config::Config;
use lca_insight::http::{HttpState, router};
use lca_insight::orchestrator::Orchestrator;

fn mock_state() -> HttpState {
    let mut config = Config::default();
    config.ai.mock_mode = true;
    HttpState {
        config: Arc::new(config),
        orchestrator: Arc::new(Orchestrator::new(ResponseClient::mock())),
    }
}

async fn post(uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router(mock_state()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let response = router(mock_state())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn info_reports_mock_mode() {
    let response = router(mock_state())
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["mock_mode"], json!(true));
    assert_eq!(info["persist_reports"], json!(false));
}

#[tokio::test]
async fn suggest_parameters_in_mock_mode() {
    let (status, body) = post(
        "/api/ai/suggest-parameters",
        r#"{"params": {"metalType": "Copper", "oreGrade": 0.5}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["suggestions"]["transportMode"], json!("Rail"));
    assert!(body.get("warning").is_none());
}

#[tokio::test]
async fn missing_params_is_bad_request() {
    let (status, body) = post("/api/ai/recommendations", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("params"));
}

#[tokio::test]
async fn non_json_body_is_bad_request() {
    let (status, _) = post("/api/ai/suggest-parameters", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recommendations_without_sink_have_no_report_id() {
    let (status, body) = post(
        "/api/ai/recommendations",
        r#"{"params": {"metalType": "Copper"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["report"]["summary"].as_str().is_some());
    assert!(body["report"]["recommendations"].as_array().is_some());
    assert!(body.get("reportId").is_none());
}

#[tokio::test]
async fn node_insight_uses_camel_case_fields() {
    let (status, body) = post(
        "/api/ai/node-insight",
        r#"{"nodeId": "n1", "stage": "Distribution", "params": {"transportMode": "Truck"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["insights"]["circularOpportunities"].as_str().is_some());
    assert!(body["insights"]["environmentalImpacts"].as_str().is_some());

    let (status, _) = post(
        "/api/ai/node-insight",
        r#"{"stage": "Distribution", "params": {}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
