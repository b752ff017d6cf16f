//! HTTP transport for lca-insight
//!
//! Thin Axum adapter over the orchestrator's boundary operations. Bodies are parsed
//! here only far enough to pull out the named fields; validation belongs to the
//! orchestrator so every malformed input maps to the same 400 response.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{
    InsightResponse, NodeInsightRequest, ParamsRequest, ReportResponse, SuggestResponse,
};
use crate::config::Config;
use crate::error::{LcaError, Result};
use crate::orchestrator::Orchestrator;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/api/ai/suggest-parameters", post(suggest_handler))
        .route("/api/ai/recommendations", post(recommendations_handler))
        .route("/api/ai/node-insight", post(node_insight_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: HttpState, bind: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("HTTP server listening on {}", bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let ai = &state.config.ai;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "model": ai.model,
            "mock_mode": ai.mock_mode,
            "retry": {
                "max_retries": ai.max_retries,
                "timeout_ms": ai.timeout_ms,
                "backoff_ms": ai.backoff_ms
            },
            "persist_reports": state.orchestrator.has_sink()
        })
        .to_string(),
    )
}

async fn suggest_handler(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<SuggestResponse>> {
    let req: ParamsRequest = parse_body(&body)?;
    let resp = state
        .orchestrator
        .suggest_parameters(req.params.as_ref())
        .await?;
    Ok(Json(resp))
}

async fn recommendations_handler(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<ReportResponse>> {
    let req: ParamsRequest = parse_body(&body)?;
    let resp = state
        .orchestrator
        .generate_recommendations(req.params.as_ref())
        .await?;
    Ok(Json(resp))
}

async fn node_insight_handler(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<InsightResponse>> {
    let req: NodeInsightRequest = parse_body(&body)?;
    let resp = state
        .orchestrator
        .get_node_insight(req.node_id.as_ref(), req.stage.as_ref(), req.params.as_ref())
        .await?;
    Ok(Json(resp))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| LcaError::invalid_request(format!("request body must be a JSON object: {}", e)))
}
