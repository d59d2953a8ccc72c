use crate::error::ApiResult;
use crate::webhook;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use triage_core::{TriageRequest, TriageResult};

pub const SERVICE_NAME: &str = "AI Incident Triage Assistant";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/triage", post(triage))
        .merge(webhook::webhook_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mode: state.mode.as_str(),
    })
}

async fn triage(
    State(state): State<AppState>,
    Json(request): Json<TriageRequest>,
) -> ApiResult<Json<TriageResult>> {
    run_triage(&state, request).await
}

pub(crate) async fn run_triage(
    state: &AppState,
    request: TriageRequest,
) -> ApiResult<Json<TriageResult>> {
    let result = state.pipeline.run(&request).await?;
    Ok(Json(result))
}
