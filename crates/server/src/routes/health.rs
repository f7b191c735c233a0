use api_types::HealthResponse;
use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use super::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let metrics = state.metrics();
    let body = metrics.render()?;
    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body).into_response())
}
