use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::AppState;

/// `GET /health`: liveness plus the active backend and feed period.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(json!({
            "status": "ok",
            "source": state.source.source_name(),
            "feedPeriodSeconds": state.feed.period().as_secs(),
        })),
    )
}
