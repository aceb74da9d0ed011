//! Digital twin endpoints.
//!
//! Routes:
//! - `GET  /twin`: current line state
//! - `POST /twin/toggle`: pause or resume the simulation
//! - `POST /twin/reset`: zero today's counter and restore baseline efficiency
//! - `GET  /twin/stages/:id`: one process stage

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppError;
use crate::feed::{DigitalTwin, ProcessStage};

use super::AppState;

pub async fn twin_state(State(state): State<AppState>) -> Json<DigitalTwin> {
    Json(state.twin.read().await.clone())
}

pub async fn toggle_twin(State(state): State<AppState>) -> Json<DigitalTwin> {
    let mut twin = state.twin.write().await;
    let running = twin.toggle();
    tracing::info!("Digital twin {}", if running { "resumed" } else { "paused" });
    Json(twin.clone())
}

pub async fn reset_twin(State(state): State<AppState>) -> Json<DigitalTwin> {
    let mut twin = state.twin.write().await;
    twin.reset();
    tracing::info!("Digital twin counters reset");
    Json(twin.clone())
}

pub async fn twin_stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessStage>, AppError> {
    state
        .twin
        .read()
        .await
        .stage(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Process stage {} not found", id)))
}
