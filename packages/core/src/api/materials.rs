//! Material ledger endpoints.
//!
//! Routes:
//! - `GET   /materials`: filtered listing, ledger order
//! - `GET   /materials/:id`: single record
//! - `PATCH /materials/:id/status`: move a record to a new status
//! - `GET   /materials/:id/verification`: distributed-ledger verification

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::ledger::{MaterialFilter, MaterialRecord, MaterialStatus};
use crate::services::LedgerVerification;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn list_materials(
    State(state): State<AppState>,
    Query(filter): Query<MaterialFilter>,
) -> Result<Json<Vec<MaterialRecord>>, AppError> {
    let records = state.source.list_materials(&filter).await?;
    tracing::debug!("Listing {} materials for {:?}", records.len(), filter);
    Ok(Json(records))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MaterialRecord>, AppError> {
    Ok(Json(state.source.get_material(&id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<MaterialRecord>, AppError> {
    let status: MaterialStatus = body.status.parse()?;
    Ok(Json(state.source.update_material_status(&id, status).await?))
}

pub async fn verify_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerVerification>, AppError> {
    Ok(Json(state.source.verify_on_ledger(&id).await?))
}
