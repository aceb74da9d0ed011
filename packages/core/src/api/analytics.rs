//! Analytics and compliance reporting endpoints

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::{AnalyticsBundle, TimeRange};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

/// `GET /analytics?range=7d`: defaults to the 7-day window.
pub async fn analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsBundle>, AppError> {
    let range = match params.range.as_deref() {
        Some(code) => code.parse()?,
        None => TimeRange::default(),
    };
    Ok(Json(state.source.get_analytics_data(range).await?))
}

/// `POST /compliance/reports/:report_type`: JSON report as a download.
pub async fn compliance_report(
    State(state): State<AppState>,
    Path(report_type): Path<String>,
) -> Result<Response, AppError> {
    let body = state.source.generate_compliance_report(&report_type).await?;
    let disposition = format!(
        "attachment; filename=\"{}-report.json\"",
        report_slug(&report_type)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(body))
        .map_err(|err| AppError::Parse(err.to_string()))
}

/// Lowercase ASCII slug: runs of non-alphanumerics collapse to one `-`.
/// Falls back to `compliance` when nothing ASCII-alphanumeric remains.
fn report_slug(report_type: &str) -> String {
    let slug = report_type
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "compliance".to_string()
    } else {
        slug
    }
}
