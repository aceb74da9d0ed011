//! Dashboard KPI endpoints.
//!
//! Every request fetches a fresh snapshot from the data source. Successful
//! fetches are remembered in a [`SnapshotCache`]; a transport failure
//! serves that last good value flagged `stale` instead of clearing the
//! dashboard. Only a cache that never saw a success surfaces the error.

use std::future::Future;

use axum::{extract::State, Json};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::cache::{Cached, SnapshotCache};
use crate::error::AppError;
use crate::feed::{DashboardMetricsSnapshot, MaterialFlowStage};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct Served<T> {
    pub data: T,
    pub stale: bool,
}

impl<T> From<Cached<T>> for Served<T> {
    fn from(cached: Cached<T>) -> Self {
        Self {
            data: cached.value,
            stale: cached.stale,
        }
    }
}

pub async fn dashboard_metrics(
    State(state): State<AppState>,
) -> Result<Json<Served<DashboardMetricsSnapshot>>, AppError> {
    let source = state.source.clone();
    let served =
        fetch_or_last_known(&state.metrics_cache, || async move { source.get_dashboard_metrics().await })
            .await?;
    Ok(Json(served.into()))
}

pub async fn material_flow(
    State(state): State<AppState>,
) -> Result<Json<Served<Vec<MaterialFlowStage>>>, AppError> {
    let source = state.source.clone();
    let served =
        fetch_or_last_known(&state.flow_cache, || async move { source.get_material_flow().await })
            .await?;
    Ok(Json(served.into()))
}

/// Fetch from the source; on a transport error fall back to the last
/// known value.
pub async fn fetch_or_last_known<T, F, Fut>(
    cache: &Mutex<SnapshotCache<T>>,
    fetch: F,
) -> Result<Cached<T>, AppError>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    match fetch().await {
        Ok(value) => {
            cache.lock().await.set(value.clone());
            Ok(Cached { value, stale: false })
        }
        Err(err) if err.is_transport() => {
            let cache = cache.lock().await;
            match cache.last_known() {
                Some(cached) => {
                    tracing::warn!(
                        "Data source unavailable, serving value from {:?} ago: {}",
                        cache.age().unwrap_or_default(),
                        err
                    );
                    Ok(cached)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}
