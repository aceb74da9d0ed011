//! HTTP surface of the traceability service.
//!
//! `create_router` assembles every route over a shared [`AppState`]. The
//! same assembly is used by `main.rs` and by the integration tests.

pub mod analytics;
pub mod dashboard;
pub mod feed;
pub mod health;
pub mod materials;
pub mod twin;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::SnapshotCache;
use crate::error::AppError;
use crate::feed::{DashboardMetricsSnapshot, MaterialFlowStage, MetricsFeed, SharedTwin};
use crate::metrics::AppMetrics;
use crate::services::DataSource;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn DataSource>,
    pub feed: Arc<MetricsFeed>,
    pub twin: SharedTwin,
    pub metrics: Arc<AppMetrics>,
    pub metrics_cache: Arc<Mutex<SnapshotCache<DashboardMetricsSnapshot>>>,
    pub flow_cache: Arc<Mutex<SnapshotCache<Vec<MaterialFlowStage>>>>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn DataSource>,
        feed: Arc<MetricsFeed>,
        twin: SharedTwin,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            source,
            feed,
            twin,
            metrics,
            metrics_cache: Arc::new(Mutex::new(SnapshotCache::new())),
            flow_cache: Arc::new(Mutex::new(SnapshotCache::new())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/materials", get(materials::list_materials))
        .route("/materials/:id", get(materials::get_material))
        .route("/materials/:id/status", patch(materials::update_status))
        .route("/materials/:id/verification", get(materials::verify_material))
        .route("/dashboard/metrics", get(dashboard::dashboard_metrics))
        .route("/dashboard/flow", get(dashboard::material_flow))
        .route("/analytics", get(analytics::analytics))
        .route(
            "/compliance/reports/:report_type",
            post(analytics::compliance_report),
        )
        .route("/feed", get(feed::feed_events))
        .route("/twin", get(twin::twin_state))
        .route("/twin/toggle", post(twin::toggle_twin))
        .route("/twin/reset", post(twin::reset_twin))
        .route("/twin/stages/:id", get(twin::twin_stage))
        .route("/metrics", get(render_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_http))
        .layer(cors)
        .with_state(state)
}

/// `GET /metrics`: Prometheus text exposition.
async fn render_metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|err| AppError::Parse(err.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .map_err(|err| AppError::Parse(err.to_string()))
}

/// Record request count and latency, labelled by the matched route.
async fn track_http(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let start = Instant::now();
    let response = next.run(request).await;

    state
        .metrics
        .http_request_duration
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();

    response
}
