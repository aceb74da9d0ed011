//! Snapshot types pushed by the metrics feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate production KPIs at a point in time. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetricsSnapshot {
    pub ethical_sourcing_pct: f64,
    pub production_efficiency_pct: f64,
    pub defect_rate_pct: f64,
    pub active_materials_count: u32,
    pub completed_batches_count: u32,
    pub pending_shipments_count: u32,
}

/// Health of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageHealth {
    Normal,
    Warning,
    Critical,
}

/// A named pipeline stage with its current occupancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFlowStage {
    pub stage: String,
    pub count: u32,
    pub status: StageHealth,
}

/// One feed delivery: a metrics snapshot plus the flow stages produced with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedUpdate {
    /// Per-subscription tick counter, starting at 1.
    pub sequence: u64,
    pub metrics: DashboardMetricsSnapshot,
    pub flow: Vec<MaterialFlowStage>,
    pub produced_at: DateTime<Utc>,
}
