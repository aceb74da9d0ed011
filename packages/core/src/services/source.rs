//! Data Source Interface
//!
//! The data-access contract every backend (mock or real) implements. The
//! HTTP layer and the metrics feed only ever see `Arc<dyn DataSource>`.

use async_trait::async_trait;

use crate::error::AppError;
use crate::feed::types::{DashboardMetricsSnapshot, MaterialFlowStage};
use crate::ledger::{MaterialFilter, MaterialRecord, MaterialStatus};
use crate::services::types::{AnalyticsBundle, LedgerVerification, TimeRange};

/// Result type for data source operations
pub type SourceResult<T> = Result<T, AppError>;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Records matching `filter`, in ledger order.
    async fn list_materials(&self, filter: &MaterialFilter) -> SourceResult<Vec<MaterialRecord>>;

    /// Exact-id lookup; `AppError::NotFound` when absent.
    async fn get_material(&self, id: &str) -> SourceResult<MaterialRecord>;

    /// Explicit write: move a record to `status`.
    async fn update_material_status(
        &self,
        id: &str,
        status: MaterialStatus,
    ) -> SourceResult<MaterialRecord>;

    async fn get_dashboard_metrics(&self) -> SourceResult<DashboardMetricsSnapshot>;

    async fn get_material_flow(&self) -> SourceResult<Vec<MaterialFlowStage>>;

    async fn get_analytics_data(&self, range: TimeRange) -> SourceResult<AnalyticsBundle>;

    /// Serialized report artifact (JSON bytes).
    async fn generate_compliance_report(&self, report_type: &str) -> SourceResult<Vec<u8>>;

    async fn verify_on_ledger(&self, material_id: &str) -> SourceResult<LedgerVerification>;

    /// Get the name of this source for logging/debugging
    fn source_name(&self) -> &str;
}
