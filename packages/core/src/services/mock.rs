//! Mock data source.
//!
//! Seeds a `MaterialLedgerStore` once at construction and serves it for
//! every read; metrics, flow and analytics values come from a seeded
//! `StdRng` shared behind a mutex. Nothing here touches the network, so no
//! operation ever fails with `AppError::Transport`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::feed::types::{DashboardMetricsSnapshot, MaterialFlowStage};
use crate::generator::{generate_flow, generate_materials, generate_metrics, GenerationPolicy};
use crate::ledger::{MaterialFilter, MaterialQuery, MaterialRecord, MaterialStatus};
use crate::services::analytics::{build_analytics, compliance_report, verification_for};
use crate::services::source::{DataSource, SourceResult};
use crate::services::types::{AnalyticsBundle, LedgerVerification, TimeRange};
use crate::store::MaterialLedgerStore;

pub struct MockDataSource {
    ledger: Arc<RwLock<MaterialLedgerStore>>,
    rng: Mutex<StdRng>,
    policy: GenerationPolicy,
}

impl MockDataSource {
    /// Generate `ledger_size` records and seed the ledger with them.
    /// `seed = None` draws the seed from OS entropy. An invalid `policy` is
    /// a `Config` error.
    pub fn seeded(
        policy: GenerationPolicy,
        ledger_size: usize,
        seed: Option<u64>,
    ) -> Result<Self, AppError> {
        policy.validate()?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let records = generate_materials(&mut rng, &policy, ledger_size, Utc::now());
        let store = MaterialLedgerStore::from_records(records)?;
        tracing::info!("Seeded material ledger with {} records", store.len());

        Ok(Self {
            ledger: Arc::new(RwLock::new(store)),
            rng: Mutex::new(rng),
            policy,
        })
    }

    /// Serve an existing store (used by tests and fixtures).
    pub fn with_store(store: MaterialLedgerStore, seed: u64) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(store)),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            policy: GenerationPolicy::default(),
        }
    }

    /// Shared handle on the underlying ledger.
    pub fn ledger(&self) -> Arc<RwLock<MaterialLedgerStore>> {
        self.ledger.clone()
    }

    /// Run `f` with the shared generator. The lock is never held across an await.
    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn list_materials(&self, filter: &MaterialFilter) -> SourceResult<Vec<MaterialRecord>> {
        let query = MaterialQuery::parse(filter)?;
        let store = self.ledger.read().await;
        Ok(store.list(&query))
    }

    async fn get_material(&self, id: &str) -> SourceResult<MaterialRecord> {
        self.ledger
            .read()
            .await
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Material {} not found", id)))
    }

    async fn update_material_status(
        &self,
        id: &str,
        status: MaterialStatus,
    ) -> SourceResult<MaterialRecord> {
        let updated = self.ledger.write().await.update_status(id, status)?;
        tracing::info!("Material {} moved to {}", id, status);
        Ok(updated)
    }

    async fn get_dashboard_metrics(&self) -> SourceResult<DashboardMetricsSnapshot> {
        Ok(self.with_rng(|rng| generate_metrics(rng, &self.policy.metrics)))
    }

    async fn get_material_flow(&self) -> SourceResult<Vec<MaterialFlowStage>> {
        Ok(self.with_rng(|rng| generate_flow(rng, &self.policy)))
    }

    async fn get_analytics_data(&self, range: TimeRange) -> SourceResult<AnalyticsBundle> {
        let store = self.ledger.read().await;
        let bundle = self.with_rng(|rng| {
            let flow = generate_flow(rng, &self.policy);
            build_analytics(rng, store.records(), &flow, range, Utc::now())
        });
        Ok(bundle)
    }

    async fn generate_compliance_report(&self, report_type: &str) -> SourceResult<Vec<u8>> {
        if report_type.trim().is_empty() {
            return Err(AppError::Validation("Report type must not be empty".into()));
        }
        let report = {
            let store = self.ledger.read().await;
            compliance_report(report_type, store.records(), Utc::now())
        };
        tracing::info!(
            "Generated {} report over {} materials",
            report_type,
            report.summary.total_materials
        );
        Ok(serde_json::to_vec_pretty(&report)?)
    }

    async fn verify_on_ledger(&self, material_id: &str) -> SourceResult<LedgerVerification> {
        let record = self.get_material(material_id).await?;
        Ok(verification_for(&record, Utc::now()))
    }

    fn source_name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::types::ComplianceReport;

    fn source(size: usize) -> MockDataSource {
        MockDataSource::seeded(GenerationPolicy::default(), size, Some(42)).unwrap()
    }

    #[test]
    fn invalid_policy_is_rejected_before_generation() {
        let policy = GenerationPolicy {
            quantity_kg: 5..=4,
            ..GenerationPolicy::default()
        };
        let err = MockDataSource::seeded(policy, 3, Some(1)).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn consecutive_reads_return_the_same_collection() {
        let source = source(10);
        let first = source.list_materials(&MaterialFilter::default()).await.unwrap();
        let second = source.list_materials(&MaterialFilter::default()).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_material_returns_not_found_for_unknown_id() {
        let source = source(3);
        assert_eq!(source.get_material("MAT002").await.unwrap().id, "MAT002");
        let err = source.get_material("MAT999").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_filter_is_rejected() {
        let source = source(3);
        let filter = MaterialFilter::default().material_type("Plutonium");
        let err = source.list_materials(&filter).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn status_update_is_visible_to_later_reads() {
        let source = source(3);
        source
            .update_material_status("MAT001", MaterialStatus::Shipped)
            .await
            .unwrap();
        let record = source.get_material("MAT001").await.unwrap();
        assert_eq!(record.status, MaterialStatus::Shipped);
    }

    #[tokio::test]
    async fn compliance_report_is_json_with_ledger_counts() {
        let source = source(8);
        let bytes = source.generate_compliance_report("EU Battery Passport").await.unwrap();
        let report: ComplianceReport = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report.report_type, "EU Battery Passport");
        assert_eq!(report.summary.total_materials, 8);
    }

    #[tokio::test]
    async fn empty_report_type_is_rejected() {
        let source = source(1);
        let err = source.generate_compliance_report("  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn verify_unknown_material_is_not_found() {
        let source = source(1);
        assert!(source.verify_on_ledger("MAT001").await.is_ok());
        assert!(matches!(
            source.verify_on_ledger("MAT404").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn analytics_distribution_sums_to_about_one_hundred() {
        let source = source(40);
        let bundle = source.get_analytics_data(TimeRange::Last7Days).await.unwrap();
        let d = &bundle.material_distribution;
        let total = d.cobalt + d.lithium + d.nickel + d.graphite + d.manganese;
        assert!((total - 100.0).abs() < 0.5, "total was {}", total);
    }
}
