//! Response types of the data-access contract

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Analytics window selected on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
}

impl TimeRange {
    pub fn code(&self) -> &'static str {
        match self {
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::Last90Days => "90d",
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Last7Days
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TimeRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(TimeRange::Last24Hours),
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "90d" => Ok(TimeRange::Last90Days),
            other => Err(AppError::Validation(format!(
                "Unsupported time range: {} (expected 24h, 7d, 30d or 90d)",
                other
            ))),
        }
    }
}

/// Labelled production series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionTrend {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

/// Percentage share of each material type in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDistribution {
    pub cobalt: f64,
    pub lithium: f64,
    pub nickel: f64,
    pub graphite: f64,
    pub manganese: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub average_score: f64,
    pub defect_rate: f64,
    pub rework_rate: f64,
    pub compliance_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckPrediction {
    pub stage: String,
    /// Likelihood in percent.
    pub probability: f64,
    pub impact: Impact,
    /// Expected delay in hours.
    pub estimated_delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBundle {
    pub time_range: TimeRange,
    pub production_trends: ProductionTrend,
    pub material_distribution: MaterialDistribution,
    pub quality_metrics: QualityMetrics,
    pub bottleneck_predictions: Vec<BottleneckPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub total_materials: usize,
    pub compliant_materials: usize,
    pub pending_verification: usize,
    pub non_compliant: usize,
}

/// Body of a generated compliance report artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub report_type: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ComplianceSummary,
    pub details: String,
}

/// Outcome of a distributed-ledger verification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerVerification {
    pub material_id: String,
    pub verified: bool,
    pub block_hash: String,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
}
