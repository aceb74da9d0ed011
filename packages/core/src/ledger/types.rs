//! Core data types for the material ledger

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Compliance label for records that passed battery-passport verification.
pub const COMPLIANT_LABEL: &str = "EU Battery Passport Compliant";

/// Compliance label for records still awaiting a compliance decision.
pub const UNDER_REVIEW_LABEL: &str = "Under Review";

/// Raw material category tracked by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Cobalt,
    Lithium,
    Nickel,
    Graphite,
    Manganese,
}

impl MaterialType {
    pub const ALL: [MaterialType; 5] = [
        MaterialType::Cobalt,
        MaterialType::Lithium,
        MaterialType::Nickel,
        MaterialType::Graphite,
        MaterialType::Manganese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Cobalt => "Cobalt",
            MaterialType::Lithium => "Lithium",
            MaterialType::Nickel => "Nickel",
            MaterialType::Graphite => "Graphite",
            MaterialType::Manganese => "Manganese",
        }
    }

    /// Two-letter uppercase code used in batch numbers (`CO`, `LI`, ...).
    pub fn batch_prefix(&self) -> String {
        self.as_str().chars().take(2).collect::<String>().to_uppercase()
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown material type: {}", s)))
    }
}

/// Processing status of a material record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialStatus {
    #[serde(rename = "In Processing", alias = "InProcessing")]
    InProcessing,
    Assembled,
    #[serde(rename = "Quality Check", alias = "QualityCheck")]
    QualityCheck,
    Shipped,
    #[serde(rename = "Pending Verification", alias = "PendingVerification")]
    PendingVerification,
}

impl MaterialStatus {
    pub const ALL: [MaterialStatus; 5] = [
        MaterialStatus::InProcessing,
        MaterialStatus::Assembled,
        MaterialStatus::QualityCheck,
        MaterialStatus::Shipped,
        MaterialStatus::PendingVerification,
    ];

    /// Human-readable label, also the wire representation.
    pub fn label(&self) -> &'static str {
        match self {
            MaterialStatus::InProcessing => "In Processing",
            MaterialStatus::Assembled => "Assembled",
            MaterialStatus::QualityCheck => "Quality Check",
            MaterialStatus::Shipped => "Shipped",
            MaterialStatus::PendingVerification => "Pending Verification",
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            MaterialStatus::InProcessing => "InProcessing",
            MaterialStatus::Assembled => "Assembled",
            MaterialStatus::QualityCheck => "QualityCheck",
            MaterialStatus::Shipped => "Shipped",
            MaterialStatus::PendingVerification => "PendingVerification",
        }
    }
}

impl fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MaterialStatus {
    type Err = AppError;

    /// Accepts either the label (`"In Processing"`) or the identifier
    /// (`"InProcessing"`), exact case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialStatus::ALL
            .into_iter()
            .find(|status| status.label() == s || status.identifier() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown material status: {}", s)))
    }
}

/// One traceable unit of raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    pub id: String,
    pub material_type: MaterialType,
    pub origin: String,
    pub supplier: String,
    pub status: MaterialStatus,
    pub timestamp: DateTime<Utc>,
    pub compliance_label: String,
    pub location: String,
    pub batch_number: String,
    pub quantity_kg: u32,
    pub quality_score: u8,
}

impl MaterialRecord {
    /// Check the per-record invariants enforced on every ledger write.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::Validation("Material id must not be empty".into()));
        }
        if self.quality_score > 100 {
            return Err(AppError::Validation(format!(
                "Quality score {} for {} is outside 0-100",
                self.quality_score, self.id
            )));
        }
        if self.quantity_kg == 0 {
            return Err(AppError::Validation(format!(
                "Quantity for {} must be positive",
                self.id
            )));
        }
        if self.timestamp > now {
            return Err(AppError::Validation(format!(
                "Timestamp for {} is in the future: {}",
                self.id, self.timestamp
            )));
        }
        Ok(())
    }

    pub fn is_compliant(&self) -> bool {
        self.compliance_label == COMPLIANT_LABEL
    }
}
