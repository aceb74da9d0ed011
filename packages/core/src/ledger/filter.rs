//! Material query filters.
//!
//! `MaterialFilter` is the raw, caller-facing shape (every field optional,
//! `"all"` meaning unconstrained). It is validated into a `MaterialQuery`
//! before it touches the store, so malformed values surface as
//! `AppError::Validation` instead of silently matching nothing.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ledger::types::{MaterialRecord, MaterialStatus, MaterialType};

/// Sentinel meaning "no constraint on this field".
pub const ALL: &str = "all";

/// Raw filter options as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub material_type: Option<String>,
    pub supplier: Option<String>,
}

impl MaterialFilter {
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn material_type(mut self, material_type: impl Into<String>) -> Self {
        self.material_type = Some(material_type.into());
        self
    }

    pub fn supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }
}

/// Validated query. Every constraint composes with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialQuery {
    /// Lowercased search needle.
    search: Option<String>,
    status: Option<MaterialStatus>,
    material_type: Option<MaterialType>,
    supplier: Option<String>,
}

impl MaterialQuery {
    pub fn parse(filter: &MaterialFilter) -> Result<Self, AppError> {
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let status = constrained(filter.status.as_deref())
            .map(str::parse::<MaterialStatus>)
            .transpose()?;

        let material_type = constrained(filter.material_type.as_deref())
            .map(str::parse::<MaterialType>)
            .transpose()?;

        let supplier = constrained(filter.supplier.as_deref()).map(str::to_string);

        Ok(Self {
            search,
            status,
            material_type,
            supplier,
        })
    }

    /// `true` when the query places no constraint on any field.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &MaterialRecord) -> bool {
        if let Some(needle) = &self.search {
            let hit = [
                record.id.as_str(),
                record.material_type.as_str(),
                record.supplier.as_str(),
                record.origin.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }

        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }

        if self.material_type.is_some_and(|t| t != record.material_type) {
            return false;
        }

        match &self.supplier {
            Some(supplier) => *supplier == record.supplier,
            None => true,
        }
    }
}

fn constrained(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ALL)
}
