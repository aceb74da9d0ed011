//! In-memory material ledger store.
//!
//! `MaterialLedgerStore` holds the canonical collection of `MaterialRecord`
//! values in insertion order, with a side index from id to position so
//! lookups do not scan. Records are never mutated in place once handed out:
//! queries return clones, and `update_status` replaces the stored value.
//!
//! The store itself has no interior locking; callers wrap it in
//! `Arc<RwLock<MaterialLedgerStore>>` so it can be shared between the feed
//! tasks and the Axum handlers.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::AppError;
use crate::ledger::{MaterialQuery, MaterialRecord, MaterialStatus};

/// Insertion-ordered, id-unique collection of material records.
#[derive(Debug, Default)]
pub struct MaterialLedgerStore {
    records: Vec<MaterialRecord>,
    index: HashMap<String, usize>,
}

impl MaterialLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a batch, rejecting the whole batch on the first
    /// invalid or duplicate record.
    pub fn from_records(records: Vec<MaterialRecord>) -> Result<Self, AppError> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Append a record. Id uniqueness is enforced here, at write time.
    pub fn insert(&mut self, record: MaterialRecord) -> Result<(), AppError> {
        record.validate(Utc::now())?;
        if self.index.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "Material {} already exists",
                record.id
            )));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Return all records matching `query`, in insertion order.
    pub fn list(&self, query: &MaterialQuery) -> Vec<MaterialRecord> {
        if query.is_unconstrained() {
            return self.records.clone();
        }
        self.records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect()
    }

    /// Exact-id lookup.
    pub fn get(&self, id: &str) -> Option<MaterialRecord> {
        self.index.get(id).map(|&pos| self.records[pos].clone())
    }

    /// Replace the stored record for `id` with a copy carrying `status`
    /// and a fresh timestamp. Returns the new value.
    pub fn update_status(
        &mut self,
        id: &str,
        status: MaterialStatus,
    ) -> Result<MaterialRecord, AppError> {
        let pos = *self
            .index
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Material {} not found", id)))?;

        let updated = MaterialRecord {
            status,
            timestamp: Utc::now(),
            ..self.records[pos].clone()
        };
        self.records[pos] = updated.clone();
        Ok(updated)
    }

    /// Borrow every record, in insertion order.
    pub fn records(&self) -> &[MaterialRecord] {
        &self.records
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when the store contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
