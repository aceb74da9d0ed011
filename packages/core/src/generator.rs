//! Synthetic data generation.
//!
//! The shape of every generated value is fixed by a `GenerationPolicy`
//! (pure data: enumerations and ranges); the values come from a caller
//! supplied `Rng`, so a seeded `StdRng` makes every output reproducible.
//! A policy that passes [`GenerationPolicy::validate`] keeps every value in
//! range by construction, so generation from it cannot fail.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::AppError;
use crate::feed::types::{DashboardMetricsSnapshot, MaterialFlowStage, StageHealth};
use crate::ledger::{
    MaterialRecord, MaterialStatus, MaterialType, COMPLIANT_LABEL, UNDER_REVIEW_LABEL,
};

/// Enumerations and ranges driving the mock generators.
#[derive(Debug, Clone)]
pub struct GenerationPolicy {
    pub id_prefix: &'static str,
    pub batch_year: u16,
    pub origins: Vec<&'static str>,
    pub suppliers: Vec<&'static str>,
    pub locations: Vec<&'static str>,
    /// Records are stamped within this window before `now`.
    pub max_age: Duration,
    /// Probability of the compliant label; otherwise the record is under review.
    pub compliant_ratio: f64,
    pub quantity_kg: RangeInclusive<u32>,
    pub quality_score: RangeInclusive<u8>,
    pub metrics: MetricsRanges,
    pub flow_stages: Vec<&'static str>,
    pub stage_count: RangeInclusive<u32>,
    /// Cumulative thresholds for warning and critical stage health.
    pub warning_ratio: f64,
    pub critical_ratio: f64,
}

/// Per-field ranges for metrics snapshots.
#[derive(Debug, Clone)]
pub struct MetricsRanges {
    pub ethical_sourcing_pct: RangeInclusive<f64>,
    pub production_efficiency_pct: RangeInclusive<f64>,
    pub defect_rate_pct: RangeInclusive<f64>,
    pub active_materials: RangeInclusive<u32>,
    pub completed_batches: RangeInclusive<u32>,
    pub pending_shipments: RangeInclusive<u32>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            id_prefix: "MAT",
            batch_year: 2025,
            origins: vec![
                "DRC Mine X",
                "Chile Mine Y",
                "Indonesia Mine Z",
                "China Mine W",
                "Canada Mine V",
                "Australia Mine U",
            ],
            suppliers: vec![
                "Supplier A",
                "Supplier B",
                "Supplier C",
                "Supplier D",
                "Supplier E",
                "Supplier F",
            ],
            locations: vec![
                "Processing Plant Alpha",
                "Assembly Line 3",
                "Quality Lab 1",
                "Warehouse B",
                "Receiving Dock",
                "Shipping Bay 2",
            ],
            max_age: Duration::days(7),
            compliant_ratio: 0.8,
            quantity_kg: 200..=999,
            quality_score: 80..=99,
            metrics: MetricsRanges::default(),
            flow_stages: vec![
                "Raw Material Intake",
                "Material Processing",
                "Quality Verification",
                "Battery Assembly",
                "Final Packaging",
            ],
            stage_count: 0..=199,
            warning_ratio: 0.2,
            critical_ratio: 0.1,
        }
    }
}

impl Default for MetricsRanges {
    fn default() -> Self {
        Self {
            ethical_sourcing_pct: 95.0..=99.0,
            production_efficiency_pct: 85.0..=95.0,
            defect_rate_pct: 0.5..=2.5,
            active_materials: 1000..=1499,
            completed_batches: 80..=119,
            pending_shipments: 10..=39,
        }
    }
}

impl GenerationPolicy {
    /// Reject policies the generators cannot draw from: empty lists,
    /// probabilities outside `[0, 1]`, empty ranges, and ranges that would
    /// produce records failing ledger validation.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, list) in [
            ("origins", &self.origins),
            ("suppliers", &self.suppliers),
            ("locations", &self.locations),
            ("flow_stages", &self.flow_stages),
        ] {
            if list.is_empty() {
                return Err(invalid(format!("{} must not be empty", name)));
            }
        }

        for (name, ratio) in [
            ("compliant_ratio", self.compliant_ratio),
            ("warning_ratio", self.warning_ratio),
            ("critical_ratio", self.critical_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(format!("{} must be within [0, 1], got {}", name, ratio)));
            }
        }
        if self.warning_ratio + self.critical_ratio > 1.0 {
            return Err(invalid("warning_ratio + critical_ratio must not exceed 1".into()));
        }

        if self.max_age < Duration::zero() {
            return Err(invalid("max_age must not be negative".into()));
        }
        check_range("quantity_kg", &self.quantity_kg)?;
        if *self.quantity_kg.start() == 0 {
            return Err(invalid("quantity_kg must start above zero".into()));
        }
        check_range("quality_score", &self.quality_score)?;
        if *self.quality_score.end() > 100 {
            return Err(invalid("quality_score must not exceed 100".into()));
        }
        check_range("stage_count", &self.stage_count)?;

        self.metrics.validate()
    }
}

impl MetricsRanges {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, range) in [
            ("ethical_sourcing_pct", &self.ethical_sourcing_pct),
            ("production_efficiency_pct", &self.production_efficiency_pct),
            ("defect_rate_pct", &self.defect_rate_pct),
        ] {
            if !range.start().is_finite() || !range.end().is_finite() {
                return Err(invalid(format!("{} bounds must be finite", name)));
            }
            check_range(name, range)?;
        }
        check_range("active_materials", &self.active_materials)?;
        check_range("completed_batches", &self.completed_batches)?;
        check_range("pending_shipments", &self.pending_shipments)
    }
}

fn check_range<T: PartialOrd + std::fmt::Debug>(
    name: &str,
    range: &RangeInclusive<T>,
) -> Result<(), AppError> {
    if range.start() > range.end() {
        return Err(invalid(format!("{} range {:?} is empty", name, range)));
    }
    Ok(())
}

fn invalid(message: String) -> AppError {
    AppError::Config(format!("Invalid generation policy: {}", message))
}

/// Generate `count` material records with ids `MAT001..`.
pub fn generate_materials<R: Rng + ?Sized>(
    rng: &mut R,
    policy: &GenerationPolicy,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<MaterialRecord> {
    (1..=count)
        .map(|seq| generate_material(rng, policy, seq, now))
        .collect()
}

/// Generate the record at sequence index `seq` (1-based).
pub fn generate_material<R: Rng + ?Sized>(
    rng: &mut R,
    policy: &GenerationPolicy,
    seq: usize,
    now: DateTime<Utc>,
) -> MaterialRecord {
    let material_type = pick_variant(rng, &MaterialType::ALL);
    let status = pick_variant(rng, &MaterialStatus::ALL);
    let age_seconds = rng.gen_range(0..=policy.max_age.num_seconds().max(0));
    let compliance_label = if rng.gen_bool(policy.compliant_ratio) {
        COMPLIANT_LABEL
    } else {
        UNDER_REVIEW_LABEL
    };

    MaterialRecord {
        id: format!("{}{:03}", policy.id_prefix, seq),
        material_type,
        origin: pick(rng, &policy.origins).to_string(),
        supplier: pick(rng, &policy.suppliers).to_string(),
        status,
        timestamp: now - Duration::seconds(age_seconds),
        compliance_label: compliance_label.to_string(),
        location: pick(rng, &policy.locations).to_string(),
        batch_number: format!(
            "{}-{}-{:03}",
            material_type.batch_prefix(),
            policy.batch_year,
            seq
        ),
        quantity_kg: rng.gen_range(policy.quantity_kg.clone()),
        quality_score: rng.gen_range(policy.quality_score.clone()),
    }
}

/// Generate one metrics snapshot. Independent of ledger content.
pub fn generate_metrics<R: Rng + ?Sized>(
    rng: &mut R,
    ranges: &MetricsRanges,
) -> DashboardMetricsSnapshot {
    DashboardMetricsSnapshot {
        ethical_sourcing_pct: round1(rng.gen_range(ranges.ethical_sourcing_pct.clone())),
        production_efficiency_pct: round1(rng.gen_range(ranges.production_efficiency_pct.clone())),
        defect_rate_pct: round1(rng.gen_range(ranges.defect_rate_pct.clone())),
        active_materials_count: rng.gen_range(ranges.active_materials.clone()),
        completed_batches_count: rng.gen_range(ranges.completed_batches.clone()),
        pending_shipments_count: rng.gen_range(ranges.pending_shipments.clone()),
    }
}

/// Generate one entry per configured flow stage, in pipeline order.
pub fn generate_flow<R: Rng + ?Sized>(
    rng: &mut R,
    policy: &GenerationPolicy,
) -> Vec<MaterialFlowStage> {
    policy
        .flow_stages
        .iter()
        .map(|stage| {
            let roll: f64 = rng.gen();
            let status = if roll < policy.critical_ratio {
                StageHealth::Critical
            } else if roll < policy.critical_ratio + policy.warning_ratio {
                StageHealth::Warning
            } else {
                StageHealth::Normal
            };
            MaterialFlowStage {
                stage: stage.to_string(),
                count: rng.gen_range(policy.stage_count.clone()),
                status,
            }
        })
        .collect()
}

/// Policy lists are non-empty once validated; an unvalidated empty list
/// yields the type's default instead of panicking.
fn pick<R: Rng + ?Sized, T: Copy + Default>(rng: &mut R, options: &[T]) -> T {
    options.choose(rng).copied().unwrap_or_default()
}

fn pick_variant<R: Rng + ?Sized, T: Copy, const N: usize>(rng: &mut R, variants: &[T; N]) -> T {
    variants[rng.gen_range(0..N)]
}

/// Round to one decimal place; rounding never leaves the source range
/// because every range bound is itself a one-decimal value.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
