//! Analytics, compliance and verification builders.
//!
//! Everything here is a pure function of the ledger contents, the flow
//! stages and an injected `Rng`, so the mock backend stays a thin shell
//! around its locks.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::feed::types::{MaterialFlowStage, StageHealth};
use crate::ledger::{MaterialRecord, MaterialStatus, MaterialType};
use crate::services::types::{
    AnalyticsBundle, BottleneckPrediction, ComplianceReport, ComplianceSummary, Impact,
    LedgerVerification, MaterialDistribution, ProductionTrend, QualityMetrics, TimeRange,
};

/// Units produced per trend bucket.
const BUCKET_OUTPUT: RangeInclusive<u32> = 800..=1200;
const DEFECT_RATE: RangeInclusive<f64> = 0.5..=2.5;
const REWORK_RATE: RangeInclusive<f64> = 1.0..=4.0;

pub fn build_analytics<R: Rng + ?Sized>(
    rng: &mut R,
    records: &[MaterialRecord],
    flow: &[MaterialFlowStage],
    range: TimeRange,
    now: DateTime<Utc>,
) -> AnalyticsBundle {
    AnalyticsBundle {
        time_range: range,
        production_trends: production_trend(rng, range, now),
        material_distribution: material_distribution(records),
        quality_metrics: quality_metrics(rng, records),
        bottleneck_predictions: bottleneck_predictions(rng, flow),
    }
}

/// One labelled bucket per trend step: 4h slots for 24h, days for 7d,
/// weeks for 30d, months for 90d.
pub fn trend_labels(range: TimeRange, now: DateTime<Utc>) -> Vec<String> {
    match range {
        TimeRange::Last24Hours => (0..6).map(|i| format!("{:02}:00", i * 4)).collect(),
        TimeRange::Last7Days => (0..7)
            .rev()
            .map(|days_ago| (now - Duration::days(days_ago)).format("%b %d").to_string())
            .collect(),
        TimeRange::Last30Days => (1..=4).map(|w| format!("W{}", w)).collect(),
        TimeRange::Last90Days => (1..=3).map(|m| format!("M{}", m)).collect(),
    }
}

fn production_trend<R: Rng + ?Sized>(
    rng: &mut R,
    range: TimeRange,
    now: DateTime<Utc>,
) -> ProductionTrend {
    let labels = trend_labels(range, now);
    let values = labels
        .iter()
        .map(|_| rng.gen_range(BUCKET_OUTPUT))
        .collect();
    ProductionTrend { labels, values }
}

/// Percentage share of each type, rounded to one decimal. All zero when
/// the ledger is empty.
pub fn material_distribution(records: &[MaterialRecord]) -> MaterialDistribution {
    let share = |material_type: MaterialType| {
        if records.is_empty() {
            return 0.0;
        }
        let n = records
            .iter()
            .filter(|r| r.material_type == material_type)
            .count();
        round1(n as f64 * 100.0 / records.len() as f64)
    };

    MaterialDistribution {
        cobalt: share(MaterialType::Cobalt),
        lithium: share(MaterialType::Lithium),
        nickel: share(MaterialType::Nickel),
        graphite: share(MaterialType::Graphite),
        manganese: share(MaterialType::Manganese),
    }
}

fn quality_metrics<R: Rng + ?Sized>(rng: &mut R, records: &[MaterialRecord]) -> QualityMetrics {
    let (average_score, compliance_rate) = if records.is_empty() {
        (0.0, 0.0)
    } else {
        let total: u32 = records.iter().map(|r| u32::from(r.quality_score)).sum();
        let compliant = records.iter().filter(|r| r.is_compliant()).count();
        (
            round1(f64::from(total) / records.len() as f64),
            round1(compliant as f64 * 100.0 / records.len() as f64),
        )
    };

    QualityMetrics {
        average_score,
        defect_rate: round1(rng.gen_range(DEFECT_RATE)),
        rework_rate: round1(rng.gen_range(REWORK_RATE)),
        compliance_rate,
    }
}

/// One prediction per stage; stage health drives probability, impact and delay.
pub fn bottleneck_predictions<R: Rng + ?Sized>(
    rng: &mut R,
    flow: &[MaterialFlowStage],
) -> Vec<BottleneckPrediction> {
    flow.iter()
        .map(|stage| {
            let (probability, impact, delay) = match stage.status {
                StageHealth::Critical => (70.0..=95.0, Impact::High, 4.0..=12.0),
                StageHealth::Warning => (40.0..=69.0, Impact::Medium, 1.0..=4.0),
                StageHealth::Normal => (5.0..=39.0, Impact::Low, 0.0..=1.0),
            };
            BottleneckPrediction {
                stage: stage.stage.clone(),
                probability: round1(rng.gen_range(probability)),
                impact,
                estimated_delay: round1(rng.gen_range(delay)),
            }
        })
        .collect()
}

/// Count compliant, pending and non-compliant records.
///
/// Pending means the record is awaiting verification and has not yet been
/// labelled compliant; everything not compliant and not pending is
/// non-compliant.
pub fn compliance_summary(records: &[MaterialRecord]) -> ComplianceSummary {
    let compliant = records.iter().filter(|r| r.is_compliant()).count();
    let pending = records
        .iter()
        .filter(|r| !r.is_compliant() && r.status == MaterialStatus::PendingVerification)
        .count();

    ComplianceSummary {
        total_materials: records.len(),
        compliant_materials: compliant,
        pending_verification: pending,
        non_compliant: records.len() - compliant - pending,
    }
}

pub fn compliance_report(
    report_type: &str,
    records: &[MaterialRecord],
    now: DateTime<Utc>,
) -> ComplianceReport {
    let summary = compliance_summary(records);
    let details = format!(
        "{} of {} materials carry a compliant battery passport label",
        summary.compliant_materials, summary.total_materials
    );
    ComplianceReport {
        report_type: report_type.to_string(),
        generated_at: now,
        summary,
        details,
    }
}

/// Deterministic pseudo-anchor for a record. The block hash is the
/// SHA-256 of the record content, so the same content yields the same
/// block hash and transaction id across processes and builds.
pub fn verification_for(record: &MaterialRecord, now: DateTime<Utc>) -> LedgerVerification {
    let digest = content_digest(record);
    let block_hash = hex::encode(digest);
    let transaction_id = {
        let mut hasher = Sha256::new();
        hasher.update(b"tx:");
        hasher.update(digest);
        format!("0x{}", hex::encode(&hasher.finalize()[..8]))
    };

    LedgerVerification {
        material_id: record.id.clone(),
        verified: record.is_compliant(),
        block_hash,
        timestamp: now,
        transaction_id,
    }
}

fn content_digest(record: &MaterialRecord) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for field in [
        record.id.as_str(),
        record.batch_number.as_str(),
        record.supplier.as_str(),
        record.origin.as_str(),
        record.status.label(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(record.timestamp.timestamp_millis().to_le_bytes());

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::generator::{generate_flow, GenerationPolicy};
    use crate::ledger::{COMPLIANT_LABEL, UNDER_REVIEW_LABEL};

    fn record(id: &str, material_type: MaterialType, status: MaterialStatus, label: &str) -> MaterialRecord {
        MaterialRecord {
            id: id.to_string(),
            material_type,
            origin: "Canada Mine V".to_string(),
            supplier: "Supplier E".to_string(),
            status,
            timestamp: Utc::now(),
            compliance_label: label.to_string(),
            location: "Receiving Dock".to_string(),
            batch_number: format!("{}-2025-001", material_type.batch_prefix()),
            quantity_kg: 450,
            quality_score: 88,
        }
    }

    #[test]
    fn labels_match_range_granularity() {
        let now = Utc::now();
        assert_eq!(trend_labels(TimeRange::Last24Hours, now).len(), 6);
        assert_eq!(trend_labels(TimeRange::Last7Days, now).len(), 7);
        assert_eq!(trend_labels(TimeRange::Last30Days, now), ["W1", "W2", "W3", "W4"]);
        assert_eq!(trend_labels(TimeRange::Last90Days, now), ["M1", "M2", "M3"]);
    }

    #[test]
    fn seven_day_labels_end_today() {
        let now = Utc::now();
        let labels = trend_labels(TimeRange::Last7Days, now);
        assert_eq!(labels.last().unwrap(), &now.format("%b %d").to_string());
    }

    #[test]
    fn distribution_reflects_ledger_shares() {
        let records = vec![
            record("MAT001", MaterialType::Cobalt, MaterialStatus::Shipped, COMPLIANT_LABEL),
            record("MAT002", MaterialType::Cobalt, MaterialStatus::Shipped, COMPLIANT_LABEL),
            record("MAT003", MaterialType::Lithium, MaterialStatus::Shipped, COMPLIANT_LABEL),
            record("MAT004", MaterialType::Nickel, MaterialStatus::Shipped, COMPLIANT_LABEL),
        ];
        let d = material_distribution(&records);
        assert_eq!(d.cobalt, 50.0);
        assert_eq!(d.lithium, 25.0);
        assert_eq!(d.nickel, 25.0);
        assert_eq!(d.graphite, 0.0);
    }

    #[test]
    fn distribution_of_empty_ledger_is_zero() {
        let d = material_distribution(&[]);
        assert_eq!(d.cobalt + d.lithium + d.nickel + d.graphite + d.manganese, 0.0);
    }

    #[test]
    fn compliance_summary_partitions_records() {
        let records = vec![
            record("MAT001", MaterialType::Cobalt, MaterialStatus::InProcessing, COMPLIANT_LABEL),
            record("MAT002", MaterialType::Lithium, MaterialStatus::Assembled, UNDER_REVIEW_LABEL),
            record("MAT003", MaterialType::Cobalt, MaterialStatus::PendingVerification, UNDER_REVIEW_LABEL),
        ];
        let s = compliance_summary(&records);
        assert_eq!(s.total_materials, 3);
        assert_eq!(s.compliant_materials, 1);
        assert_eq!(s.pending_verification, 1);
        assert_eq!(s.non_compliant, 1);
    }

    #[test]
    fn bottleneck_impact_follows_stage_health() {
        let mut rng = StdRng::seed_from_u64(9);
        let flow = vec![
            MaterialFlowStage { stage: "Battery Assembly".into(), count: 10, status: StageHealth::Critical },
            MaterialFlowStage { stage: "Final Packaging".into(), count: 3, status: StageHealth::Normal },
        ];
        let predictions = bottleneck_predictions(&mut rng, &flow);
        assert_eq!(predictions[0].impact, Impact::High);
        assert!(predictions[0].probability >= 70.0);
        assert_eq!(predictions[1].impact, Impact::Low);
        assert!(predictions[1].probability < 40.0);
    }

    #[test]
    fn analytics_bundle_has_one_prediction_per_stage() {
        let mut rng = StdRng::seed_from_u64(1);
        let flow = generate_flow(&mut rng, &GenerationPolicy::default());
        let bundle = build_analytics(&mut rng, &[], &flow, TimeRange::Last24Hours, Utc::now());
        assert_eq!(bundle.bottleneck_predictions.len(), flow.len());
        assert_eq!(bundle.production_trends.values.len(), 6);
        assert_eq!(bundle.quality_metrics.average_score, 0.0);
    }

    #[test]
    fn verification_is_deterministic_for_same_record() {
        let r = record("MAT001", MaterialType::Cobalt, MaterialStatus::Shipped, COMPLIANT_LABEL);
        let a = verification_for(&r, Utc::now());
        let b = verification_for(&r, Utc::now());
        assert_eq!(a.block_hash, b.block_hash);
        assert_eq!(a.transaction_id, b.transaction_id);
        assert_eq!(a.block_hash.len(), 64);
        assert!(a.verified);
    }

    #[test]
    fn block_hash_is_sha256_of_record_content() {
        let mut r = record("MAT001", MaterialType::Cobalt, MaterialStatus::Shipped, COMPLIANT_LABEL);
        r.timestamp = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let v = verification_for(&r, Utc::now());
        assert_eq!(
            v.block_hash,
            "1799fc8afda7fa80bd4e3363f2579af54db20fb3c33d3f80289e23f82c5972dd"
        );
        assert_eq!(v.transaction_id, "0xeb6bb4dd19b39edb");
    }

    #[test]
    fn status_change_changes_block_hash() {
        let a = record("MAT001", MaterialType::Cobalt, MaterialStatus::Shipped, COMPLIANT_LABEL);
        let mut b = a.clone();
        b.status = MaterialStatus::Assembled;
        assert_ne!(
            verification_for(&a, Utc::now()).block_hash,
            verification_for(&b, Utc::now()).block_hash
        );
    }

    #[test]
    fn record_under_review_is_not_verified() {
        let r = record("MAT002", MaterialType::Lithium, MaterialStatus::Assembled, UNDER_REVIEW_LABEL);
        assert!(!verification_for(&r, Utc::now()).verified);
    }
}
