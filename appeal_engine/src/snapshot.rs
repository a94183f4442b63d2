//! # Report content snapshot
//!
//! The snapshot is the fully denormalised document a renderer consumes. It is built purely from persisted data (the
//! order, its precheck, and the precheck's property), so no external call is needed to produce or re-render a report.
//! Once written to a report it is never modified.
use chrono::{DateTime, Utc};
use property_data::{ComparableSale, County, DataSourceTag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{
        EligibilityFactor,
        Order,
        Precheck,
        PrecheckDecision,
        Property,
        ReportId,
        RulePackId,
        PDF_VERSION,
        TEMPLATE_VERSION,
    },
    eligibility::sort_comps,
    legal::SnapshotLegal,
    recommendation::{generate_recommendation, Recommendation},
};

#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    #[error("Unknown disclaimer version: {0}")]
    UnknownDisclaimer(String),
    #[error("Order {order} was not placed for precheck {precheck}")]
    PrecheckMismatch { order: String, precheck: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub meta: SnapshotMeta,
    pub property: SnapshotProperty,
    pub assessment: SnapshotAssessment,
    pub analysis: SnapshotAnalysis,
    pub comps: Vec<ComparableSale>,
    pub recommendation: Recommendation,
    pub legal: SnapshotLegal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub report_id: ReportId,
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    pub template_version: String,
    pub rule_pack_id: RulePackId,
    pub disclaimer_version: String,
    pub data_sources: Vec<DataSourceTag>,
    pub pdf_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProperty {
    pub formatted_address: String,
    pub place_id: String,
    pub county: County,
    pub beds: i32,
    pub baths: f64,
    pub sqft: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessed_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAnalysis {
    pub decision: PrecheckDecision,
    pub confidence: f64,
    pub factors: Vec<EligibilityFactor>,
    pub metrics: SnapshotMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub comps_used_count: usize,
    pub comps_lower_count: usize,
    pub comps_lower_ratio: f64,
    pub best_lower_comp_gap: f64,
}

pub fn build_snapshot(
    report_id: &ReportId,
    generated_at: DateTime<Utc>,
    order: &Order,
    precheck: &Precheck,
    property: &Property,
) -> Result<ReportSnapshot, SnapshotError> {
    if order.precheck_id != precheck.id {
        return Err(SnapshotError::PrecheckMismatch { order: order.id.to_string(), precheck: precheck.id.to_string() });
    }
    let legal = SnapshotLegal::new(order.legal_accepted_at, &order.disclaimer_version)
        .ok_or_else(|| SnapshotError::UnknownDisclaimer(order.disclaimer_version.clone()))?;
    let metadata = &precheck.metadata.0;
    let facts = &metadata.property_data;
    let metrics = &precheck.metrics.0;

    let mut comps = metadata.comps_used.clone();
    sort_comps(&mut comps);

    let meta = SnapshotMeta {
        report_id: report_id.clone(),
        generated_at,
        engine_version: precheck.engine_version.clone(),
        template_version: TEMPLATE_VERSION.to_string(),
        rule_pack_id: precheck.rule_pack_id.clone(),
        disclaimer_version: order.disclaimer_version.clone(),
        data_sources: vec![metadata.data_source],
        pdf_version: PDF_VERSION.to_string(),
    };
    let property = SnapshotProperty {
        formatted_address: property.formatted_address.clone(),
        place_id: property.place_id.clone(),
        county: facts.county,
        beds: facts.beds.unwrap_or_default(),
        baths: facts.baths.unwrap_or_default(),
        sqft: facts.sqft.unwrap_or_default(),
        year_built: facts.year_built,
    };
    let assessment = SnapshotAssessment {
        assessed_value: facts.assessed_value,
        assessment_year: facts.assessment_year,
        parcel_id: facts.parcel_id.clone(),
    };
    let analysis = SnapshotAnalysis {
        decision: precheck.decision,
        confidence: precheck.confidence,
        factors: precheck.factors.0.clone(),
        metrics: SnapshotMetrics {
            comps_used_count: metrics.comps_used_count,
            comps_lower_count: metrics.comps_lower_count,
            comps_lower_ratio: metrics.comps_lower_ratio,
            best_lower_comp_gap: metrics.best_lower_comp_gap,
        },
    };
    let recommendation = generate_recommendation(precheck.decision, metrics);
    Ok(ReportSnapshot { meta, property, assessment, analysis, comps, recommendation, legal })
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use property_data::FixtureProvider;
    use sqlx::types::Json;

    use super::*;
    use crate::{
        db_types::{
            EligibilityMetrics,
            OrderId,
            OrderStatusType,
            PrecheckId,
            PrecheckMetadata,
            PropertyId,
            RuleConfig,
            SnapshotConfig,
            ENGINE_VERSION,
        },
        eligibility::{compute_eligibility, EligibilityInput},
    };

    fn fixtures() -> (Order, Precheck, Property) {
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let data = FixtureProvider.fetch_as_of(today);
        let rules = RuleConfig::default();
        let input = EligibilityInput {
            assessed_value: 450_000,
            comps: &data.comps,
            address_quality_score: 95,
            has_property_data_conflict: false,
            rules: &rules,
            today,
        };
        let result = compute_eligibility(&input);
        let now = Utc::now();
        let property = Property {
            id: PropertyId::from("prop-1"),
            place_id: "place-1".into(),
            formatted_address: "1 Test Ln, Levittown, NY 11756".into(),
            street_number: None,
            route: None,
            locality: None,
            postal_code: None,
            country: None,
            unit_number: None,
            lat: 40.72,
            lng: -73.51,
            address_quality_score: 95,
            created_at: now,
        };
        let precheck = Precheck {
            id: PrecheckId::from("pc-1"),
            user_id: "alice".into(),
            property_id: property.id.clone(),
            decision: result.decision,
            confidence: result.confidence,
            factors: Json(result.factors),
            metrics: Json(result.metrics.clone()),
            snapshot_config: Json(SnapshotConfig {
                rule_pack_id: RulePackId::from("rp-1"),
                rule_pack_version: 1,
                min_comps: 3,
                min_lower_comps: 2,
                outlier_low_factor: 0.5,
                outlier_high_factor: 1.5,
                max_comp_age_months: 12,
            }),
            rule_pack_id: RulePackId::from("rp-1"),
            metadata: Json(PrecheckMetadata {
                data_source: data.source,
                comps_raw_count: data.comps.len(),
                comps: data.comps.clone(),
                comps_used: result.comps,
                property_data: data.property,
            }),
            explanation: result.explanation,
            engine_version: ENGINE_VERSION.into(),
            confirmed_by_user: false,
            created_at: now,
        };
        let order = Order {
            id: OrderId::from("order-1"),
            user_id: "alice".into(),
            precheck_id: precheck.id.clone(),
            payment_ref: Some("pay_1".into()),
            idempotency_key: "key".into(),
            status: OrderStatusType::Processing,
            legal_accepted_at: now,
            disclaimer_version: "d1".into(),
            engine_version: ENGINE_VERSION.into(),
            locked_until: None,
            lock_token: None,
            created_at: now,
            updated_at: now,
        };
        (order, precheck, property)
    }

    #[test]
    fn snapshot_is_self_contained() {
        let (order, precheck, property) = fixtures();
        let generated_at = Utc::now();
        let snapshot = build_snapshot(&ReportId::from("r-1"), generated_at, &order, &precheck, &property).unwrap();
        assert_eq!(snapshot.meta.engine_version, "e1");
        assert_eq!(snapshot.meta.template_version, "v1");
        assert_eq!(snapshot.meta.pdf_version, "p1");
        assert_eq!(snapshot.meta.data_sources, vec![DataSourceTag::Mock]);
        assert_eq!(snapshot.property.county, County::Nassau);
        assert_eq!(snapshot.property.beds, 4);
        assert_eq!(snapshot.assessment.assessed_value, Some(450_000));
        assert_eq!(snapshot.analysis.decision, PrecheckDecision::Eligible);
        assert_eq!(snapshot.comps.len(), 6);
        // Highest similarity first
        assert_eq!(snapshot.comps[0].address, "7 Birch Ln, East Meadow, NY 11554");
        assert!(snapshot.recommendation.summary.starts_with("Based on 5 comparable home sales"));
        assert_eq!(snapshot.legal.checkbox_accepted_at, order.legal_accepted_at);
    }

    #[test]
    fn identical_inputs_give_identical_snapshots() {
        let (order, precheck, property) = fixtures();
        let at = Utc::now();
        let a = build_snapshot(&ReportId::from("r-1"), at, &order, &precheck, &property).unwrap();
        let b = build_snapshot(&ReportId::from("r-1"), at, &order, &precheck, &property).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn unknown_disclaimer_is_rejected() {
        let (mut order, precheck, property) = fixtures();
        order.disclaimer_version = "d9".into();
        let err = build_snapshot(&ReportId::from("r-1"), Utc::now(), &order, &precheck, &property).unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownDisclaimer(v) if v == "d9"));
    }

    #[test]
    fn metrics_are_copied_from_the_precheck() {
        let (order, precheck, property) = fixtures();
        let snapshot = build_snapshot(&ReportId::from("r-1"), Utc::now(), &order, &precheck, &property).unwrap();
        let EligibilityMetrics { comps_used_count, comps_lower_count, .. } = precheck.metrics.0;
        assert_eq!(snapshot.analysis.metrics.comps_used_count, comps_used_count);
        assert_eq!(snapshot.analysis.metrics.comps_lower_count, comps_lower_count);
    }

    #[test]
    fn digest_location_is_a_stable_hex_prefix() {
        let (order, precheck, property) = fixtures();
        let at = Utc::now();
        let report_id = ReportId::from("r-1");
        let snapshot = build_snapshot(&report_id, at, &order, &precheck, &property).unwrap();
        let renderer = crate::renderer::DigestRenderer::new("https://files.example.com/");
        let location = renderer.location_for(&report_id, &snapshot).unwrap();
        let name = location.strip_prefix("https://files.example.com/reports/r-1/").unwrap();
        let stem = name.strip_suffix(".pdf").unwrap();
        assert_eq!(stem.len(), 16);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(renderer.location_for(&report_id, &snapshot).unwrap(), location);

        let mut other = snapshot.clone();
        other.property.beds += 1;
        assert_ne!(renderer.location_for(&report_id, &other).unwrap(), location);
    }
}
