//! # Eligibility engine
//!
//! A pure function from (assessed value, comparable sales, address quality, rule pack) to a decision, a confidence
//! score, the factors that explain it, and the derived metrics. No I/O happens here, and for identical inputs
//! (including `today`) the output is identical.
//!
//! The decision rule is exactly
//!
//! ```text
//!   ELIGIBLE  <=>  comps_used_count >= min_comps AND comps_lower_count >= min_lower_comps
//! ```
//!
//! Confidence is a linear score and never feeds back into the decision.
use std::cmp::Ordering;

use appeal_common::format_dollars;
use chrono::{Months, NaiveDate};
use property_data::ComparableSale;

use crate::db_types::{EligibilityFactor, EligibilityMetrics, PrecheckDecision, RuleConfig};

/// Comps at or above this share of lower-priced sales count as a strong signal.
pub const HIGH_LOWER_RATIO: f64 = 0.4;
/// A lower comp at least this far below the assessed value (as a fraction of it) earns the gap bonus.
pub const LARGE_GAP: f64 = 0.1;
/// Comp count that earns the "many comps" confidence bonus.
pub const MANY_COMPS: usize = 5;

#[derive(Debug, Clone)]
pub struct EligibilityInput<'a> {
    pub assessed_value: i64,
    pub comps: &'a [ComparableSale],
    pub address_quality_score: i64,
    pub has_property_data_conflict: bool,
    pub rules: &'a RuleConfig,
    /// The civil date the comp age window is measured from
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityResult {
    pub decision: PrecheckDecision,
    pub confidence: f64,
    pub factors: Vec<EligibilityFactor>,
    pub metrics: EligibilityMetrics,
    /// The comps that survived filtering, in canonical order
    pub comps: Vec<ComparableSale>,
    pub explanation: String,
}

pub fn compute_eligibility(input: &EligibilityInput<'_>) -> EligibilityResult {
    let rules = input.rules;
    let assessed = input.assessed_value;
    let mut factors = Vec::new();

    let recent = filter_by_age(input.comps, rules.max_comp_age_months, input.today);
    let (mut comps, filtered) = remove_outliers(recent, rules.outlier_low_factor, rules.outlier_high_factor);
    if filtered {
        factors.push(EligibilityFactor::OutlierFiltered);
    }
    sort_comps(&mut comps);

    let comps_used_count = comps.len();
    let lower = comps.iter().filter(|c| c.sale_price < assessed).collect::<Vec<_>>();
    let comps_lower_count = lower.len();
    let comps_lower_ratio =
        if comps_used_count > 0 { comps_lower_count as f64 / comps_used_count as f64 } else { 0.0 };
    let best_lower_comp_gap = if assessed > 0 {
        lower.iter().map(|c| (assessed - c.sale_price) as f64 / assessed as f64).fold(0.0, f64::max)
    } else {
        0.0
    };

    let low_quality = input.address_quality_score < rules.low_quality_threshold;
    if comps_used_count >= rules.min_comps {
        factors.push(EligibilityFactor::CompsFound);
    }
    if comps_lower_count >= rules.min_lower_comps {
        factors.push(EligibilityFactor::CompsLowerThanAssessed);
    }
    if comps_lower_ratio >= HIGH_LOWER_RATIO {
        factors.push(EligibilityFactor::LowerCompRatioHigh);
    }
    if low_quality {
        factors.push(EligibilityFactor::AddressQualityLow);
    }
    if input.has_property_data_conflict {
        factors.push(EligibilityFactor::PropertyDataConflict);
    }
    if comps_used_count < rules.min_comps {
        factors.push(EligibilityFactor::InsufficientComps);
    }

    let decision = if comps_used_count >= rules.min_comps && comps_lower_count >= rules.min_lower_comps {
        PrecheckDecision::Eligible
    } else {
        PrecheckDecision::NotEligible
    };

    let mut confidence = rules.confidence_base;
    if comps_used_count >= MANY_COMPS {
        confidence += rules.confidence_comps_5_bonus;
    }
    if comps_lower_ratio >= HIGH_LOWER_RATIO {
        confidence += rules.confidence_ratio_40_bonus;
    }
    if best_lower_comp_gap >= LARGE_GAP {
        confidence += rules.confidence_gap_10_bonus;
    }
    if low_quality {
        confidence -= rules.confidence_low_quality_penalty;
    }
    if input.has_property_data_conflict {
        confidence -= rules.confidence_conflict_penalty;
    }
    let confidence = clamp_unit(confidence);

    let metrics = EligibilityMetrics {
        assessed_value: assessed,
        comps_used_count,
        comps_lower_count,
        comps_lower_ratio,
        best_lower_comp_gap,
    };
    let explanation = explain(decision, &metrics);
    EligibilityResult { decision, confidence, factors, metrics, comps, explanation }
}

/// Keeps comps sold on or after the date `max_age_months` before `today`.
pub fn filter_by_age(comps: &[ComparableSale], max_age_months: u32, today: NaiveDate) -> Vec<ComparableSale> {
    let cutoff = today.checked_sub_months(Months::new(max_age_months)).unwrap_or(NaiveDate::MIN);
    comps.iter().filter(|c| c.sold_date >= cutoff).cloned().collect()
}

/// The median sale price. With an even number of comps, the mean of the two middle prices.
pub fn median_price(comps: &[ComparableSale]) -> Option<f64> {
    if comps.is_empty() {
        return None;
    }
    let mut prices = comps.iter().map(|c| c.sale_price).collect::<Vec<_>>();
    prices.sort_unstable();
    let mid = prices.len() / 2;
    let median = if prices.len() % 2 == 0 {
        (prices[mid - 1] as f64 + prices[mid] as f64) / 2.0
    } else {
        prices[mid] as f64
    };
    Some(median)
}

/// Drops comps priced outside `[median × low, median × high]`, repeating until the band is stable so that the result
/// is a fixed point of the filter. Returns the surviving comps (in their original relative order) and whether any
/// comp was dropped.
pub fn remove_outliers(comps: Vec<ComparableSale>, low: f64, high: f64) -> (Vec<ComparableSale>, bool) {
    let mut comps = comps;
    let mut dropped_any = false;
    while let Some(median) = median_price(&comps) {
        let (lower, upper) = (median * low, median * high);
        let before = comps.len();
        comps.retain(|c| {
            let price = c.sale_price as f64;
            price >= lower && price <= upper
        });
        if comps.len() == before {
            break;
        }
        dropped_any = true;
    }
    (comps, dropped_any)
}

/// Canonical comp order: similarity descending (missing = 0), then distance ascending (missing = infinitely far),
/// then sale date descending. The sort is stable.
pub fn sort_comps(comps: &mut [ComparableSale]) {
    comps.sort_by(compare_comps);
}

pub fn compare_comps(a: &ComparableSale, b: &ComparableSale) -> Ordering {
    let sim_a = a.similarity_score.unwrap_or(0.0);
    let sim_b = b.similarity_score.unwrap_or(0.0);
    let dist_a = a.distance_miles.unwrap_or(f64::INFINITY);
    let dist_b = b.distance_miles.unwrap_or(f64::INFINITY);
    sim_b.total_cmp(&sim_a).then_with(|| dist_a.total_cmp(&dist_b)).then_with(|| b.sold_date.cmp(&a.sold_date))
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn explain(decision: PrecheckDecision, metrics: &EligibilityMetrics) -> String {
    let value = format_dollars(metrics.assessed_value);
    match decision {
        PrecheckDecision::Eligible => format!(
            "Found {} comparable sales, {} of which sold below the assessed value of ${value}. This property may be \
             over-assessed.",
            metrics.comps_used_count, metrics.comps_lower_count
        ),
        PrecheckDecision::NotEligible => format!(
            "Found {} comparable sales. Insufficient evidence of over-assessment relative to the assessed value of \
             ${value}.",
            metrics.comps_used_count
        ),
    }
}
