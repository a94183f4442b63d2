//! Deterministic recommendation text for the report. The wording depends only on the decision and the metrics, so two
//! runs over the same precheck always produce byte-identical text.
use appeal_common::format_dollars;
use serde::{Deserialize, Serialize};

use crate::db_types::{EligibilityMetrics, PrecheckDecision};

const NOTES: [&str; 3] = [
    "This report is an estimate based on available public/third-party data.",
    "Results do not guarantee a tax reduction.",
    "RP-524 filing is free; this product does not file on your behalf.",
];

const ELIGIBLE_NEXT_STEPS: [&str; 3] = [
    "Review the comparable sales used in this report.",
    "Confirm your property details (beds/baths/sqft) match public records.",
    "Check your local assessor/BAR for filing dates and required supporting documents.",
];

const NOT_ELIGIBLE_NEXT_STEPS: [&str; 3] = [
    "Double-check your property details for accuracy.",
    "Try again later when more sales data becomes available.",
    "Use 'Notify Me' to get reminders for the next tax year.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    pub next_steps: Vec<String>,
    pub notes: Vec<String>,
}

pub fn generate_recommendation(decision: PrecheckDecision, metrics: &EligibilityMetrics) -> Recommendation {
    let value = format_dollars(metrics.assessed_value);
    let (summary, next_steps) = match decision {
        PrecheckDecision::Eligible => (
            format!(
                "Based on {} comparable home sales below your assessed value of ${value}, your property may be \
                 over-assessed. This suggests you may have grounds to file a grievance.",
                metrics.comps_lower_count
            ),
            ELIGIBLE_NEXT_STEPS,
        ),
        PrecheckDecision::NotEligible => (
            format!(
                "We could not identify enough comparable home sales below your assessed value of ${value}. Based on \
                 available data, your case appears weaker at this time."
            ),
            NOT_ELIGIBLE_NEXT_STEPS,
        ),
    };
    Recommendation {
        summary,
        next_steps: next_steps.iter().map(|s| s.to_string()).collect(),
        notes: NOTES.iter().map(|s| s.to_string()).collect(),
    }
}
