//! Compliance copy carried into every report snapshot. The disclaimer a buyer accepted is resolved by version, so the
//! text in a report always matches what was shown at checkout.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FILING_IS_FREE: &str = "RP-524 filing is free through your local assessor/BAR.";
pub const PREP_ONLY: &str = "You are purchasing report preparation and analysis only.";
pub const NO_GOVERNMENT_AFFILIATION: &str = "We are not affiliated with any government agency.";
pub const USER_MUST_FILE: &str =
    "You must file the RP-524 grievance yourself with your local assessor or Board of Assessment Review (BAR).";
pub const HEARING_POSSIBLE: &str = "You may be required to attend a hearing.";

/// Returns the disclaimer text for a version, or `None` if the version is unknown.
pub fn disclaimer_text(version: &str) -> Option<&'static str> {
    match version {
        "d1" => Some("I understand this report is an estimate and does not guarantee a tax reduction."),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLegal {
    pub checkbox_accepted_at: DateTime<Utc>,
    pub disclaimer_text: String,
    pub filing_is_free_notice: String,
    pub prep_only_notice: String,
    pub no_government_affiliation_notice: String,
    pub user_must_file_themselves_notice: String,
    pub hearing_possible_notice: String,
}

impl SnapshotLegal {
    /// `None` if the disclaimer version is unknown.
    pub fn new(accepted_at: DateTime<Utc>, disclaimer_version: &str) -> Option<Self> {
        let disclaimer = disclaimer_text(disclaimer_version)?;
        Some(Self {
            checkbox_accepted_at: accepted_at,
            disclaimer_text: disclaimer.to_string(),
            filing_is_free_notice: FILING_IS_FREE.to_string(),
            prep_only_notice: PREP_ONLY.to_string(),
            no_government_affiliation_notice: NO_GOVERNMENT_AFFILIATION.to_string(),
            user_must_file_themselves_notice: USER_MUST_FILE.to_string(),
            hearing_possible_notice: HEARING_POSSIBLE.to_string(),
        })
    }
}
