use chrono::{DateTime, Utc};
use property_data::{ComparableSale, PropertyFacts, PropertyLookup};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        EligibilityFactor,
        EligibilityMetrics,
        NewProperty,
        Precheck,
        PrecheckDecision,
        PrecheckId,
        PropertyId,
    },
    PrecheckError,
};

/// A geocoded address submitted for a precheck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckRequest {
    pub place_id: String,
    pub formatted_address: String,
    #[serde(default)]
    pub street_number: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub unit_number: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// 0 to 100, as reported by the geocoder.
    pub address_quality_score: i64,
    /// The user has explicitly accepted a low-quality address match.
    #[serde(default)]
    pub confirmed_by_user: bool,
}

impl PrecheckRequest {
    pub fn validate(&self) -> Result<(), PrecheckError> {
        if self.place_id.trim().is_empty() {
            return Err(PrecheckError::ValidationError("place_id is required".into()));
        }
        if self.formatted_address.trim().is_empty() {
            return Err(PrecheckError::ValidationError("formatted_address is required".into()));
        }
        if !(0..=100).contains(&self.address_quality_score) {
            return Err(PrecheckError::ValidationError("address_quality_score must be between 0 and 100".into()));
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(PrecheckError::ValidationError("lat must be a valid latitude".into()));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(PrecheckError::ValidationError("lng must be a valid longitude".into()));
        }
        Ok(())
    }

    pub fn new_property(&self) -> NewProperty {
        NewProperty {
            place_id: self.place_id.clone(),
            formatted_address: self.formatted_address.clone(),
            street_number: self.street_number.clone(),
            route: self.route.clone(),
            locality: self.locality.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            unit_number: self.unit_number.clone(),
            lat: self.lat,
            lng: self.lng,
            address_quality_score: self.address_quality_score,
        }
    }

    pub fn lookup(&self) -> PropertyLookup {
        PropertyLookup::new(self.lat, self.lng, self.formatted_address.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrecheckSource {
    /// Computed by this request
    Live,
    /// An earlier precheck from the same civil day was reused
    Cache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecheckOutcome {
    pub source: PrecheckSource,
    pub precheck: Precheck,
}

impl PrecheckOutcome {
    pub fn live(precheck: Precheck) -> Self {
        Self { source: PrecheckSource::Live, precheck }
    }

    pub fn cached(precheck: Precheck) -> Self {
        Self { source: PrecheckSource::Cache, precheck }
    }
}

/// The precheck as shown to the user. Internal fields such as the frozen rule parameters are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckSummary {
    pub id: PrecheckId,
    pub user_id: String,
    pub property_id: PropertyId,
    pub decision: PrecheckDecision,
    pub confidence: f64,
    pub factors: Vec<EligibilityFactor>,
    pub metrics: EligibilityMetrics,
    pub confirmed_by_user: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckResponse {
    pub source: PrecheckSource,
    pub precheck: PrecheckSummary,
    /// Every comp the provider returned, for display alongside the result
    pub comps: Vec<ComparableSale>,
    pub property: PropertyFacts,
}

impl From<PrecheckOutcome> for PrecheckResponse {
    fn from(outcome: PrecheckOutcome) -> Self {
        let PrecheckOutcome { source, precheck } = outcome;
        let metadata = precheck.metadata.0;
        let precheck = PrecheckSummary {
            id: precheck.id,
            user_id: precheck.user_id,
            property_id: precheck.property_id,
            decision: precheck.decision,
            confidence: precheck.confidence,
            factors: precheck.factors.0,
            metrics: precheck.metrics.0,
            confirmed_by_user: precheck.confirmed_by_user,
            created_at: precheck.created_at,
        };
        Self { source, precheck, comps: metadata.comps, property: metadata.property_data }
    }
}
