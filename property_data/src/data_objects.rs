use std::fmt::Display;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

//--------------------------------------     DataSourceTag     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceTag {
    RentCast,
    Attom,
    PropApis,
    Mock,
}

impl DataSourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceTag::RentCast => "rentcast",
            DataSourceTag::Attom => "attom",
            DataSourceTag::PropApis => "propapis",
            DataSourceTag::Mock => "mock",
        }
    }
}

impl Display for DataSourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------         County        --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum County {
    Suffolk,
    Nassau,
    #[default]
    Unknown,
}

impl County {
    /// Maps a free-text county name onto the supported set using a case-insensitive substring match.
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return County::Unknown;
        };
        let lower = name.to_lowercase();
        if lower.contains("suffolk") {
            County::Suffolk
        } else if lower.contains("nassau") {
            County::Nassau
        } else {
            County::Unknown
        }
    }
}

impl Display for County {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            County::Suffolk => write!(f, "Suffolk"),
            County::Nassau => write!(f, "Nassau"),
            County::Unknown => write!(f, "Unknown"),
        }
    }
}

//--------------------------------------     PropertyLookup    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyLookup {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
}

impl PropertyLookup {
    pub fn new<S: Into<String>>(lat: f64, lng: f64, formatted_address: S) -> Self {
        Self { lat, lng, formatted_address: formatted_address.into() }
    }
}

//--------------------------------------     PropertyFacts     --------------------------------------------------------
/// Subject-property facts, normalised across providers. Every field is optional since no provider fills all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessed_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baths: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub county: County,
}

//--------------------------------------     ComparableSale    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSale {
    pub address: String,
    pub sale_price: i64,
    pub sold_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baths: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    pub source: DataSourceTag,
}

impl ComparableSale {
    pub fn new<S: Into<String>>(address: S, sale_price: i64, sold_date: NaiveDate, source: DataSourceTag) -> Self {
        Self {
            address: address.into(),
            sale_price,
            sold_date,
            beds: None,
            baths: None,
            sqft: None,
            distance_miles: None,
            similarity_score: None,
            source,
        }
    }

    pub fn with_distance(mut self, miles: f64) -> Self {
        self.distance_miles = Some(miles);
        self
    }

    pub fn with_similarity(mut self, score: f64) -> Self {
        self.similarity_score = Some(score);
        self
    }

    pub fn with_layout(mut self, beds: i32, baths: f64, sqft: i64) -> Self {
        self.beds = Some(beds);
        self.baths = Some(baths);
        self.sqft = Some(sqft);
        self
    }
}

//--------------------------------------    DataSourceResult   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceResult {
    pub property: PropertyFacts,
    pub comps: Vec<ComparableSale>,
    pub source: DataSourceTag,
}

//--------------------------------------  Normalisation helpers  ------------------------------------------------------

/// Providers report sale dates either as plain ISO dates or as full timestamps. Only the date part is kept.
/// Unreadable or missing dates are treated as today, which matches how the providers' own dashboards display them.
pub(crate) fn parse_sale_date(value: Option<&str>) -> NaiveDate {
    value
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// Converts a provider's numeric sale price into whole dollars. Missing or non-positive prices yield `None` and the
/// comp is dropped, since it cannot serve as an appraisal reference.
pub(crate) fn whole_dollars(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.is_finite() && *v > 0.0).map(|v| v.round() as i64)
}

pub(crate) fn rounded(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.is_finite()).map(|v| v.round() as i64)
}
