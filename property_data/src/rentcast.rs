//! RentCast client. A single provider that supplies both the subject property's assessment and nearby sold comps.
use appeal_common::Secret;
use log::*;
use serde::Deserialize;

use crate::{
    client::RestClient,
    data_objects::{parse_sale_date, rounded, whole_dollars},
    ComparableSale,
    County,
    DataSourceError,
    DataSourceResult,
    DataSourceTag,
    PropertyFacts,
    PropertyLookup,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentCastProperty {
    assessed_value: Option<f64>,
    tax_assessment: Option<f64>,
    assessment_year: Option<i32>,
    id: Option<String>,
    parcel_id: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    square_footage: Option<f64>,
    year_built: Option<i32>,
    county: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentCastSale {
    formatted_address: Option<String>,
    address_line1: Option<String>,
    last_sale_price: Option<f64>,
    price: Option<f64>,
    last_sale_date: Option<String>,
    listed_date: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    square_footage: Option<f64>,
    distance: Option<f64>,
    correlation: Option<f64>,
}

/// `/properties` answers with an array, but single-record responses have been observed too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PropertiesResponse {
    Many(Vec<RentCastProperty>),
    One(RentCastProperty),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComparablesResponse {
    Bare(Vec<RentCastSale>),
    Wrapped {
        #[serde(default)]
        comparables: Vec<RentCastSale>,
    },
}

#[derive(Clone)]
pub struct RentCastClient {
    rest: RestClient,
}

impl RentCastClient {
    pub fn new(api_key: &Secret<String>, base_url: &str) -> Result<Self, DataSourceError> {
        if !api_key.is_set() {
            return Err(DataSourceError::MissingCredentials(DataSourceTag::RentCast));
        }
        let rest = RestClient::new(DataSourceTag::RentCast, base_url, "X-Api-Key", api_key.reveal())?;
        Ok(Self { rest })
    }

    /// Fetches the subject property and its comps concurrently.
    pub async fn fetch(&self, lookup: &PropertyLookup) -> Result<DataSourceResult, DataSourceError> {
        let (property, comps) =
            tokio::try_join!(self.fetch_property(&lookup.formatted_address), self.fetch_comps(lookup.lat, lookup.lng))?;
        Ok(DataSourceResult { property, comps, source: DataSourceTag::RentCast })
    }

    async fn fetch_property(&self, address: &str) -> Result<PropertyFacts, DataSourceError> {
        let params = [("address", address.to_string())];
        let response = self.rest.get::<PropertiesResponse>("/properties", &params).await?;
        let property = match response {
            PropertiesResponse::Many(list) => list.into_iter().next(),
            PropertiesResponse::One(p) => Some(p),
        };
        match property {
            Some(p) => Ok(map_property(p)),
            None => {
                warn!("🏠️ RentCast has no property record for {address}");
                Ok(PropertyFacts::default())
            },
        }
    }

    async fn fetch_comps(&self, lat: f64, lng: f64) -> Result<Vec<ComparableSale>, DataSourceError> {
        let params = [
            ("latitude", lat.to_string()),
            ("longitude", lng.to_string()),
            ("radius", "1".to_string()),
            ("limit", "20".to_string()),
            ("status", "Sold".to_string()),
            ("daysOld", "365".to_string()),
        ];
        let response = self.rest.get::<ComparablesResponse>("/comparables", &params).await?;
        let sales = match response {
            ComparablesResponse::Bare(v) => v,
            ComparablesResponse::Wrapped { comparables } => comparables,
        };
        Ok(sales.into_iter().filter_map(map_sale).collect())
    }
}

fn map_property(p: RentCastProperty) -> PropertyFacts {
    PropertyFacts {
        assessed_value: rounded(p.assessed_value.or(p.tax_assessment)),
        assessment_year: p.assessment_year,
        parcel_id: p.id.or(p.parcel_id),
        beds: rounded(p.bedrooms).map(|b| b as i32),
        baths: p.bathrooms,
        sqft: rounded(p.square_footage),
        year_built: p.year_built,
        county: County::from_name(p.county.as_deref()),
    }
}

fn map_sale(s: RentCastSale) -> Option<ComparableSale> {
    let sale_price = whole_dollars(s.last_sale_price.or(s.price))?;
    let address = s.formatted_address.or(s.address_line1).unwrap_or_else(|| "Unknown".to_string());
    let sold_date = parse_sale_date(s.last_sale_date.as_deref().or(s.listed_date.as_deref()));
    Some(ComparableSale {
        address,
        sale_price,
        sold_date,
        beds: rounded(s.bedrooms).map(|b| b as i32),
        baths: s.bathrooms,
        sqft: rounded(s.square_footage),
        distance_miles: s.distance,
        similarity_score: s.correlation,
        source: DataSourceTag::RentCast,
    })
}
