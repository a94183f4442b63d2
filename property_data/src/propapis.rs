use appeal_common::Secret;
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

#[derive(Debug, Default, Deserialize)]
struct CompsResponse {
    #[serde(default)]
    subject_property: SubjectProperty,
    #[serde(default)]
    comparable_sales: Vec<CompSale>,
}

#[derive(Debug, Default, Deserialize)]
struct SubjectProperty {
    assessed_value: Option<f64>,
    assessment_year: Option<i32>,
    parcel_id: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    living_area_sqft: Option<f64>,
    year_built: Option<i32>,
    county: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompSale {
    address: Option<String>,
    sale_price: Option<f64>,
    sale_date: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f64>,
    living_area_sqft: Option<f64>,
    distance_miles: Option<f64>,
    similarity_score: Option<f64>,
}

/// PropAPIS client. Returns the subject property and its comps in a single call.
#[derive(Clone)]
pub struct PropApisClient {
    rest: RestClient,
}

impl PropApisClient {
    pub fn new(api_key: &Secret<String>, base_url: &str) -> Result<Self, DataSourceError> {
        if !api_key.is_set() {
            return Err(DataSourceError::MissingCredentials(DataSourceTag::PropApis));
        }
        let bearer = format!("Bearer {}", api_key.reveal());
        let rest = RestClient::new(DataSourceTag::PropApis, base_url, "Authorization", &bearer)?;
        Ok(Self { rest })
    }

    pub async fn fetch(&self, lookup: &PropertyLookup) -> Result<DataSourceResult, DataSourceError> {
        let params = [
            ("address", lookup.formatted_address.clone()),
            ("lat", lookup.lat.to_string()),
            ("lng", lookup.lng.to_string()),
            ("radius_miles", "1".to_string()),
            ("limit", "20".to_string()),
        ];
        let response = self.rest.get::<CompsResponse>("/property/comps", &params).await?;
        Ok(map_response(response))
    }
}

fn map_response(response: CompsResponse) -> DataSourceResult {
    let p = response.subject_property;
    let property = PropertyFacts {
        assessed_value: rounded(p.assessed_value),
        assessment_year: p.assessment_year,
        parcel_id: p.parcel_id,
        beds: rounded(p.bedrooms).map(|b| b as i32),
        baths: p.bathrooms,
        sqft: rounded(p.living_area_sqft),
        year_built: p.year_built,
        county: County::from_name(p.county.as_deref()),
    };
    let comps = response
        .comparable_sales
        .into_iter()
        .filter_map(|c| {
            let sale_price = whole_dollars(c.sale_price)?;
            Some(ComparableSale {
                address: c.address.unwrap_or_else(|| "Unknown".to_string()),
                sale_price,
                sold_date: parse_sale_date(c.sale_date.as_deref()),
                beds: rounded(c.bedrooms).map(|b| b as i32),
                baths: c.bathrooms,
                sqft: rounded(c.living_area_sqft),
                distance_miles: c.distance_miles,
                similarity_score: c.similarity_score,
                source: DataSourceTag::PropApis,
            })
        })
        .collect();
    DataSourceResult { property, comps, source: DataSourceTag::PropApis }
}
