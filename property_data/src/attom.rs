//! ATTOM client (legacy). Property basic profile plus a sale snapshot around the subject's coordinates.
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
struct AttomResponse {
    #[serde(default)]
    property: Vec<AttomProperty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomProperty {
    #[serde(default)]
    identifier: AttomIdentifier,
    #[serde(default)]
    assessment: AttomAssessment,
    #[serde(default)]
    building: AttomBuilding,
    #[serde(default)]
    area: AttomArea,
    #[serde(default)]
    address: AttomAddress,
    #[serde(default)]
    sale: AttomSale,
    #[serde(default)]
    location: AttomLocation,
}

#[derive(Debug, Default, Deserialize)]
struct AttomIdentifier {
    apn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttomAssessment {
    #[serde(default)]
    assessed: AttomAssessed,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomAssessed {
    assd_ttl_value: Option<f64>,
    assd_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct AttomBuilding {
    #[serde(default)]
    rooms: AttomRooms,
    #[serde(default)]
    size: AttomSize,
    #[serde(default)]
    summary: AttomSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomRooms {
    beds: Option<f64>,
    baths_full: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomSize {
    living_size: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomSummary {
    year_built: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomArea {
    country_sec_subd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomAddress {
    one_line: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttomSale {
    #[serde(default)]
    amount: AttomSaleAmount,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttomSaleAmount {
    sale_amt: Option<f64>,
    sale_rec_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttomLocation {
    distance: Option<f64>,
}

#[derive(Clone)]
pub struct AttomClient {
    rest: RestClient,
}

impl AttomClient {
    pub fn new(api_key: &Secret<String>, base_url: &str) -> Result<Self, DataSourceError> {
        if !api_key.is_set() {
            return Err(DataSourceError::MissingCredentials(DataSourceTag::Attom));
        }
        let rest = RestClient::new(DataSourceTag::Attom, base_url, "apikey", api_key.reveal())?;
        Ok(Self { rest })
    }

    pub async fn fetch(&self, lookup: &PropertyLookup) -> Result<DataSourceResult, DataSourceError> {
        let params = [("address", lookup.formatted_address.clone())];
        let profile =
            self.rest.get::<AttomResponse>("/propertyapi/v1.0.0/property/basicprofile", &params).await?;
        let property = profile.property.into_iter().next().map(map_property).unwrap_or_default();
        let params = [
            ("latitude", lookup.lat.to_string()),
            ("longitude", lookup.lng.to_string()),
            ("radius", "1".to_string()),
            ("orderBy", "distance".to_string()),
            ("pageSize", "20".to_string()),
        ];
        let snapshot = self.rest.get::<AttomResponse>("/propertyapi/v1.0.0/sale/snapshot", &params).await?;
        let comps = snapshot.property.into_iter().filter_map(map_sale).collect();
        Ok(DataSourceResult { property, comps, source: DataSourceTag::Attom })
    }
}

fn map_property(p: AttomProperty) -> PropertyFacts {
    PropertyFacts {
        assessed_value: rounded(p.assessment.assessed.assd_ttl_value),
        assessment_year: p.assessment.assessed.assd_year,
        parcel_id: p.identifier.apn,
        beds: rounded(p.building.rooms.beds).map(|b| b as i32),
        baths: p.building.rooms.baths_full,
        sqft: rounded(p.building.size.living_size),
        year_built: p.building.summary.year_built,
        county: County::from_name(p.area.country_sec_subd.as_deref()),
    }
}

fn map_sale(p: AttomProperty) -> Option<ComparableSale> {
    let sale_price = whole_dollars(p.sale.amount.sale_amt)?;
    Some(ComparableSale {
        address: p.address.one_line.unwrap_or_else(|| "Unknown".to_string()),
        sale_price,
        sold_date: parse_sale_date(p.sale.amount.sale_rec_date.as_deref()),
        beds: rounded(p.building.rooms.beds).map(|b| b as i32),
        baths: p.building.rooms.baths_full,
        sqft: rounded(p.building.size.living_size),
        distance_miles: p.location.distance,
        similarity_score: None,
        source: DataSourceTag::Attom,
    })
}
