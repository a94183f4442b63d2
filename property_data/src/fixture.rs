use chrono::{Months, NaiveDate, Utc};

use crate::{ComparableSale, County, DataSourceResult, DataSourceTag, PropertyFacts};

/// Deterministic Long Island sample data, used when no provider is configured or every provider call failed.
///
/// Six comps, five of which sold below the subject's assessed value of $450,000. Sale dates are relative to the
/// reference date so the comps always fall inside a twelve-month age window.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureProvider;

impl FixtureProvider {
    pub fn fetch(&self) -> DataSourceResult {
        self.fetch_as_of(Utc::now().date_naive())
    }

    pub fn fetch_as_of(&self, today: NaiveDate) -> DataSourceResult {
        let months_ago = |n: u32| today.checked_sub_months(Months::new(n)).unwrap_or(today);
        let property = PropertyFacts {
            assessed_value: Some(450_000),
            assessment_year: Some(2024),
            parcel_id: Some("2089-22-108-00120".to_string()),
            beds: Some(4),
            baths: Some(2.5),
            sqft: Some(2_200),
            year_built: Some(2001),
            county: County::Nassau,
        };
        let comp = |address: &str, price: i64, months: u32, layout: (i32, f64, i64), distance: f64, similarity: f64| {
            ComparableSale::new(address, price, months_ago(months), DataSourceTag::Mock)
                .with_layout(layout.0, layout.1, layout.2)
                .with_distance(distance)
                .with_similarity(similarity)
        };
        let comps = vec![
            comp("42 Maple Ave, Levittown, NY 11756", 385_000, 2, (3, 2.0, 1_980), 0.3, 0.92),
            comp("118 Oak St, Wantagh, NY 11793", 410_000, 3, (4, 2.0, 2_100), 0.5, 0.88),
            comp("7 Birch Ln, East Meadow, NY 11554", 430_000, 1, (4, 2.5, 2_250), 0.6, 0.95),
            comp("305 Hempstead Tpke, Levittown, NY 11756", 395_000, 5, (3, 2.0, 1_850), 0.8, 0.82),
            comp("91 Cedar Rd, Seaford, NY 11783", 475_000, 2, (4, 3.0, 2_400), 0.9, 0.78),
            comp("22 Elm Dr, Bellmore, NY 11710", 440_000, 4, (4, 2.5, 2_150), 0.7, 0.90),
        ];
        DataSourceResult { property, comps, source: DataSourceTag::Mock }
    }
}
