use std::fmt::Display;

use log::*;

use crate::{
    client::with_timeout,
    AttomClient,
    DataSourceConfig,
    DataSourceError,
    DataSourceResult,
    DataSourceTag,
    FixtureProvider,
    PropApisClient,
    PropertyLookup,
    ProviderTimeouts,
    RentCastClient,
};

/// If the legacy primary provider returns fewer comps than this, the secondary provider is consulted instead.
pub const LEGACY_MIN_COMPS: usize = 3;

/// Anything that can supply property facts and comparable sales for a lookup.
///
/// Implementations must not fail: any provider error has to be absorbed and replaced with a fallback result.
#[allow(async_fn_in_trait)]
pub trait PropertyDataSource {
    async fn fetch(&self, lookup: &PropertyLookup, timeouts: &ProviderTimeouts) -> DataSourceResult;
}

/// The provider family chosen from the configured credentials. Exactly one family is used per gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    RentCast,
    /// ATTOM as primary, PropAPIS as secondary.
    Attom,
    Fixture,
}

impl Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderFamily::RentCast => write!(f, "RentCast"),
            ProviderFamily::Attom => write!(f, "ATTOM/PropAPIS"),
            ProviderFamily::Fixture => write!(f, "Fixture"),
        }
    }
}

#[derive(Clone)]
pub struct DataSourceGateway {
    family: ProviderFamily,
    rentcast: Option<RentCastClient>,
    attom: Option<AttomClient>,
    propapis: Option<PropApisClient>,
    fixture: FixtureProvider,
}

impl DataSourceGateway {
    /// Builds the gateway, picking the provider family in priority order: RentCast, then ATTOM (+ PropAPIS), then the
    /// fixture. A client that cannot be constructed is logged and skipped.
    pub fn new(config: &DataSourceConfig) -> Self {
        let rentcast = config
            .has_rentcast()
            .then(|| RentCastClient::new(&config.rentcast_api_key, &config.rentcast_base_url))
            .and_then(|r| log_init_failure(r, DataSourceTag::RentCast));
        let attom = config
            .has_attom()
            .then(|| AttomClient::new(&config.attom_api_key, &config.attom_base_url))
            .and_then(|r| log_init_failure(r, DataSourceTag::Attom));
        let propapis = config
            .has_propapis()
            .then(|| PropApisClient::new(&config.propapis_api_key, &config.propapis_base_url))
            .and_then(|r| log_init_failure(r, DataSourceTag::PropApis));
        let family = if rentcast.is_some() {
            ProviderFamily::RentCast
        } else if attom.is_some() {
            ProviderFamily::Attom
        } else {
            ProviderFamily::Fixture
        };
        info!("🏠️ Property data gateway is using the {family} provider family");
        Self { family, rentcast, attom, propapis, fixture: FixtureProvider }
    }

    pub fn fixture_only() -> Self {
        Self { family: ProviderFamily::Fixture, rentcast: None, attom: None, propapis: None, fixture: FixtureProvider }
    }

    pub fn family(&self) -> ProviderFamily {
        self.family
    }

    async fn fetch_rentcast(
        &self,
        lookup: &PropertyLookup,
        timeouts: &ProviderTimeouts,
    ) -> Result<DataSourceResult, DataSourceError> {
        let client = self.rentcast.as_ref().ok_or(DataSourceError::MissingCredentials(DataSourceTag::RentCast))?;
        with_timeout(DataSourceTag::RentCast, timeouts.rentcast, client.fetch(lookup)).await
    }

    async fn fetch_legacy_pair(
        &self,
        lookup: &PropertyLookup,
        timeouts: &ProviderTimeouts,
    ) -> Result<DataSourceResult, DataSourceError> {
        if let Some(attom) = &self.attom {
            match with_timeout(DataSourceTag::Attom, timeouts.attom, attom.fetch(lookup)).await {
                Ok(result) if result.comps.len() >= LEGACY_MIN_COMPS => return Ok(result),
                Ok(result) => {
                    info!("🏠️ ATTOM returned only {} comps. Trying PropAPIS instead.", result.comps.len());
                },
                Err(e) => info!("🏠️ ATTOM lookup failed. {e}. Trying PropAPIS instead."),
            }
        }
        let propapis = self.propapis.as_ref().ok_or(DataSourceError::MissingCredentials(DataSourceTag::PropApis))?;
        with_timeout(DataSourceTag::PropApis, timeouts.propapis, propapis.fetch(lookup)).await
    }
}

impl PropertyDataSource for DataSourceGateway {
    async fn fetch(&self, lookup: &PropertyLookup, timeouts: &ProviderTimeouts) -> DataSourceResult {
        debug!("🏠️ Fetching property data for {} via {}", lookup.formatted_address, self.family);
        let result = match self.family {
            ProviderFamily::RentCast => self.fetch_rentcast(lookup, timeouts).await,
            ProviderFamily::Attom => self.fetch_legacy_pair(lookup, timeouts).await,
            ProviderFamily::Fixture => return self.fixture.fetch(),
        };
        match result {
            Ok(result) => {
                debug!("🏠️ {} returned {} comps", result.source, result.comps.len());
                result
            },
            Err(e) => {
                warn!("🏠️ {} provider family failed. {e}. Falling back to fixture data.", self.family);
                self.fixture.fetch()
            },
        }
    }
}

fn log_init_failure<T>(result: Result<T, DataSourceError>, tag: DataSourceTag) -> Option<T> {
    result.map_err(|e| error!("🏠️ Could not configure the {tag} client. {e}")).ok()
}
