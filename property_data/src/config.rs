use std::{env, time::Duration};

use appeal_common::Secret;
use log::*;

pub const DEFAULT_RENTCAST_BASE_URL: &str = "https://api.rentcast.io/v1";
pub const DEFAULT_ATTOM_BASE_URL: &str = "https://api.gateway.attomdata.com";
pub const DEFAULT_PROPAPIS_BASE_URL: &str = "https://api.propapis.com/v1";

/// An API key with this value is treated as if it were not set at all.
const PLACEHOLDER_KEY: &str = "placeholder";

#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    pub rentcast_api_key: Secret<String>,
    pub rentcast_base_url: String,
    pub attom_api_key: Secret<String>,
    pub attom_base_url: String,
    pub propapis_api_key: Secret<String>,
    pub propapis_base_url: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            rentcast_api_key: Secret::default(),
            rentcast_base_url: DEFAULT_RENTCAST_BASE_URL.to_string(),
            attom_api_key: Secret::default(),
            attom_base_url: DEFAULT_ATTOM_BASE_URL.to_string(),
            propapis_api_key: Secret::default(),
            propapis_base_url: DEFAULT_PROPAPIS_BASE_URL.to_string(),
        }
    }
}

impl DataSourceConfig {
    pub fn new_from_env_or_default() -> Self {
        let rentcast_api_key = Secret::new(env::var("APPEAL_RENTCAST_API_KEY").unwrap_or_else(|_| {
            info!("🏠️ APPEAL_RENTCAST_API_KEY is not set. RentCast will not be used.");
            String::default()
        }));
        let attom_api_key = Secret::new(env::var("APPEAL_ATTOM_API_KEY").unwrap_or_default());
        let propapis_api_key = Secret::new(env::var("APPEAL_PROPAPIS_API_KEY").unwrap_or_default());
        let rentcast_base_url =
            env::var("APPEAL_RENTCAST_BASE_URL").unwrap_or_else(|_| DEFAULT_RENTCAST_BASE_URL.to_string());
        let attom_base_url = env::var("APPEAL_ATTOM_BASE_URL").unwrap_or_else(|_| DEFAULT_ATTOM_BASE_URL.to_string());
        let propapis_base_url =
            env::var("APPEAL_PROPAPIS_BASE_URL").unwrap_or_else(|_| DEFAULT_PROPAPIS_BASE_URL.to_string());
        let result = Self {
            rentcast_api_key,
            rentcast_base_url,
            attom_api_key,
            attom_base_url,
            propapis_api_key,
            propapis_base_url,
        };
        if !result.has_rentcast() && !result.has_attom() {
            warn!("🏠️ No property data provider keys are configured. Prechecks will use fixture data.");
        }
        result
    }

    pub fn has_rentcast(&self) -> bool {
        is_usable_key(&self.rentcast_api_key)
    }

    pub fn has_attom(&self) -> bool {
        is_usable_key(&self.attom_api_key)
    }

    pub fn has_propapis(&self) -> bool {
        is_usable_key(&self.propapis_api_key)
    }
}

fn is_usable_key(key: &Secret<String>) -> bool {
    key.is_set() && key.reveal().trim() != PLACEHOLDER_KEY
}

/// Hard limits applied to each provider call. A call that exceeds its limit is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub rentcast: Duration,
    pub attom: Duration,
    pub propapis: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            rentcast: Duration::from_millis(8000),
            attom: Duration::from_millis(5000),
            propapis: Duration::from_millis(5000),
        }
    }
}
