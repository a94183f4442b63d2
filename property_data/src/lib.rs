//! # Property data sources
//!
//! Clients for the third-party property-record and comparable-sales providers, plus an in-memory fixture that
//! produces deterministic data when no provider is configured.
//!
//! Callers should use [`DataSourceGateway`], which selects exactly one provider family from the configured
//! credentials, enforces per-call timeouts, and falls back to the fixture on any failure. The gateway never
//! returns an error: every result is tagged with the [`DataSourceTag`] of the source that produced it.
mod attom;
mod client;
mod config;
mod data_objects;
mod error;
mod fixture;
mod gateway;
mod propapis;
mod rentcast;

pub use attom::AttomClient;
pub use config::{DataSourceConfig, ProviderTimeouts};
pub use data_objects::{ComparableSale, County, DataSourceResult, DataSourceTag, PropertyFacts, PropertyLookup};
pub use error::DataSourceError;
pub use fixture::FixtureProvider;
pub use gateway::{DataSourceGateway, ProviderFamily, PropertyDataSource, LEGACY_MIN_COMPS};
pub use propapis::PropApisClient;
pub use rentcast::RentCastClient;
